use crate::channel::Channel;
use crate::config::SourceConfig;
use crate::error::Error;
use async_trait::async_trait;
use futures::future::join_all;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Producer side of a channel.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Returns up to `max` bytes. An empty chunk means the source is exhausted.
    async fn read_chunk(&self, max: usize) -> Result<Vec<u8>, Error>;
}

/// Reads a file or character device.
///
/// Regular files are read from a saved offset and may rewind at EOF.
/// Pipes, ttys and other devices cannot seek and are read sequentially.
pub struct FileSource {
    file: tokio::sync::Mutex<File>,
    offset: tokio::sync::Mutex<u64>,
    seekable: bool,
    loop_on_eof: bool,
}

impl FileSource {
    pub async fn open(path: &str, loop_on_eof: bool) -> io::Result<Self> {
        let file = File::open(path).await?;
        let seekable = file.metadata().await?.file_type().is_file();
        if loop_on_eof && !seekable {
            log::warn!("Source '{}' is not a regular file, 'loop' is ignored", path);
        }
        Ok(Self {
            file: tokio::sync::Mutex::new(file),
            offset: tokio::sync::Mutex::new(0),
            seekable,
            loop_on_eof: loop_on_eof && seekable,
        })
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn read_chunk(&self, max: usize) -> Result<Vec<u8>, Error> {
        let mut file = self.file.lock().await;
        let mut buf = vec![0u8; max];

        if !self.seekable {
            let n = file.read(&mut buf).await?;
            buf.truncate(n);
            return Ok(buf);
        }

        let mut offset = self.offset.lock().await;
        // Seek to saved offset
        file.seek(tokio::io::SeekFrom::Start(*offset)).await?;
        let bytes_read = match file.read(&mut buf).await? {
            0 if self.loop_on_eof && *offset > 0 => {
                file.seek(tokio::io::SeekFrom::Start(0)).await?;
                let n = file.read(&mut buf).await?;
                *offset = n as u64;
                n
            }
            n => {
                *offset += n as u64;
                n
            }
        };
        buf.truncate(bytes_read);
        Ok(buf)
    }
}

/// Moves bytes from a source into a channel at a fixed pace.
pub struct Pump {
    source: Arc<dyn ByteSource>,
    channel: Arc<Channel>,
    chunk: usize,
    interval: Duration,
}

impl Pump {
    pub fn new(
        source: Arc<dyn ByteSource>,
        channel: Arc<Channel>,
        chunk: usize,
        interval: Duration,
    ) -> Self {
        Self { source, channel, chunk, interval }
    }

    pub async fn from_config(channel: Arc<Channel>, cfg: &SourceConfig) -> Result<Self, Error> {
        let source = FileSource::open(&cfg.path, cfg.loop_.unwrap_or(false)).await?;
        Ok(Self::new(
            Arc::new(source),
            channel,
            cfg.chunk,
            Duration::from_millis(cfg.interval_ms),
        ))
    }

    /// Runs until the source is exhausted, returning the number of bytes moved.
    pub async fn run(self) -> Result<u64, Error> {
        log::info!("Pump for channel '{}' started", self.channel.id());
        let mut total = 0u64;
        loop {
            let data = self.source.read_chunk(self.chunk).await?;
            if data.is_empty() {
                log::info!(
                    "Source of channel '{}' exhausted after {} bytes",
                    self.channel.id(),
                    total
                );
                return Ok(total);
            }
            total += data.len() as u64;
            self.channel.write(&data).await;

            if self.interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.interval).await;
            }
        }
    }
}

/// Drives all pumps concurrently until every one of them has finished.
pub async fn run_pumps(pumps: Vec<Pump>) {
    let ids: Vec<String> = pumps.iter().map(|p| p.channel.id().to_string()).collect();
    let results = join_all(pumps.into_iter().map(Pump::run)).await;
    for (id, res) in ids.iter().zip(results) {
        if let Err(e) = res {
            log::error!("Pump for channel '{}' failed: {}", id, e);
        }
    }
}
