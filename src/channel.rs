use crate::circular_buffer::CircularBuffer;
use crate::config::{IndexWidth, ResolvedChannel};
use crate::error::Error;
use crate::integer_math::RingIndex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Byte buffer with the index width picked at runtime.
pub enum ByteRing {
    U8(CircularBuffer<u8, u8>),
    U16(CircularBuffer<u16, u8>),
    U32(CircularBuffer<u32, u8>),
    U64(CircularBuffer<u64, u8>),
}

macro_rules! dispatch {
    ($self:expr, $buf:ident => $body:expr) => {
        match $self {
            ByteRing::U8($buf) => $body,
            ByteRing::U16($buf) => $body,
            ByteRing::U32($buf) => $body,
            ByteRing::U64($buf) => $body,
        }
    };
}

impl ByteRing {
    pub fn new(width: IndexWidth, capacity: u64) -> Result<Self, Error> {
        Ok(match width {
            IndexWidth::U8 => ByteRing::U8(CircularBuffer::try_with_capacity(capacity)?),
            IndexWidth::U16 => ByteRing::U16(CircularBuffer::try_with_capacity(capacity)?),
            IndexWidth::U32 => ByteRing::U32(CircularBuffer::try_with_capacity(capacity)?),
            IndexWidth::U64 => ByteRing::U64(CircularBuffer::try_with_capacity(capacity)?),
        })
    }

    pub fn size(&self) -> u64 {
        dispatch!(self, buf => buf.size().to_u64())
    }

    pub fn count(&self) -> u64 {
        dispatch!(self, buf => buf.count().to_u64())
    }

    pub fn free_space(&self) -> u64 {
        dispatch!(self, buf => buf.free_space().to_u64())
    }

    pub fn is_enabled(&self) -> bool {
        dispatch!(self, buf => buf.is_enabled())
    }

    pub fn write(&mut self, data: &[u8]) {
        dispatch!(self, buf => buf.write(data))
    }

    pub fn read(&mut self, out: &mut [u8]) -> usize {
        dispatch!(self, buf => buf.read(out))
    }

    pub fn read_to_end(&mut self, out: &mut [u8], sentinel: u8) -> usize {
        dispatch!(self, buf => buf.read_to_end(out, sentinel))
    }

    pub fn take(&mut self, count: usize) -> Vec<u8> {
        dispatch!(self, buf => buf.take(count))
    }

    pub fn reset(&mut self) {
        dispatch!(self, buf => buf.reset())
    }
}

/// Maps the D-Bus sentinel argument of `ReadToEnd`.
///
/// Negative values select the channel's configured sentinel, `0..=255` is
/// used as given, anything larger is rejected.
pub fn sentinel_from_wire(value: i16) -> Result<Option<u8>, Error> {
    if value < 0 {
        return Ok(None);
    }
    u8::try_from(value)
        .map(Some)
        .map_err(|_| Error::InvalidSentinel(value))
}

/// Transfer counters of a channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    pub size: u64,
    pub count: u64,
    pub written: u64,
    pub read: u64,
    pub dropped: u64,
}

/// A named byte buffer shared between a producer and D-Bus consumers.
pub struct Channel {
    id: String,
    sentinel: Option<u8>,
    ring: Mutex<ByteRing>,
    written: AtomicU64,
    read: AtomicU64,
    dropped: AtomicU64,
}

impl Channel {
    pub fn new(id: impl Into<String>, ring: ByteRing, sentinel: Option<u8>) -> Self {
        Self {
            id: id.into(),
            sentinel,
            ring: Mutex::new(ring),
            written: AtomicU64::new(0),
            read: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn from_config(cfg: &ResolvedChannel) -> Result<Self, Error> {
        let ring = ByteRing::new(cfg.width, cfg.capacity)?;
        Ok(Self::new(cfg.id.clone(), ring, cfg.sentinel))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Writes `data`, returning how many unread bytes were overwritten.
    pub async fn write(&self, data: &[u8]) -> u64 {
        let mut ring = self.ring.lock().await;
        if !ring.is_enabled() {
            return 0;
        }
        let free = ring.free_space();
        ring.write(data);
        drop(ring);

        let len = data.len() as u64;
        let lost = len.saturating_sub(free);
        self.written.fetch_add(len, Ordering::Relaxed);
        if lost > 0 {
            self.dropped.fetch_add(lost, Ordering::Relaxed);
            log::warn!("Channel '{}' overrun: {} bytes dropped", self.id, lost);
        }
        lost
    }

    pub async fn read(&self, max: usize) -> Vec<u8> {
        let data = self.ring.lock().await.take(max);
        self.read.fetch_add(data.len() as u64, Ordering::Relaxed);
        data
    }

    /// Reads up to and including `sentinel`, or the channel's default marker.
    pub async fn read_to_end(&self, max: usize, sentinel: Option<u8>) -> Result<Vec<u8>, Error> {
        let sentinel = sentinel.or(self.sentinel).ok_or_else(|| {
            Error::Config(format!("Channel '{}' has no default sentinel", self.id))
        })?;
        let mut ring = self.ring.lock().await;
        let mut out = vec![0u8; max.min(ring.count() as usize)];
        let n = ring.read_to_end(&mut out, sentinel);
        drop(ring);

        out.truncate(n);
        self.read.fetch_add(n as u64, Ordering::Relaxed);
        Ok(out)
    }

    pub async fn reset(&self) {
        self.ring.lock().await.reset();
        log::debug!("Channel '{}' reset", self.id);
    }

    pub async fn stats(&self) -> ChannelStats {
        let ring = self.ring.lock().await;
        ChannelStats {
            size: ring.size(),
            count: ring.count(),
            written: self.written.load(Ordering::Relaxed),
            read: self.read.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// All configured channels by id.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: BTreeMap<String, Arc<Channel>>,
}

impl ChannelRegistry {
    pub fn from_config(cfg: &[ResolvedChannel]) -> Result<Self, Error> {
        let mut registry = Self::default();
        for ch in cfg {
            registry.insert(Channel::from_config(ch)?);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, channel: Channel) -> Arc<Channel> {
        let channel = Arc::new(channel);
        self.channels.insert(channel.id().to_string(), channel.clone());
        channel
    }

    pub fn get(&self, id: &str) -> Result<Arc<Channel>, Error> {
        self.channels
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownChannel(id.to_string()))
    }

    pub fn ids(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }
}
