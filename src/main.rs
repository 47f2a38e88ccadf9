use clap::Parser;
use log::{error, info};
use ringbuf_hal::channel::{sentinel_from_wire, ChannelRegistry};
use ringbuf_hal::config::load_config;
use ringbuf_hal::sources::{run_pumps, Pump};
use std::future::pending;
use zbus::{connection, interface};

#[derive(Parser, Debug)]
#[command(name = "ringbufd", about = "Serves bounded byte channels over D-Bus")]
struct Args {
    /// Path to the TOML channel configuration.
    #[arg(short, long)]
    config: Option<String>,

    /// Connect to the system bus instead of the session bus.
    #[arg(long)]
    system: bool,
}

fn get_config_path() -> String {
    if let Ok(home) = std::env::var("HOME") {
        format!("{}/.config/ringbufd/config.toml", home)
    } else {
        "/etc/ringbufd/config.toml".to_string()
    }
}

struct ChannelService(ChannelRegistry);

#[interface(name = "lv.lumii.ringbuf.Channels")]
impl ChannelService {
    /// ListChannels returns the ids of all configured channels.
    async fn list_channels(&self) -> Vec<String> {
        self.0.ids()
    }

    /// Write appends `data`; the oldest unread bytes are dropped on overrun.
    async fn write(&self, channel: &str, data: Vec<u8>) -> i32 {
        match self.0.get(channel) {
            Ok(ch) => {
                ch.write(&data).await;
                0
            }
            Err(e) => {
                error!("Write failed: {}", e);
                e.to_dbus_status()
            }
        }
    }

    /// Read returns up to `max` of the oldest bytes.
    async fn read(&self, channel: &str, max: u64) -> (i32, Vec<u8>) {
        match self.0.get(channel) {
            Ok(ch) => (0, ch.read(max as usize).await),
            Err(e) => {
                error!("Read failed: {}", e);
                (e.to_dbus_status(), Vec::new())
            }
        }
    }

    /// ReadToEnd reads up to and including `sentinel`, at most `max` bytes.
    /// A negative sentinel selects the channel's configured marker.
    async fn read_to_end(&self, channel: &str, max: u64, sentinel: i16) -> (i32, Vec<u8>) {
        let result = match (self.0.get(channel), sentinel_from_wire(sentinel)) {
            (Ok(ch), Ok(sentinel)) => ch.read_to_end(max as usize, sentinel).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        match result {
            Ok(bytes) => (0, bytes),
            Err(e) => {
                error!("ReadToEnd failed: {}", e);
                (e.to_dbus_status(), Vec::new())
            }
        }
    }

    /// GetStats returns (status, size, count, written, read, dropped).
    async fn get_stats(&self, channel: &str) -> (i32, u64, u64, u64, u64, u64) {
        match self.0.get(channel) {
            Ok(ch) => {
                let s = ch.stats().await;
                (0, s.size, s.count, s.written, s.read, s.dropped)
            }
            Err(e) => (e.to_dbus_status(), 0, 0, 0, 0, 0),
        }
    }

    /// Reset drops all unread bytes of the channel.
    async fn reset(&self, channel: &str) -> i32 {
        match self.0.get(channel) {
            Ok(ch) => {
                ch.reset().await;
                0
            }
            Err(e) => e.to_dbus_status(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(get_config_path);
    let channels = load_config(&config_path)?;
    let registry = ChannelRegistry::from_config(&channels)?;

    let mut pumps = Vec::new();
    for ch in &channels {
        if let Some(source) = &ch.source {
            pumps.push(Pump::from_config(registry.get(&ch.id)?, source).await?);
        }
    }
    if !pumps.is_empty() {
        info!("Starting {} source pumps", pumps.len());
        tokio::spawn(run_pumps(pumps));
    }

    let builder = if args.system {
        connection::Builder::system()?
    } else {
        connection::Builder::session()?
    };
    let _connection = builder
        .name("lv.lumii.ringbuf")?
        .serve_at("/lv/lumii/ringbuf/Channels", ChannelService(registry))?
        .build()
        .await?;

    info!("D-Bus service 'lv.lumii.ringbuf' is running.");

    // Keep the application running indefinitely
    pending::<()>().await;

    Ok(())
}
