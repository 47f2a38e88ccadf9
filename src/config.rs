use crate::error::Error;
use log::error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default, rename = "channel")]
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    pub id: String,
    pub capacity: u64,
    #[serde(default)]
    pub index: Option<IndexWidth>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub sentinel: Option<u8>,
    #[serde(default)]
    pub source: Option<SourceConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub path: String,
    #[serde(default, rename = "loop")]
    pub loop_: Option<bool>,
    #[serde(default = "default_chunk")]
    pub chunk: usize,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_chunk() -> usize {
    64
}

fn default_interval_ms() -> u64 {
    10
}

/// Integer width used for a channel's capacity and cursors.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexWidth {
    U8,
    U16,
    U32,
    U64,
}

impl IndexWidth {
    /// Smallest width that can represent `capacity`.
    pub fn smallest_for(capacity: u64) -> Self {
        [IndexWidth::U8, IndexWidth::U16, IndexWidth::U32]
            .into_iter()
            .find(|w| w.holds(capacity))
            .unwrap_or(IndexWidth::U64)
    }

    pub fn holds(self, capacity: u64) -> bool {
        capacity <= self.max()
    }

    pub fn max(self) -> u64 {
        match self {
            IndexWidth::U8 => u8::MAX as u64,
            IndexWidth::U16 => u16::MAX as u64,
            IndexWidth::U32 => u32::MAX as u64,
            IndexWidth::U64 => u64::MAX,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IndexWidth::U8 => "u8",
            IndexWidth::U16 => "u16",
            IndexWidth::U32 => "u32",
            IndexWidth::U64 => "u64",
        }
    }
}

/// A validated channel, ready to be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    pub id: String,
    /// `0` for channels configured as disabled.
    pub capacity: u64,
    pub width: IndexWidth,
    pub sentinel: Option<u8>,
    pub source: Option<SourceConfig>,
}

pub fn load_config(path: &str) -> Result<Vec<ResolvedChannel>, Error> {
    if !Path::new(path).exists() {
        return Err(Error::Config(format!("Config file not found: {}", path)));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path, e)))?;

    let channels = parse_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path, e)))?;

    log::info!("Config loaded from: {}", path);
    Ok(channels)
}

/// Parses and validates TOML channel configuration.
pub fn parse_config(content: &str) -> Result<Vec<ResolvedChannel>, Error> {
    let cfg: Config = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Failed to parse TOML config: {}", e)))?;

    log::info!("Found {} channels in config", cfg.channels.len());

    let mut channels = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    for ch in cfg.channels.into_iter() {
        if !is_valid_id(&ch.id) {
            error!("Invalid channel id '{}'. Use [a-z0-9][a-z0-9_-]*", ch.id);
            continue;
        }
        if !seen_ids.insert(ch.id.clone()) {
            error!("Duplicate channel id '{}' - skipping", ch.id);
            continue;
        }
        channels.push(resolve_channel(ch)?);
    }

    let enabled = channels.iter().filter(|c| c.capacity > 0).count();
    log::info!(
        "Channels: {} enabled, {} disabled",
        enabled,
        channels.len() - enabled
    );
    if channels.is_empty() {
        log::warn!("No channels found in config - every request will fail");
    }

    Ok(channels)
}

fn resolve_channel(ch: ChannelConfig) -> Result<ResolvedChannel, Error> {
    if !ch.enabled {
        if ch.source.is_some() {
            log::info!("Channel '{}' is disabled, ignoring its source", ch.id);
        }
        return Ok(ResolvedChannel {
            id: ch.id,
            capacity: 0,
            width: ch.index.unwrap_or(IndexWidth::U8),
            sentinel: ch.sentinel,
            source: None,
        });
    }

    let width = match ch.index {
        Some(width) if !width.holds(ch.capacity) => {
            return Err(Error::CapacityOutOfRange {
                capacity: ch.capacity,
                width: width.name(),
            });
        }
        Some(width) => width,
        None => IndexWidth::smallest_for(ch.capacity),
    };

    if let Some(source) = &ch.source {
        if source.chunk == 0 {
            return Err(Error::Config(format!(
                "Channel '{}': source chunk must be greater than 0",
                ch.id
            )));
        }
    }

    Ok(ResolvedChannel {
        id: ch.id,
        capacity: ch.capacity,
        width,
        sentinel: ch.sentinel,
        source: ch.source,
    })
}

/// Channel ids follow `[a-z0-9][a-z0-9_-]*`.
fn is_valid_id(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_lc_alnum)
        && chars.all(|c| is_lc_alnum(c) || c == '-' || c == '_')
}

fn is_lc_alnum(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9')
}
