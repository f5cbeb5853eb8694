//! Runtime configuration

use crate::error::ConfigError;
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_DOC_GRACE: Duration = Duration::from_secs(2);
const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_ACK_EMOJI: &str = "👀";

/// Largest attachment we download
pub const MAX_ATTACHMENT_BYTES: usize = 8 * 1024 * 1024;

/// Configuration for the autohelp engine
#[derive(Debug, Clone)]
pub struct AutohelpConfig {
    /// Conversations are forgotten this long after they start
    pub idle_timeout: Duration,
    /// How long a newly selected exception shows "looking for documentation"
    pub doc_grace: Duration,
    /// How long a repeat message waits for analysis before skipping its reaction
    pub ack_timeout: Duration,
    /// Reaction added to repeat messages once analysis has produced something
    pub ack_emoji: String,
    /// Channels to watch; empty means every channel
    pub channels: HashSet<u64>,
    /// Extra tag definitions (JSON)
    pub tags_path: Option<PathBuf>,
}

impl Default for AutohelpConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            doc_grace: DEFAULT_DOC_GRACE,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            ack_emoji: DEFAULT_ACK_EMOJI.to_string(),
            channels: HashSet::new(),
            tags_path: None,
        }
    }
}

impl AutohelpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            idle_timeout: parse_or(&lookup, "AUTOHELP_IDLE_TIMEOUT_SECS")?
                .map_or(defaults.idle_timeout, Duration::from_secs),
            doc_grace: parse_or(&lookup, "AUTOHELP_DOC_GRACE_MS")?
                .map_or(defaults.doc_grace, Duration::from_millis),
            ack_timeout: parse_or(&lookup, "AUTOHELP_ACK_TIMEOUT_SECS")?
                .map_or(defaults.ack_timeout, Duration::from_secs),
            ack_emoji: lookup("AUTOHELP_ACK_EMOJI")
                .filter(|e| !e.trim().is_empty())
                .unwrap_or(defaults.ack_emoji),
            channels: parse_channels(lookup("AUTOHELP_CHANNELS").as_deref())?,
            tags_path: lookup("AUTOHELP_TAGS_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        })
    }

    /// Whether messages from `channel_id` should be analyzed
    pub fn watches(&self, channel_id: u64) -> bool {
        self.channels.is_empty() || self.channels.contains(&channel_id)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

fn parse_channels(value: Option<&str>) -> Result<HashSet<u64>, ConfigError> {
    let Some(value) = value else {
        return Ok(HashSet::new());
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse().map_err(|_| ConfigError::InvalidValue {
                key: "AUTOHELP_CHANNELS",
                value: id.to_string(),
            })
        })
        .collect()
}
