//! Crate configuration types and sanitization.

use serde::{Deserialize, Serialize};

const DEFAULT_VOLUME: f64 = 0.1;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_READ_TIMEOUT_MS: u64 = 15_000;

/// Top-level configuration for a bridge deployment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub playback: PlaybackConfig,
    pub content: ContentConfig,
}

/// Playback defaults applied when the bridge is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Volume applied at construction, between 0.0 and 1.0.
    /// Kept low by default so a fresh deployment never blasts audio.
    pub default_volume: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_VOLUME,
        }
    }
}

/// Remote content settings used by the HTTP playlist fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Base URL the playlist and media paths are resolved against.
    /// Empty means content is read from a local directory instead.
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

/// Clamps config values into their supported ranges.
pub fn sanitize_config(mut config: Config) -> Config {
    config.playback.default_volume = config.playback.default_volume.clamp(0.0, 1.0);
    if config.content.connect_timeout_ms == 0 {
        config.content.connect_timeout_ms = DEFAULT_CONNECT_TIMEOUT_MS;
    }
    if config.content.read_timeout_ms == 0 {
        config.content.read_timeout_ms = DEFAULT_READ_TIMEOUT_MS;
    }
    config
}
