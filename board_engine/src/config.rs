//! Engine configuration.
//!
//! Every knob has a default so an empty JSON object (`{}`) is a valid
//! configuration. Durations are stored in milliseconds to keep the JSON flat.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use board_common::{BoardError, Result};
use serde::{Deserialize, Serialize};

/// Limits of one class-name cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries.
    pub max_items: usize,
    /// Maximum estimated size in bytes (key length + 2 bytes per value char).
    pub max_size: usize,
    /// Entries older than this are never returned.
    pub ttl_ms: u64,
    /// Refresh the entry age and recency on every hit.
    pub touch_on_read: bool,
}

impl CacheConfig {
    /// Defaults of the price-color cache.
    pub const COLOR: CacheConfig = CacheConfig {
        max_items: 1000,
        max_size: 256 * 1024,
        ttl_ms: 5 * 60 * 1000,
        touch_on_read: true,
    };

    /// Defaults of the change-animation cache.
    pub const ANIMATION: CacheConfig = CacheConfig {
        max_items: 500,
        max_size: 64 * 1024,
        ttl_ms: 2000,
        touch_on_read: false,
    };

    /// Time to live as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::COLOR
    }
}

/// Tuning of the caches and the color worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Price-color cache limits.
    pub color_cache: CacheConfig,
    /// Change-animation cache limits.
    pub animation_cache: CacheConfig,
    /// Quotes per chunk sent to the color worker.
    pub chunk_size: usize,
    /// Length of one animation frame.
    pub frame_interval_ms: u64,
    /// Cache updates flushed per frame.
    pub max_updates_per_frame: usize,
    /// Pause between chunks for low-priority batches.
    pub low_priority_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            color_cache: CacheConfig::COLOR,
            animation_cache: CacheConfig::ANIMATION,
            chunk_size: 50,
            frame_interval_ms: 16,
            max_updates_per_frame: 100,
            low_priority_delay_ms: 50,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let config: EngineConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the worker cannot run with.
    ///
    /// Cache limits are not checked here: a cache that cannot be built falls
    /// back to the unbounded map instead of failing the engine.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(BoardError::Config("chunk_size must be positive".into()));
        }
        if self.frame_interval_ms == 0 {
            return Err(BoardError::Config("frame_interval_ms must be positive".into()));
        }
        if self.max_updates_per_frame == 0 {
            return Err(BoardError::Config(
                "max_updates_per_frame must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Frame length as a `Duration`.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Low-priority pause as a `Duration`.
    pub fn low_priority_delay(&self) -> Duration {
        Duration::from_millis(self.low_priority_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.animation_cache.ttl(), Duration::from_secs(2));
        assert!(config.color_cache.touch_on_read);
    }

    #[test]
    fn partial_cache_section_keeps_other_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"animation_cache":{"ttl_ms":500},"chunk_size":20}"#).unwrap();
        assert_eq!(config.chunk_size, 20);
        assert_eq!(config.animation_cache.ttl_ms, 500);
        // missing fields inside a section fall back to CacheConfig::default
        assert_eq!(config.animation_cache.max_items, CacheConfig::COLOR.max_items);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let config = EngineConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(BoardError::Config(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EngineConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, BoardError::Io(_)));
    }
}
