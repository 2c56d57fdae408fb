//! Configuration file parser for ~/.config/newsdesk/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! All tuning knobs for the ingestion heuristics live here as named values
//! so tests can vary them instead of relying on literals.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Configuration
// ============================================================================

/// Ingestion tuning knobs.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// New (non-duplicate) items persisted per feed per run. Already-seen
    /// entries do not count against this cap.
    pub max_new_items_per_feed: usize,

    /// Minimum validated pixel width for an image candidate to qualify.
    pub min_image_width: u32,

    /// Width at which the image resolver stops scanning further candidates.
    pub short_circuit_width: u32,

    /// Content older than this many days is eligible for pruning.
    pub retention_days: i64,

    /// Timeout for fetching a feed document, in seconds.
    pub feed_timeout_secs: u64,

    /// Timeout for a single image width probe, in seconds.
    pub image_probe_timeout_secs: u64,

    /// Maximum feed document size in bytes.
    pub max_feed_bytes: usize,

    /// Maximum bytes read from an image probe. Dimension sniffing only needs
    /// the header, so this stays small.
    pub max_probe_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_new_items_per_feed: 3,
            min_image_width: 200,
            short_circuit_width: 400,
            retention_days: 30,
            feed_timeout_secs: 30,
            image_probe_timeout_secs: 5,
            max_feed_bytes: 10 * 1024 * 1024,
            max_probe_bytes: 512 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior)
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
