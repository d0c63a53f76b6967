//! # Trace Configuration
//!
//! Recorder and store settings, loaded once at startup from TOML.
//!
//! ```toml
//! [recorder]
//! min_sample_distance = 0.05
//! max_points = 100000
//!
//! [store]
//! directory = "trajectories"
//! ```
//!
//! Every field is optional and falls back to the defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TraceError, TraceResult};

/// Top-level configuration document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Recorder settings.
    #[serde(default)]
    pub recorder: RecorderConfig,
    /// Local store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Configuration for the live trajectory recorder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Samples closer than this to the last kept sample are skipped (world units).
    #[serde(default = "default_min_sample_distance")]
    pub min_sample_distance: f32,
    /// Hard cap on kept samples per recording.
    #[serde(default = "default_max_points")]
    pub max_points: usize,
}

/// Configuration for the uncompressed point store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding `.strk` point files.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

fn default_min_sample_distance() -> f32 {
    0.05
}

fn default_max_points() -> usize {
    100_000
}

fn default_directory() -> PathBuf {
    PathBuf::from("trajectories")
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            min_sample_distance: default_min_sample_distance(),
            max_points: default_max_points(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
        }
    }
}

impl RecorderConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a negative or non-finite distance, or a zero cap.
    pub fn validate(&self) -> TraceResult<()> {
        if !self.min_sample_distance.is_finite() || self.min_sample_distance < 0.0 {
            return Err(TraceError::InvalidConfig(format!(
                "recorder.min_sample_distance must be a finite value >= 0, got {}",
                self.min_sample_distance
            )));
        }
        if self.max_points == 0 {
            return Err(TraceError::InvalidConfig(
                "recorder.max_points must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl TraceConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `Config` on malformed TOML, `InvalidConfig` on out-of-range values.
    pub fn from_toml_str(content: &str) -> TraceResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as `from_toml_str`.
    pub fn from_file(path: impl AsRef<Path>) -> TraceResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("Loaded trace config from {}", path.display());
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` on the first bad value.
    pub fn validate(&self) -> TraceResult<()> {
        self.recorder.validate()?;
        if self.store.directory.as_os_str().is_empty() {
            return Err(TraceError::InvalidConfig("store.directory must not be empty".to_string()));
        }
        Ok(())
    }
}
