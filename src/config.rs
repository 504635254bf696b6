//! Scheduler configuration.
//!
//! Group caps, pool size, ranges, and the sound catalog entries are loaded
//! from JSON before the scheduler initializes. Malformed entries degrade
//! gracefully: duplicates are skipped and reported, never fatal.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::SoundDefinition;
use crate::error::ConfigError;
use crate::scheduler::GroupConfig;

fn default_general_channels() -> usize {
    16
}

fn default_master_volume() -> f32 {
    1.0
}

fn default_max_audible_distance() -> f32 {
    100.0
}

fn default_fade_out_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of general-purpose channels (the reserved channel is extra).
    #[serde(default = "default_general_channels")]
    pub general_channels: usize,

    /// Volume multiplier applied to every channel (0.0-1.0)
    #[serde(default = "default_master_volume")]
    pub master_volume: f32,

    /// Global audible range; requests farther from the listener are culled.
    #[serde(default = "default_max_audible_distance")]
    pub max_audible_distance: f32,

    /// Fade-out duration used by `stop` when none is given explicitly.
    #[serde(default = "default_fade_out_ms")]
    pub default_fade_out_ms: u64,

    /// Concurrency-capped sound groups.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,

    /// Catalog entries resolving logical sound names to clips.
    #[serde(default)]
    pub sounds: Vec<SoundDefinition>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            general_channels: default_general_channels(),
            master_volume: default_master_volume(),
            max_audible_distance: default_max_audible_distance(),
            default_fade_out_ms: default_fade_out_ms(),
            groups: Vec::new(),
            sounds: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        let config: SchedulerConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;

        config.validate()?;
        tracing::info!(path = %path.display(), "Loaded scheduler config");
        Ok(config)
    }

    /// Load configuration, creating and saving the default if the file does
    /// not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "Created default scheduler config");
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general_channels == 0 {
            return Err(ConfigError::Invalid(
                "general_channels must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.master_volume) {
            return Err(ConfigError::Invalid(format!(
                "master_volume {} outside [0, 1]",
                self.master_volume
            )));
        }
        Ok(())
    }

    pub fn default_fade_out(&self) -> Duration {
        Duration::from_millis(self.default_fade_out_ms)
    }
}
