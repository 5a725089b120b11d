//! # Configuration Module
//!
//! This module handles configuration management and data directory setup for
//! Moodmix. It provides platform-appropriate storage locations and the engine
//! settings that drive every evaluation pass.
//!
//! ## File Locations
//!
//! - Configuration: `<config dir>/moodmix/config.json`
//!   (`~/.config/moodmix/config.json` on Linux)
//! - Clip library: `<data dir>/moodmix/library.json`
//!   (`~/.local/share/moodmix/library.json` on Linux)
//!
//! A missing configuration file is not an error; every field has a default
//! and a partial file only overrides the fields it names.
//!
//! ## Example
//!
//! ```json
//! {
//!   "classifier_address": "localhost:8080",
//!   "song_duration": 20.0,
//!   "pitch_down_duration": 1.0,
//!   "happiness_threshold": 50.0
//! }
//! ```

use anyhow::{ensure, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "moodmix";

/// Returns the platform-appropriate data directory for Moodmix, creating it
/// if needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The moodmix subdirectory cannot be created due to permissions
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        ))?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!(
            "Failed to create Moodmix data directory at {}. Please check file permissions.",
            app_dir.display()
        ))?;

    Ok(app_dir)
}

/// Returns the path of the default configuration file. The file itself is
/// not created.
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!(
            "Could not determine system config directory. Use --config to pass a file explicitly."
        ))?;

    Ok(config_dir.join(APP_DIR).join("config.json"))
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `host:port` of the emotion classifier.
    pub classifier_address: String,
    /// Seconds of pitch fade at the end of every window.
    pub pitch_down_duration: f32,
    /// Seconds of pitch rise between clips. Reserved: pitch currently snaps
    /// back to normal when a window closes.
    pub pitch_up_duration: f32,
    /// Seconds each clip is auditioned for.
    pub song_duration: f32,
    /// Percent of window time that must read as happy for a clip to qualify.
    pub happiness_threshold: f32,
    /// Classifier poll cadence, in milliseconds.
    pub poll_interval_ms: u64,
    /// Host frames per second; one evaluation tick per frame.
    pub frame_rate: u32,
    /// Minimum seconds between classifier reconnect attempts.
    pub reconnect_interval_secs: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            classifier_address: "localhost:8080".to_string(),
            pitch_down_duration: 1.0,
            pitch_up_duration: 1.0,
            song_duration: 20.0,
            happiness_threshold: 50.0,
            poll_interval_ms: 40,
            frame_rate: 60,
            reconnect_interval_secs: 5.0,
        }
    }
}

impl EngineConfig {
    /// Loads the configuration at `path`, or the default file when `path`
    /// is `None`. A missing default file yields the defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = get_config_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("No config at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration at {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Configuration {} is not valid JSON", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes this configuration as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write configuration to {}", path.display()))?;
        Ok(())
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=100.0).contains(&self.happiness_threshold),
            "happiness_threshold must be between 0 and 100, got {}",
            self.happiness_threshold
        );
        ensure!(
            self.song_duration > 0.0 && self.song_duration.is_finite(),
            "song_duration must be a positive number of seconds, got {}",
            self.song_duration
        );
        ensure!(
            self.pitch_down_duration >= 0.0 && self.pitch_down_duration.is_finite(),
            "pitch_down_duration must not be negative, got {}",
            self.pitch_down_duration
        );
        ensure!(
            self.pitch_down_duration <= self.song_duration,
            "pitch_down_duration ({}) must not be longer than song_duration ({})",
            self.pitch_down_duration,
            self.song_duration
        );
        ensure!(
            self.pitch_up_duration >= 0.0 && self.pitch_up_duration.is_finite(),
            "pitch_up_duration must not be negative, got {}",
            self.pitch_up_duration
        );
        ensure!(self.frame_rate > 0, "frame_rate must be at least 1");
        ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be at least 1");
        ensure!(
            self.reconnect_interval_secs >= 0.0 && self.reconnect_interval_secs.is_finite(),
            "reconnect_interval_secs must not be negative, got {}",
            self.reconnect_interval_secs
        );
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate))
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs_f32(self.reconnect_interval_secs)
    }
}
