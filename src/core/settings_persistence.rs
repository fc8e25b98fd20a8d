//! Settings persistence
//!
//! Saves and loads [`TrainerSettings`] to/from a JSON file in the user's
//! configuration directory.
//!
//! # Error Handling
//!
//! Both load and save operations handle errors gracefully:
//! - Load failures fall back to default settings
//! - Save failures are returned to the caller, which logs them
//!
//! # File Location
//!
//! `settings.json` under the platform config dir resolved by
//! [`ProjectDirs`], or the working directory when no config dir exists.

use crate::board::Orientation;
use crate::core::error::TrainerResult;
use crate::state::TrainerMode;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Settings filename
const SETTINGS_FILENAME: &str = "settings.json";

/// Delays applied to deferred board effects, in milliseconds
///
/// The delays give the player a move-and-reply rhythm; the state container is
/// updated eagerly regardless of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnDelays {
    /// Wait before the book reply is played after a correct move
    pub reply_ms: u64,
    /// Wait before an incorrect move is taken back
    pub revert_ms: u64,
    /// Wait before the board is reset after the line ends
    pub reset_ms: u64,
}

impl Default for TurnDelays {
    fn default() -> Self {
        Self {
            reply_ms: 200,
            revert_ms: 600,
            reset_ms: 1000,
        }
    }
}

impl TurnDelays {
    pub fn reply(&self) -> Duration {
        Duration::from_millis(self.reply_ms)
    }

    pub fn revert(&self) -> Duration {
        Duration::from_millis(self.revert_ms)
    }

    pub fn reset(&self) -> Duration {
        Duration::from_millis(self.reset_ms)
    }
}

/// User preferences for a training session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerSettings {
    pub delays: TurnDelays,
    /// Mode a new session starts in
    pub mode: TrainerMode,
    /// Side shown at the bottom of the board
    pub orientation: Orientation,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            delays: TurnDelays::default(),
            mode: TrainerMode::Learn,
            orientation: Orientation::White,
            log_filter: "info".to_string(),
        }
    }
}

/// Resolve the settings file path
///
/// Returns a path to `settings.json` in the user's configuration directory,
/// falling back to a local `settings.json` if the config dir cannot be found.
pub fn settings_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "trilltino", "OpeningTrainer") {
        proj_dirs.config_dir().join(SETTINGS_FILENAME)
    } else {
        PathBuf::from(SETTINGS_FILENAME)
    }
}

/// Read settings strictly, surfacing I/O and parse errors
pub fn read_settings(path: &Path) -> TrainerResult<TrainerSettings> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Load settings, falling back to defaults when the file is missing or invalid
pub fn load_settings(path: &Path) -> TrainerSettings {
    if !path.exists() {
        info!("[SETTINGS] No settings file found at {:?}. Using defaults.", path);
        return TrainerSettings::default();
    }

    match read_settings(path) {
        Ok(settings) => {
            info!("[SETTINGS] Loaded settings from {:?}", path);
            settings
        }
        Err(e) => {
            warn!(
                "[SETTINGS] Failed to load settings file at {:?}: {}. Using defaults.",
                path, e
            );
            TrainerSettings::default()
        }
    }
}

/// Write settings as pretty JSON, creating the parent directory if needed
pub fn save_settings(settings: &TrainerSettings, path: &Path) -> TrainerResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    info!("[SETTINGS] Saved settings to {:?}", path);
    Ok(())
}
