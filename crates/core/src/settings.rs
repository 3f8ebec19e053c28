use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::RunConfig;
use crate::error::ConfigError;
use crate::logger::Level;
use crate::types::*;

/// Button color the confirm target shows when a drag can be confirmed.
pub const DEFAULT_CONFIRM_COLOR: Color = Color::new(219, 124, 0);

/// Tuning knobs, kept apart from the captured coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tolerance: u8,
    pub delays: Delays,
    pub message_level: Level,
    pub debug_color_matching: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tolerance: 15,
            delays: Delays::default(),
            message_level: Level::Info,
            debug_color_matching: false,
        }
    }
}

impl Settings {
    /// Missing or unreadable files yield the defaults.
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }
}

/// Coordinates and colors produced by the setup step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub slots: Vec<MonitoredSlot>,
    pub drop_zone: Option<DropZone>,
    pub confirm: Option<ProfileConfirm>,
}

/// Confirm button as stored; the color falls back to the usual button color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfirm {
    pub coord: Coordinate,
    #[serde(default = "default_confirm_color")]
    pub color: Color,
}

fn default_confirm_color() -> Color {
    DEFAULT_CONFIRM_COLOR
}

impl Profile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing profile {}", path.display()))
    }

    /// Combine with `settings` into the value the engine runs on.
    pub fn to_run_config(&self, settings: &Settings) -> Result<RunConfig, ConfigError> {
        if self.slots.is_empty() {
            return Err(ConfigError::NoSlots);
        }
        let drop_zone = self.drop_zone.ok_or(ConfigError::MissingDropZone)?;
        let confirm = self.confirm.ok_or(ConfigError::MissingConfirm)?;
        let config = RunConfig {
            slots: self.slots.clone(),
            drop_zone,
            confirm: ConfirmTarget { coord: confirm.coord, color: confirm.color },
            tolerance: settings.tolerance,
            delays: settings.delays,
            debug_color_matching: settings.debug_color_matching,
        };
        config.validate()?;
        Ok(config)
    }
}
