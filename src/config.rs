//! Configuration loader for voicestars.
//!
//! * Looks for `voicestars.toml` in the cwd unless overridden by `--config`.
//! * Provides defaults so the file is optional.
//!
//! Custom difficulties go in `[[difficulty]]` tables and use the same field
//! names as the presets.

use serde::Deserialize;
use std::fs;

use crate::audio::DEFAULT_AMPLITUDE_GAIN;
use crate::difficulty::{DifficultyProfile, DifficultyRegistry};
use crate::settings::DEFAULT_SETTINGS_PATH;

pub const DEFAULT_CONFIG_PATH: &str = "voicestars.toml";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File the difficulty preference is persisted in.
    pub settings_path:  String,
    /// cpal input device name; the host default when absent.
    pub input_device:   Option<String>,
    /// Multiplier from mean |sample| to game amplitude units.
    pub amplitude_gain: f32,
    /// Presentation scale in points.
    pub screen_width:   f32,
    pub screen_height:  f32,
    /// Extra difficulty profiles.
    #[serde(rename = "difficulty")]
    pub difficulties:   Vec<DifficultyProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_path:  DEFAULT_SETTINGS_PATH.to_string(),
            input_device:   None,
            amplitude_gain: DEFAULT_AMPLITUDE_GAIN,
            screen_width:   390.0,
            screen_height:  844.0,
            difficulties:   Vec::new(),
        }
    }
}

impl Config {
    /// Load from a TOML file; fall back to defaults on any error.
    pub fn load(path: Option<&str>) -> Self {
        let p = path.unwrap_or(DEFAULT_CONFIG_PATH);
        match fs::read_to_string(p) {
            Ok(text) => Self::parse(&text).unwrap_or_else(|err| {
                log::warn!("ignoring {p}: {err}");
                Self::default()
            }),
            Err(err) => {
                if path.is_some() {
                    log::warn!("cannot read {p}: {err}; using defaults");
                }
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Presets plus every valid custom profile; invalid ones are skipped.
    pub fn registry(&self) -> DifficultyRegistry {
        let mut registry = DifficultyRegistry::with_presets();
        for profile in &self.difficulties {
            if let Err(err) = registry.register(profile.clone()) {
                log::warn!("skipping custom difficulty: {err}");
            }
        }
        registry
    }
}
