//! Difficulty profiles: named bundles of tuning constants.
//!
//! Three presets ship with the game (`easy`, `medium`, `hard`). Extra profiles
//! can be registered at runtime (usually from `[[difficulty]]` tables in the
//! config file) once they pass [`DifficultyProfile::validate`].

use serde::{Deserialize, Serialize};

use crate::LEVEL_COUNT;

/// Name of the profile used whenever a requested one cannot be resolved.
pub const DEFAULT_DIFFICULTY: &str = "easy";

/// Longest sampling cadence a profile may ask for.
pub const MAX_CHECK_INTERVAL_SECONDS: f32 = 60.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DifficultyError {
    #[error("unknown difficulty '{0}'")]
    Unknown(String),
    #[error("invalid difficulty profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },
    #[error("'{0}' is a built-in difficulty and cannot be replaced")]
    BuiltIn(String),
}

/// Immutable tuning constants for one difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    pub name: String,
    /// Cumulative level thresholds as fractions of the playfield height.
    pub level_heights: [f32; LEVEL_COUNT],
    /// Amplitude above this counts as speaking.
    pub amplitude_threshold: f32,
    /// Position gained per second while speaking.
    pub rise_speed: f32,
    /// Position lost per second while silent.
    pub fall_speed: f32,
    /// Kept for parity with older tunings; movement uses `rise_speed`.
    #[serde(default = "default_rise_distance")]
    pub rise_distance: f32,
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: f32,
}

fn default_rise_distance() -> f32 { 10.0 }
fn default_check_interval() -> f32 { 0.1 }

impl DifficultyProfile {
    pub fn easy() -> Self {
        Self {
            name: "easy".to_string(),
            level_heights: [0.25, 0.50, 0.75],
            amplitude_threshold: 5.0,
            rise_speed: 100.0,
            fall_speed: 30.0,
            rise_distance: 10.0,
            check_interval_seconds: default_check_interval(),
        }
    }

    pub fn medium() -> Self {
        Self {
            name: "medium".to_string(),
            level_heights: [0.35, 0.65, 0.90],
            amplitude_threshold: 10.0,
            rise_speed: 120.0,
            fall_speed: 70.0,
            rise_distance: 8.0,
            check_interval_seconds: default_check_interval(),
        }
    }

    pub fn hard() -> Self {
        Self {
            name: "hard".to_string(),
            level_heights: [0.40, 0.70, 1.00],
            amplitude_threshold: 15.0,
            rise_speed: 150.0,
            fall_speed: 120.0,
            rise_distance: 6.0,
            check_interval_seconds: default_check_interval(),
        }
    }

    /// The built-in presets, easiest first.
    pub fn presets() -> Vec<Self> {
        vec![Self::easy(), Self::medium(), Self::hard()]
    }

    /// Height threshold of `level`, or `None` past the last level.
    #[inline]
    pub fn level_height(&self, level: usize) -> Option<f32> {
        self.level_heights.get(level).copied()
    }

    /// Sampling cadence as a `Duration`. Values a `Duration` cannot hold fall
    /// back to the 100 ms default.
    pub fn check_interval(&self) -> std::time::Duration {
        match std::time::Duration::try_from_secs_f32(self.check_interval_seconds) {
            Ok(interval) if !interval.is_zero() => interval,
            _ => {
                log::warn!(
                    "difficulty '{}' has unusable check interval {}; using {}s",
                    self.name,
                    self.check_interval_seconds,
                    default_check_interval()
                );
                std::time::Duration::from_millis(100)
            }
        }
    }

    /// Whether the name belongs to one of the shipped presets.
    pub fn is_built_in_name(name: &str) -> bool {
        let name = name.trim();
        ["easy", "medium", "hard"]
            .iter()
            .any(|preset| preset.eq_ignore_ascii_case(name))
    }

    /// Check the profile invariants: strictly increasing heights in (0, 1],
    /// finite, positive tuning constants and a check interval of at most
    /// [`MAX_CHECK_INTERVAL_SECONDS`].
    pub fn validate(&self) -> Result<(), DifficultyError> {
        let invalid = |reason: String| DifficultyError::InvalidProfile {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".into()));
        }

        let mut previous = 0.0f32;
        for (i, &h) in self.level_heights.iter().enumerate() {
            if !(h > 0.0 && h <= 1.0) {
                return Err(invalid(format!("level height #{i} ({h}) is outside (0, 1]")));
            }
            if i > 0 && h <= previous {
                return Err(invalid(format!(
                    "level heights must be strictly increasing ({previous} then {h})"
                )));
            }
            previous = h;
        }

        let positive = [
            ("amplitude_threshold", self.amplitude_threshold),
            ("rise_speed", self.rise_speed),
            ("fall_speed", self.fall_speed),
            ("rise_distance", self.rise_distance),
            ("check_interval_seconds", self.check_interval_seconds),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(format!("{field} must be a positive number, got {value}")));
            }
        }
        if self.check_interval_seconds > MAX_CHECK_INTERVAL_SECONDS {
            return Err(invalid(format!(
                "check_interval_seconds must be at most {MAX_CHECK_INTERVAL_SECONDS}, got {}",
                self.check_interval_seconds
            )));
        }
        Ok(())
    }
}

impl Default for DifficultyProfile {
    fn default() -> Self { Self::easy() }
}

/// Set of profiles the player can pick from, in registration order.
#[derive(Debug, Clone)]
pub struct DifficultyRegistry {
    profiles: Vec<DifficultyProfile>,
}

impl DifficultyRegistry {
    /// A registry holding only the built-in presets.
    pub fn with_presets() -> Self {
        Self { profiles: DifficultyProfile::presets() }
    }

    /// Add `profile`, replacing any custom profile with the same
    /// (case-insensitive) name. Presets can be re-registered unchanged but
    /// never redefined.
    pub fn register(&mut self, profile: DifficultyProfile) -> Result<(), DifficultyError> {
        profile.validate()?;
        match self.position(&profile.name) {
            Some(idx) if self.profiles[idx] == profile => {}
            Some(_) if DifficultyProfile::is_built_in_name(&profile.name) => {
                return Err(DifficultyError::BuiltIn(profile.name));
            }
            Some(idx) => self.profiles[idx] = profile,
            None => self.profiles.push(profile),
        }
        Ok(())
    }

    /// Look up a profile by name (case-insensitive).
    pub fn resolve(&self, name: &str) -> Result<DifficultyProfile, DifficultyError> {
        self.position(name)
            .map(|idx| self.profiles[idx].clone())
            .ok_or_else(|| DifficultyError::Unknown(name.to_string()))
    }

    /// Resolve `name`, falling back to `easy` when it is absent or unknown.
    pub fn resolve_or_default(&self, name: Option<&str>) -> DifficultyProfile {
        let Some(name) = name else {
            return self.fallback();
        };
        match self.resolve(name) {
            Ok(profile) => profile,
            Err(err) => {
                log::warn!("{err}; falling back to '{DEFAULT_DIFFICULTY}'");
                self.fallback()
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn profiles(&self) -> &[DifficultyProfile] {
        &self.profiles
    }

    fn fallback(&self) -> DifficultyProfile {
        self.resolve(DEFAULT_DIFFICULTY)
            .unwrap_or_else(|_| DifficultyProfile::easy())
    }

    fn position(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.profiles.iter().position(|p| p.name.to_lowercase() == wanted)
    }
}

impl Default for DifficultyRegistry {
    fn default() -> Self { Self::with_presets() }
}
