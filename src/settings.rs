use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default file the difficulty preference is stored in.
pub const DEFAULT_SETTINGS_PATH: &str = "voicestars-settings.toml";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot encode settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Where the chosen difficulty survives between sessions.
pub trait SettingsStore {
    /// Persisted difficulty name, if any.
    fn load(&self) -> Option<String>;
    fn save(&mut self, difficulty: &str) -> Result<(), SettingsError>;
}

/// On-disk layout of the settings file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSettings {
    #[serde(default)]
    difficulty: Option<String>,
}

/// Settings kept in a small TOML file.
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoredSettings, SettingsError> {
        let text = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&text)?)
    }
}

impl Default for TomlSettingsStore {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_PATH)
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&self) -> Option<String> {
        match self.read() {
            Ok(stored) => stored.difficulty,
            Err(SettingsError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                log::warn!("ignoring settings at {}: {err}", self.path.display());
                None
            }
        }
    }

    fn save(&mut self, difficulty: &str) -> Result<(), SettingsError> {
        let stored = StoredSettings {
            difficulty: Some(difficulty.to_string()),
        };
        let text = toml::to_string(&stored)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, text)?;
        log::debug!("saved difficulty '{difficulty}' to {}", self.path.display());
        Ok(())
    }
}

/// Settings that live only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    difficulty: Option<String>,
}

impl MemorySettingsStore {
    pub fn with_difficulty(name: &str) -> Self {
        Self {
            difficulty: Some(name.to_string()),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Option<String> {
        self.difficulty.clone()
    }

    fn save(&mut self, difficulty: &str) -> Result<(), SettingsError> {
        self.difficulty = Some(difficulty.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "voicestars-settings-{tag}-{}.toml",
            std::process::id()
        ))
    }

    #[test]
    fn toml_store_round_trips_difficulty() {
        let path = scratch_path("roundtrip");
        let mut store = TomlSettingsStore::new(&path);
        store.save("hard").unwrap();
        assert_eq!(TomlSettingsStore::new(&path).load().as_deref(), Some("hard"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_loads_nothing() {
        let store = TomlSettingsStore::new(scratch_path("missing"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn malformed_file_loads_nothing() {
        let path = scratch_path("malformed");
        fs::write(&path, "difficulty = [").unwrap();
        assert_eq!(TomlSettingsStore::new(&path).load(), None);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn memory_store_keeps_last_save() {
        let mut store = MemorySettingsStore::default();
        assert_eq!(store.load(), None);
        store.save("medium").unwrap();
        assert_eq!(store.load().as_deref(), Some("medium"));
    }
}
