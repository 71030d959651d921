use crate::error::ClientResult;
use shared::models::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.json";

/// Console settings persisted next to the local config, last write wins
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            path: base_path.into().join(SETTINGS_FILE),
        }
    }

    /// Defaults when nothing was saved yet; unknown keys are ignored
    pub fn load(&self) -> ClientResult<AppSettings> {
        if !self.path.exists() {
            return Ok(AppSettings::default());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, settings: &AppSettings) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
