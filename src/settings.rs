use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};

/// Presentation preferences applied after an ad-hoc upload finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// "URL", "HTML" or "Markdown". Anything else falls back to the raw URL.
    pub url_type: String,
    pub auto_copy: bool,
    /// Snapshot the clipboard before copying and restore it shortly after.
    pub auto_recover: bool,
    pub sound: bool,
    pub show_notification: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            url_type: "URL".to_string(),
            auto_copy: true,
            auto_recover: false,
            sound: true,
            show_notification: true,
        }
    }
}

pub trait SettingsStore: Send + Sync {
    fn preferences(&self) -> Preferences;
}

/// Preferences persisted as pretty JSON under the user config directory,
/// with a `.bak` copy kept from the previous save.
pub struct JsonSettings {
    path: PathBuf,
    current: std::sync::Mutex<Preferences>,
}

fn default_settings_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join("droplift");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("settings.json"))
}

impl JsonSettings {
    pub fn open_default() -> AppResult<Self> {
        Self::open(default_settings_path()?)
    }

    pub fn open(path: PathBuf) -> AppResult<Self> {
        let current = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Failed to parse settings file: {}. Using defaults.", e);
                Preferences::default()
            })
        } else {
            Preferences::default()
        };

        validate_preferences(&current)?;

        Ok(Self {
            path,
            current: std::sync::Mutex::new(current),
        })
    }

    pub fn save(&self, prefs: Preferences) -> AppResult<()> {
        validate_preferences(&prefs)?;

        if self.path.exists() {
            let backup_path = self.path.with_extension("json.bak");
            if let Err(e) = fs::copy(&self.path, &backup_path) {
                log::warn!("Failed to create settings backup: {}", e);
            }
        }

        let raw = serde_json::to_string_pretty(&prefs)?;
        fs::write(&self.path, raw)?;

        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = prefs;
        log::info!("Settings saved successfully");
        Ok(())
    }
}

impl SettingsStore for JsonSettings {
    fn preferences(&self) -> Preferences {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

pub fn validate_preferences(prefs: &Preferences) -> AppResult<()> {
    if prefs.url_type.is_empty() {
        return Err(AppError::validation("url_type", "Must not be empty"));
    }
    // Unknown url_type values are tolerated at format time (raw URL), but a
    // known value has to match exactly, including case.
    let known = ["URL", "HTML", "Markdown"];
    if !known.contains(&prefs.url_type.as_str())
        && known
            .iter()
            .any(|k| k.eq_ignore_ascii_case(&prefs.url_type))
    {
        return Err(AppError::validation(
            "url_type",
            "Must be 'URL', 'HTML' or 'Markdown' (case-sensitive)",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        validate_preferences(&Preferences::default()).unwrap();
    }

    #[test]
    fn miscased_known_url_type_is_rejected() {
        let prefs = Preferences {
            url_type: "markdown".to_string(),
            ..Preferences::default()
        };
        assert!(validate_preferences(&prefs).is_err());
    }

    #[test]
    fn unknown_url_type_is_tolerated() {
        let prefs = Preferences {
            url_type: "BBCode".to_string(),
            ..Preferences::default()
        };
        validate_preferences(&prefs).unwrap();
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = std::env::temp_dir().join(format!("droplift-settings-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");

        let settings = JsonSettings::open(path.clone()).unwrap();
        let mut prefs = Preferences::default();
        prefs.url_type = "Markdown".to_string();
        prefs.auto_recover = true;
        settings.save(prefs).unwrap();

        let reopened = JsonSettings::open(path).unwrap();
        let loaded = reopened.preferences();
        assert_eq!(loaded.url_type, "Markdown");
        assert!(loaded.auto_recover);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
