use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::errors::{AppError, AppResult};

/// One backend configuration field, e.g. `{name: "url", value: "https://..."}`.
/// Order is preserved so later duplicates win when collapsed into a map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderProfile {
    pub id: String,
    pub name: String,
    pub uploader_name: String,
    pub options: Vec<ProfileOption>,
    pub is_default: bool,
}

impl UploaderProfile {
    pub fn new(name: &str, uploader_name: &str, options: Vec<ProfileOption>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            uploader_name: uploader_name.to_string(),
            options,
            is_default: false,
        }
    }
}

/// Read side of profile storage. Profile CRUD lives with the store owner;
/// the upload engine only ever resolves.
pub trait ProfileStore: Send + Sync {
    fn get_all(&self) -> Vec<UploaderProfile>;
    fn get_default_id(&self) -> Option<String>;

    /// Resolve the effective profile for an upload call. An empty explicit id
    /// counts as "use the default".
    fn resolve(&self, explicit_id: Option<&str>) -> AppResult<UploaderProfile> {
        let profiles = self.get_all();
        if profiles.is_empty() {
            return Err(AppError::NoProfileConfigured);
        }

        let effective_id = match explicit_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self
                .get_default_id()
                .filter(|id| !id.is_empty())
                .ok_or(AppError::DefaultProfileNotSet)?,
        };

        profiles
            .into_iter()
            .find(|p| p.id == effective_id)
            .ok_or_else(|| AppError::profile_not_found(&effective_id))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileFile {
    profiles: Vec<UploaderProfile>,
    default_profile_id: Option<String>,
}

/// Profiles persisted as pretty JSON under the user config directory.
pub struct JsonProfileStore {
    path: PathBuf,
    state: Mutex<ProfileFile>,
}

fn default_profile_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join("droplift");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("profiles.json"))
}

impl JsonProfileStore {
    pub fn open_default() -> AppResult<Self> {
        Self::open(default_profile_path()?)
    }

    pub fn open(path: PathBuf) -> AppResult<Self> {
        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Failed to parse profile file: {}. Starting empty.", e);
                ProfileFile::default()
            })
        } else {
            ProfileFile::default()
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn add(&self, profile: UploaderProfile) -> AppResult<()> {
        validate_profile(&profile)?;
        let mut state = self.lock();
        if profile.is_default {
            state.default_profile_id = Some(profile.id.clone());
        }
        state.profiles.push(profile);
        self.persist(&state)
    }

    pub fn update(&self, profile: UploaderProfile) -> AppResult<()> {
        validate_profile(&profile)?;
        let mut state = self.lock();
        let slot = state
            .profiles
            .iter_mut()
            .find(|p| p.id == profile.id)
            .ok_or_else(|| AppError::profile_not_found(&profile.id))?;
        *slot = profile;
        self.persist(&state)
    }

    pub fn remove(&self, id: &str) -> AppResult<()> {
        let mut state = self.lock();
        let before = state.profiles.len();
        state.profiles.retain(|p| p.id != id);
        if state.profiles.len() == before {
            return Err(AppError::profile_not_found(id));
        }
        if state.default_profile_id.as_deref() == Some(id) {
            state.default_profile_id = None;
        }
        self.persist(&state)
    }

    pub fn set_default(&self, id: &str) -> AppResult<()> {
        let mut state = self.lock();
        if !state.profiles.iter().any(|p| p.id == id) {
            return Err(AppError::profile_not_found(id));
        }
        for p in state.profiles.iter_mut() {
            p.is_default = p.id == id;
        }
        state.default_profile_id = Some(id.to_string());
        self.persist(&state)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProfileFile> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, state: &ProfileFile) -> AppResult<()> {
        if self.path.exists() {
            let backup_path = self.path.with_extension("json.bak");
            if let Err(e) = fs::copy(&self.path, &backup_path) {
                log::warn!("Failed to create profile backup: {}", e);
            }
        }

        let raw = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl ProfileStore for JsonProfileStore {
    fn get_all(&self) -> Vec<UploaderProfile> {
        self.lock().profiles.clone()
    }

    fn get_default_id(&self) -> Option<String> {
        self.lock().default_profile_id.clone()
    }
}

fn validate_profile(profile: &UploaderProfile) -> AppResult<()> {
    if profile.id.is_empty() {
        return Err(AppError::validation("id", "Profile id cannot be empty"));
    }
    if profile.name.is_empty() {
        return Err(AppError::validation("name", "Profile name cannot be empty"));
    }
    if profile.uploader_name.is_empty() {
        return Err(AppError::validation(
            "uploader_name",
            "Profile must name an uploader backend",
        ));
    }
    Ok(())
}
