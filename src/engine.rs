// Upload orchestration: profile resolution, concurrent per-file execution,
// aggregation and the side-effect pipeline (history, UI events, presentation).

use futures_util::future::join_all;
use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::events::{NotificationSurface, UiTransport};
use crate::history::{HistorySink, UploadedFileRecord};
use crate::presenter::ResultPresenter;
use crate::profiles::{ProfileStore, UploaderProfile};
use crate::settings::SettingsStore;
use crate::uploader::{
    generate_file_id, generate_storage_name, mime_type_for, UploadTask, UploaderCapability,
    UploaderRegistry,
};

/// One item of an `upload_by_different_profiles` call.
#[derive(Debug, Clone)]
pub struct ProfileTaggedFile {
    pub profile_id: String,
    pub path: String,
}

pub struct UploadEngine {
    profiles: Arc<dyn ProfileStore>,
    registry: Arc<UploaderRegistry>,
    history: Arc<dyn HistorySink>,
    transport: Arc<dyn UiTransport>,
    notifier: Arc<dyn NotificationSurface>,
    settings: Arc<dyn SettingsStore>,
    presenter: ResultPresenter,
}

impl UploadEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        registry: Arc<UploaderRegistry>,
        history: Arc<dyn HistorySink>,
        transport: Arc<dyn UiTransport>,
        notifier: Arc<dyn NotificationSurface>,
        settings: Arc<dyn SettingsStore>,
        presenter: ResultPresenter,
    ) -> Self {
        Self {
            profiles,
            registry,
            history,
            transport,
            notifier,
            settings,
            presenter,
        }
    }

    /// Upload a batch of local files through the profile's backend.
    ///
    /// All results are delivered through side-effect channels: the history
    /// sink, the UI transport and (for ad-hoc uploads) the presenter.
    /// Resolution failures surface as a single notification and leave
    /// history untouched.
    pub async fn upload(
        &self,
        files: Vec<String>,
        profile_id: Option<&str>,
        target_directory: Option<&str>,
        managed_mode: bool,
    ) {
        let (profile, backend) = match self.resolve_backend(profile_id) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.report_resolution_failure(&e);
                return;
            }
        };

        log::info!(
            "Uploading {} files via profile '{}' ({})",
            files.len(),
            profile.name,
            profile.uploader_name
        );

        // Fan out over all files at once, join before any reporting. One
        // file's failure never aborts its siblings.
        let uploads = files.iter().map(|path| {
            let backend = &backend;
            let profile_id = profile.id.clone();
            let target_directory = target_directory.map(str::to_string);
            async move {
                upload_one(backend.as_ref(), path, &profile_id, target_directory, managed_mode)
                    .await
            }
        });
        let results = join_all(uploads).await;

        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for (succeeded, record) in results {
            if succeeded {
                successes.push(record);
            } else {
                failures.push(record);
            }
        }

        log::info!(
            "Batch finished: {} succeeded, {} failed",
            successes.len(),
            failures.len()
        );

        // Failures first so merged history surfaces them ahead of the
        // successes appended in the same call.
        let mut records: Vec<UploadedFileRecord> = Vec::with_capacity(files.len());
        records.extend(failures.iter().cloned());
        records.extend(successes.iter().cloned());

        match self.history.append(&records).await {
            Ok(full_history) => {
                self.transport.push(
                    "uploaded-files-get-reply",
                    serde_json::json!(full_history),
                );
            }
            Err(e) => log::error!("Failed to append upload history: {}", e),
        }

        if managed_mode {
            // File-manager uploads refresh their own view and stay silent
            // on the clipboard/summary axis.
            self.transport.push(
                "file-upload-reply",
                serde_json::json!({
                    "profileId": profile.id,
                    "successes": successes,
                    "failures": failures,
                }),
            );
            return;
        }

        let prefs = self.settings.preferences();
        if files.len() > 1 {
            self.presenter
                .present_batch(&prefs, successes.len(), failures.len());
        } else if let Some(record) = records.first() {
            self.presenter.present_single(&prefs, record);
        }
    }

    /// Group items by profile id (first-seen order) and run one independent
    /// upload per distinct id. Group accounting never mixes.
    pub async fn upload_by_different_profiles(&self, items: Vec<ProfileTaggedFile>) {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for item in items {
            match groups.iter_mut().find(|(id, _)| *id == item.profile_id) {
                Some((_, files)) => files.push(item.path),
                None => groups.push((item.profile_id, vec![item.path])),
            }
        }

        log::info!("Uploading {} profile-tagged groups", groups.len());

        let batches = groups
            .iter()
            .map(|(profile_id, files)| {
                self.upload(files.clone(), Some(profile_id.as_str()), None, false)
            });
        join_all(batches).await;
    }

    /// List remote files for a profile's backend. Backends without
    /// file-management support yield an empty listing, not an error.
    pub async fn list_files(&self, profile_id: &str, directory: Option<&str>) {
        let files = match self.resolve_backend(Some(profile_id)) {
            Ok((_, backend)) => match backend.file_manager() {
                Some(manager) => match manager.list_files(directory).await {
                    Ok(files) => files,
                    Err(e) => {
                        log::error!("Listing files failed for profile {}: {}", profile_id, e);
                        Vec::new()
                    }
                },
                None => Vec::new(),
            },
            Err(e) => {
                self.report_resolution_failure(&e);
                Vec::new()
            }
        };

        self.transport
            .push("file-list-get-reply", serde_json::json!(files));
    }

    pub async fn delete_files(&self, profile_id: &str, names: Vec<String>) {
        let success = match self.resolve_backend(Some(profile_id)) {
            Ok((_, backend)) => match backend.file_manager() {
                Some(manager) => match manager.delete_files(&names).await {
                    Ok(done) => done,
                    Err(e) => {
                        log::error!("Deleting files failed for profile {}: {}", profile_id, e);
                        false
                    }
                },
                None => false,
            },
            Err(e) => {
                self.report_resolution_failure(&e);
                false
            }
        };

        self.transport
            .push("file-delete-reply", serde_json::json!({ "success": success }));
    }

    pub async fn create_directory(&self, profile_id: &str, path: &str) {
        let success = match self.resolve_backend(Some(profile_id)) {
            Ok((_, backend)) => match backend.file_manager() {
                Some(manager) => match manager.create_directory(path).await {
                    Ok(done) => done,
                    Err(e) => {
                        log::error!(
                            "Creating directory failed for profile {}: {}",
                            profile_id,
                            e
                        );
                        false
                    }
                },
                None => false,
            },
            Err(e) => {
                self.report_resolution_failure(&e);
                false
            }
        };

        self.transport.push(
            "directory-create-reply",
            serde_json::json!({ "success": success }),
        );
    }

    /// Resolve profile and backend, then configure the fresh instance
    /// before anything can suspend. Each call owns its own instance.
    fn resolve_backend(
        &self,
        profile_id: Option<&str>,
    ) -> AppResult<(UploaderProfile, Arc<dyn UploaderCapability>)> {
        let profile = self.profiles.resolve(profile_id)?;

        let mut backend = self
            .registry
            .create(&profile.uploader_name)
            .ok_or_else(|| AppError::backend_not_found(&profile.uploader_name))?;
        backend.configure(&profile.options)?;

        Ok((profile, Arc::from(backend)))
    }

    fn report_resolution_failure(&self, error: &AppError) {
        log::error!("Upload aborted before any file was touched: {}", error);
        self.notifier
            .notify("Upload failed", &error.to_string(), false);
    }
}

async fn upload_one(
    backend: &dyn UploaderCapability,
    path: &str,
    profile_id: &str,
    target_directory: Option<String>,
    managed_mode: bool,
) -> (bool, UploadedFileRecord) {
    let mime_type = mime_type_for(path);
    let id = generate_file_id();
    let remote_name = generate_storage_name(path);
    let date = chrono::Utc::now().timestamp_millis();
    let size = tokio::fs::metadata(path).await.ok().map(|m| m.len() as i64);

    let task = UploadTask {
        local_path: path.to_string(),
        remote_name: remote_name.clone(),
        target_directory,
        managed_mode,
    };
    let outcome = backend.upload(&task).await;

    if !outcome.success {
        log::warn!(
            "Upload failed for {}: {}",
            path,
            outcome.error_message.as_deref().unwrap_or("no detail")
        );
    }

    let record = UploadedFileRecord {
        id,
        name: remote_name,
        mime_type,
        profile_id: profile_id.to_string(),
        path: path.to_string(),
        size,
        date,
        url: outcome.url,
        error_message: if outcome.success {
            None
        } else {
            Some(
                outcome
                    .error_message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Upload failed".to_string()),
            )
        },
    };

    (outcome.success, record)
}
