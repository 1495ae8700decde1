// Uploader backends and the capability contract the engine drives them through.

use async_trait::async_trait;
use std::path::Path;

use crate::errors::AppResult;
use crate::profiles::ProfileOption;

pub mod custom_http;
pub mod registry;

pub use custom_http::CustomHttpUploader;
pub use registry::UploaderRegistry;

/// One file handed to a backend.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub local_path: String,
    /// Collision-free storage name generated by the engine, extension kept.
    pub remote_name: String,
    pub target_directory: Option<String>,
    /// File-manager-scoped upload; backends may store these differently.
    pub managed_mode: bool,
}

/// Backend-reported result for one file, before the engine enriches it into
/// a history record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub success: bool,
    pub url: Option<String>,
    pub error_message: Option<String>,
}

impl UploadOutcome {
    pub fn success(url: String) -> Self {
        Self {
            success: true,
            url: Some(url),
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            error_message: Some(message.into()),
        }
    }
}

/// A remote file as reported by a file-manager-capable backend.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RemoteFile {
    pub name: String,
    pub url: Option<String>,
    pub size: Option<i64>,
    pub is_directory: bool,
}

/// Required operation group every backend implements.
///
/// `configure` is applied to a freshly created instance immediately before
/// use; instances are never shared between concurrently running batches.
/// `upload` must swallow transport failures into a failed outcome rather
/// than returning an error.
#[async_trait]
pub trait UploaderCapability: Send + Sync {
    fn name(&self) -> &'static str;

    fn configure(&mut self, options: &[ProfileOption]) -> AppResult<()>;

    async fn upload(&self, task: &UploadTask) -> UploadOutcome;

    /// Optional operation group. Backends that cannot browse remote storage
    /// return `None`; callers probe before invoking.
    fn file_manager(&self) -> Option<&dyn FileManagerCapability> {
        None
    }
}

/// Optional file-management operation group.
#[async_trait]
pub trait FileManagerCapability: Send + Sync {
    async fn list_files(&self, directory: Option<&str>) -> AppResult<Vec<RemoteFile>>;
    async fn delete_files(&self, names: &[String]) -> AppResult<bool>;
    async fn create_directory(&self, path: &str) -> AppResult<bool>;
}

/// Collapse a profile's ordered option list into name → value pairs.
/// Later duplicates win.
pub fn collapse_options(options: &[ProfileOption]) -> std::collections::HashMap<String, String> {
    options
        .iter()
        .map(|o| (o.name.clone(), o.value.clone()))
        .collect()
}

/// MIME type derived from the file path, `application/octet-stream` when the
/// extension is unknown.
pub fn mime_type_for(path: &str) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Record id and storage name are generated independently; both are
/// collision-free for practical purposes.
pub fn generate_file_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn generate_storage_name(local_path: &str) -> String {
    let stem = uuid::Uuid::new_v4().simple().to_string();
    match Path::new(local_path).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext),
        _ => stem,
    }
}
