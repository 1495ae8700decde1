use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No uploader profile configured")]
    NoProfileConfigured,

    #[error("No default uploader profile set")]
    DefaultProfileNotSet,

    #[error("Uploader profile not found: {id}")]
    ProfileNotFound { id: String },

    #[error("Uploader backend not found: {name}")]
    BackendNotFound { name: String },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn profile_not_found(id: &str) -> Self {
        Self::ProfileNotFound { id: id.to_string() }
    }

    pub fn backend_not_found(name: &str) -> Self {
        Self::BackendNotFound {
            name: name.to_string(),
        }
    }

    pub fn upload_failed(reason: impl Into<String>) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }

    /// Terminal errors abort the whole batch before any file is touched.
    /// Everything else is recorded per file and never stops siblings.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppError::NoProfileConfigured
                | AppError::DefaultProfileNotSet
                | AppError::ProfileNotFound { .. }
                | AppError::BackendNotFound { .. }
                | AppError::Validation { .. }
                | AppError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_errors_are_terminal() {
        assert!(AppError::NoProfileConfigured.is_terminal());
        assert!(AppError::DefaultProfileNotSet.is_terminal());
        assert!(AppError::profile_not_found("p1").is_terminal());
        assert!(AppError::backend_not_found("custom").is_terminal());
    }

    #[test]
    fn transport_errors_are_not_terminal() {
        assert!(!AppError::upload_failed("connection reset").is_terminal());
    }

    #[test]
    fn distinct_messages_for_missing_profile_cases() {
        let none = AppError::NoProfileConfigured.to_string();
        let no_default = AppError::DefaultProfileNotSet.to_string();
        let missing = AppError::profile_not_found("gone").to_string();
        assert_ne!(none, no_default);
        assert_ne!(no_default, missing);
        assert!(missing.contains("gone"));
    }
}
