pub mod engine;
pub mod errors;
pub mod events;
pub mod history;
pub mod presenter;
pub mod profiles;
pub mod settings;
pub mod uploader;

pub use engine::{ProfileTaggedFile, UploadEngine};
pub use errors::{AppError, AppResult};
pub use history::UploadedFileRecord;
pub use profiles::{ProfileOption, UploaderProfile};
pub use settings::Preferences;
pub use uploader::{UploadOutcome, UploadTask, UploaderRegistry};
