use std::sync::Arc;
use tokio::time::{sleep, Duration};

use crate::events::{ClipboardAccess, NotificationSurface};
use crate::history::UploadedFileRecord;
use crate::settings::Preferences;

/// How long a snapshotted clipboard survives before being put back.
const CLIPBOARD_RESTORE_DELAY: Duration = Duration::from_secs(5);

/// Turns an aggregated batch result into user-facing notifications and
/// clipboard content. Managed-mode uploads never reach this type.
pub struct ResultPresenter {
    notifier: Arc<dyn NotificationSurface>,
    clipboard: Arc<dyn ClipboardAccess>,
    restore_delay: Duration,
}

impl ResultPresenter {
    pub fn new(notifier: Arc<dyn NotificationSurface>, clipboard: Arc<dyn ClipboardAccess>) -> Self {
        Self {
            notifier,
            clipboard,
            restore_delay: CLIPBOARD_RESTORE_DELAY,
        }
    }

    /// Shorter restore delay for tests.
    pub fn with_restore_delay(mut self, delay: Duration) -> Self {
        self.restore_delay = delay;
        self
    }

    /// Exactly one summary notification per multi-file batch.
    pub fn present_batch(&self, prefs: &Preferences, success_count: usize, fail_count: usize) {
        let (title, body) = if fail_count == 0 {
            (
                "Upload complete",
                format!("{} files uploaded", success_count),
            )
        } else if success_count == 0 {
            ("Upload failed", format!("{} files failed", fail_count))
        } else {
            (
                "Upload finished",
                format!("{} succeeded, {} failed", success_count, fail_count),
            )
        };
        self.notify(prefs, title, &body);
    }

    pub fn present_single(&self, prefs: &Preferences, record: &UploadedFileRecord) {
        match record.url.as_deref() {
            Some(url) if record.is_success() => self.present_single_success(prefs, url),
            _ => {
                let message = record
                    .error_message
                    .as_deref()
                    .filter(|m| !m.is_empty())
                    .unwrap_or("Upload failed for an unknown reason");
                self.notify(prefs, "Upload failed", message);
            }
        }
    }

    fn present_single_success(&self, prefs: &Preferences, url: &str) {
        let link = format_link(url, &prefs.url_type);

        if !prefs.auto_copy {
            self.notify(prefs, "Upload complete", &link);
            return;
        }

        let snapshot = if prefs.auto_recover {
            match self.clipboard.read_text() {
                Ok(text) => Some(text),
                Err(e) => {
                    log::warn!("Could not snapshot clipboard before copy: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if let Err(e) = self.clipboard.write_text(&link) {
            log::error!("Failed to copy upload link: {}", e);
            self.notify(prefs, "Upload complete", &link);
            return;
        }
        self.notify(prefs, "Upload complete", "The link has been copied");

        if let Some(snapshot) = snapshot {
            self.schedule_restore(prefs, snapshot);
        }
    }

    fn schedule_restore(&self, prefs: &Preferences, snapshot: String) {
        let clipboard = Arc::clone(&self.clipboard);
        let notifier = Arc::clone(&self.notifier);
        let prefs = prefs.clone();
        let delay = self.restore_delay;

        tokio::spawn(async move {
            sleep(delay).await;
            match clipboard.write_text(&snapshot) {
                Ok(()) => {
                    if prefs.show_notification {
                        notifier.notify(
                            "Clipboard restored",
                            "Previous clipboard content is back",
                            !prefs.sound,
                        );
                    }
                }
                Err(e) => log::warn!("Failed to restore clipboard: {}", e),
            }
        });
    }

    fn notify(&self, prefs: &Preferences, title: &str, body: &str) {
        if prefs.show_notification {
            self.notifier.notify(title, body, !prefs.sound);
        }
    }
}

/// Format a result URL per the preferred link style. Unrecognized styles
/// fall back to the raw URL.
pub fn format_link(url: &str, url_type: &str) -> String {
    match url_type {
        "HTML" => format!(r#"<img src="{}" alt="{}" />"#, url, url),
        "Markdown" => format!("![{}]({})", url, url),
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_link_matches_the_expected_shape() {
        assert_eq!(
            format_link("https://x/y.png", "Markdown"),
            "![https://x/y.png](https://x/y.png)"
        );
    }

    #[test]
    fn html_link_is_an_img_tag() {
        assert_eq!(
            format_link("https://x/y.png", "HTML"),
            r#"<img src="https://x/y.png" alt="https://x/y.png" />"#
        );
    }

    #[test]
    fn url_and_unknown_types_stay_raw() {
        assert_eq!(format_link("https://x/y.png", "URL"), "https://x/y.png");
        assert_eq!(format_link("https://x/y.png", "BBCode"), "https://x/y.png");
    }
}
