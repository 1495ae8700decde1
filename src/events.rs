//! Outbound collaborator seams.
//!
//! The engine never talks to a window, a desktop notifier or the system
//! clipboard directly. It pushes named events and titled messages through
//! these traits; hosts plug in whatever transport they have.

use tokio::sync::mpsc;

use crate::errors::{AppError, AppResult};

/// Fire-and-forget push of named events carrying a JSON payload. No
/// acknowledgement is expected and delivery failures are non-critical.
pub trait UiTransport: Send + Sync {
    fn push(&self, event: &str, payload: serde_json::Value);
}

/// Shows a titled message to the user. `silent` suppresses any sound the
/// surface would otherwise play.
pub trait NotificationSurface: Send + Sync {
    fn notify(&self, title: &str, body: &str, silent: bool);
}

/// System clipboard read/write. `Send + Sync` because the presenter restores
/// snapshots from a spawned task.
pub trait ClipboardAccess: Send + Sync {
    fn read_text(&self) -> AppResult<String>;
    fn write_text(&self, text: &str) -> AppResult<()>;
}

#[derive(Debug, Clone)]
pub struct UiEvent {
    pub name: String,
    pub payload: serde_json::Value,
}

/// Transport backed by an unbounded tokio channel. The host side holds the
/// receiver and forwards events to its actual UI layer.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl UiTransport for ChannelTransport {
    fn push(&self, event: &str, payload: serde_json::Value) {
        let sent = self.tx.send(UiEvent {
            name: event.to_string(),
            payload,
        });
        if sent.is_err() {
            log::warn!("UI transport receiver gone, dropping event '{}'", event);
        }
    }
}

/// Headless transport for the CLI: events only hit the log.
pub struct LogTransport;

impl UiTransport for LogTransport {
    fn push(&self, event: &str, payload: serde_json::Value) {
        log::debug!("UI event '{}': {}", event, payload);
    }
}

/// Headless notification surface for the CLI.
pub struct LogNotifier;

impl NotificationSurface for LogNotifier {
    fn notify(&self, title: &str, body: &str, _silent: bool) {
        log::info!("{}: {}", title, body);
    }
}

/// In-process clipboard. Stands in for the system clipboard in headless
/// environments and in tests.
#[derive(Default)]
pub struct MemoryClipboard {
    text: std::sync::Mutex<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardAccess for MemoryClipboard {
    fn read_text(&self) -> AppResult<String> {
        self.text
            .lock()
            .map(|t| t.clone())
            .map_err(|e| AppError::Clipboard(e.to_string()))
    }

    fn write_text(&self, text: &str) -> AppResult<()> {
        let mut slot = self
            .text
            .lock()
            .map_err(|e| AppError::Clipboard(e.to_string()))?;
        *slot = text.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_transport_delivers_events_in_order() {
        let (transport, mut rx) = ChannelTransport::new();
        transport.push("file-upload-reply", serde_json::json!({"ok": true}));
        transport.push("uploaded-files-get-reply", serde_json::json!([]));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.name, "file-upload-reply");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.name, "uploaded-files-get-reply");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn memory_clipboard_roundtrip() {
        let clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.read_text().unwrap(), "");
        clipboard.write_text("hello").unwrap();
        assert_eq!(clipboard.read_text().unwrap(), "hello");
    }
}
