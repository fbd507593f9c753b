//! Adapter between decoded envelopes and the local platform.
//!
//! Inbound content goes to a [`ClipboardAccess`] (text) or an
//! [`ImageStore`] (images). Outbound content is wrapped into envelopes
//! here before the host hands it to a session.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::codec::{ContentEnvelope, DEFAULT_MAX_IMAGE_BYTES};
use crate::error::ClipSyncError;

mod clipboard;
mod storage;

pub use clipboard::MemoryClipboard;
#[cfg(feature = "system-clipboard")]
pub use clipboard::SystemClipboard;
pub use storage::{DirectoryImageStore, IMAGE_DIR_NAME, MemoryImageStore};

/// The 8-byte signature every PNG file starts with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Local clipboard.
pub trait ClipboardAccess: Send {
    /// Replace the clipboard content with `text`.
    ///
    /// # Errors
    ///
    /// Returns [`ClipSyncError::ClipboardWrite`] if the platform refuses.
    fn set_text(&mut self, text: &str) -> Result<(), ClipSyncError>;

    /// Current clipboard text, `None` when it holds no text.
    fn get_text(&mut self) -> Result<Option<String>, ClipSyncError>;
}

/// Where received images end up.
///
/// Runs on the session driver, so implementations must not block.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist one PNG and return an identifier the host can show.
    ///
    /// # Errors
    ///
    /// Returns [`ClipSyncError::Storage`] if the bytes cannot be written.
    async fn store(&self, png: &[u8]) -> Result<String, ClipSyncError>;
}

/// Routes content between a session and the platform.
pub struct ClipboardBridge {
    clipboard: Mutex<Box<dyn ClipboardAccess>>,
    images: Box<dyn ImageStore>,
    max_image_bytes: usize,
}

impl std::fmt::Debug for ClipboardBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardBridge")
            .field("max_image_bytes", &self.max_image_bytes)
            .finish_non_exhaustive()
    }
}

impl ClipboardBridge {
    pub fn new(clipboard: Box<dyn ClipboardAccess>, images: Box<dyn ImageStore>) -> Self {
        Self {
            clipboard: Mutex::new(clipboard),
            images,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Cap applied by [`capture_outbound_image`](Self::capture_outbound_image).
    pub fn with_max_image_bytes(mut self, max: usize) -> Self {
        self.max_image_bytes = max;
        self
    }

    // ── Inbound ──────────────────────────────────────────────────

    /// Write received text to the clipboard.
    pub fn on_text_received(&self, text: &str) -> Result<(), ClipSyncError> {
        let mut clipboard = self
            .clipboard
            .lock()
            .map_err(|_| ClipSyncError::ClipboardWrite("clipboard lock poisoned".into()))?;
        clipboard.set_text(text).inspect_err(|e| warn!("clipboard write failed: {e}"))?;
        debug!(chars = text.chars().count(), "clipboard updated");
        Ok(())
    }

    /// Persist a received PNG. Returns the store's identifier.
    pub async fn on_image_received(&self, bytes: &[u8]) -> Result<String, ClipSyncError> {
        if !bytes.starts_with(&PNG_SIGNATURE) {
            return Err(ClipSyncError::Storage("payload is not a PNG image".into()));
        }
        let id = self
            .images
            .store(bytes)
            .await
            .inspect_err(|e| warn!("image store failed: {e}"))?;
        debug!(bytes = bytes.len(), id = %id, "image stored");
        Ok(id)
    }

    // ── Outbound ─────────────────────────────────────────────────

    pub fn capture_outbound_text(&self, text: impl Into<String>) -> ContentEnvelope {
        ContentEnvelope::Text(text.into())
    }

    pub fn capture_outbound_image(&self, bytes: Vec<u8>) -> Result<ContentEnvelope, ClipSyncError> {
        if bytes.len() > self.max_image_bytes {
            return Err(ClipSyncError::PayloadTooLarge {
                size: bytes.len(),
                max: self.max_image_bytes,
            });
        }
        Ok(ContentEnvelope::Image(bytes))
    }

    /// Wrap whatever text the local clipboard holds right now.
    pub fn capture_clipboard_text(&self) -> Result<Option<ContentEnvelope>, ClipSyncError> {
        let mut clipboard = self
            .clipboard
            .lock()
            .map_err(|_| ClipSyncError::ClipboardWrite("clipboard lock poisoned".into()))?;
        Ok(clipboard.get_text()?.map(ContentEnvelope::Text))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn png(body: &[u8]) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(body);
        bytes
    }

    struct BrokenClipboard;

    impl ClipboardAccess for BrokenClipboard {
        fn set_text(&mut self, _: &str) -> Result<(), ClipSyncError> {
            Err(ClipSyncError::ClipboardWrite("no display".into()))
        }

        fn get_text(&mut self) -> Result<Option<String>, ClipSyncError> {
            Ok(None)
        }
    }

    #[test]
    fn text_lands_on_clipboard() {
        let clipboard = MemoryClipboard::new();
        let bridge = ClipboardBridge::new(Box::new(clipboard.clone()), Box::new(MemoryImageStore::new()));

        bridge.on_text_received("hello").unwrap();
        assert_eq!(clipboard.contents().as_deref(), Some("hello"));

        bridge.on_text_received("").unwrap();
        assert_eq!(clipboard.contents().as_deref(), Some(""));
    }

    #[test]
    fn clipboard_failure_is_wrapped() {
        let bridge = ClipboardBridge::new(Box::new(BrokenClipboard), Box::new(MemoryImageStore::new()));
        let err = bridge.on_text_received("x").unwrap_err();
        assert!(matches!(err, ClipSyncError::ClipboardWrite(_)));
    }

    #[tokio::test]
    async fn png_is_stored_and_identified() {
        let images = MemoryImageStore::new();
        let bridge = ClipboardBridge::new(Box::new(MemoryClipboard::new()), Box::new(images.clone()));

        let id = bridge.on_image_received(&png(b"IHDR")).await.unwrap();
        assert_eq!(images.get(&id), Some(png(b"IHDR")));
    }

    #[tokio::test]
    async fn non_png_is_rejected() {
        let images = MemoryImageStore::new();
        let bridge = ClipboardBridge::new(Box::new(MemoryClipboard::new()), Box::new(images.clone()));

        let err = bridge.on_image_received(b"GIF89a").await.unwrap_err();
        assert!(matches!(err, ClipSyncError::Storage(_)));
        assert!(images.is_empty());
    }

    #[test]
    fn outbound_image_respects_cap() {
        let bridge = ClipboardBridge::new(Box::new(MemoryClipboard::new()), Box::new(MemoryImageStore::new()))
            .with_max_image_bytes(4);

        assert_eq!(
            bridge.capture_outbound_image(vec![1, 2, 3, 4]).unwrap(),
            ContentEnvelope::Image(vec![1, 2, 3, 4])
        );
        assert!(matches!(
            bridge.capture_outbound_image(vec![0; 5]),
            Err(ClipSyncError::PayloadTooLarge { size: 5, max: 4 })
        ));
        assert_eq!(
            bridge.capture_outbound_text("hi"),
            ContentEnvelope::Text("hi".into())
        );
    }

    #[test]
    fn capture_reads_current_clipboard() {
        let clipboard = MemoryClipboard::new();
        let bridge = ClipboardBridge::new(Box::new(clipboard.clone()), Box::new(MemoryImageStore::new()));
        assert_eq!(bridge.capture_clipboard_text().unwrap(), None);

        clipboard.set_contents("copied");
        assert_eq!(
            bridge.capture_clipboard_text().unwrap(),
            Some(ContentEnvelope::Text("copied".into()))
        );
    }
}
