use std::sync::{Arc, Mutex};

use crate::bridge::ClipboardAccess;
use crate::error::ClipSyncError;

/// Native clipboard through `arboard`.
#[cfg(feature = "system-clipboard")]
pub struct SystemClipboard {
    clipboard: arboard::Clipboard,
}

#[cfg(feature = "system-clipboard")]
impl SystemClipboard {
    /// Open the platform clipboard.
    ///
    /// # Errors
    ///
    /// Fails on headless systems with no clipboard service.
    pub fn new() -> Result<Self, ClipSyncError> {
        let clipboard = arboard::Clipboard::new()
            .map_err(|e| ClipSyncError::ClipboardWrite(format!("failed to access clipboard: {e}")))?;
        Ok(Self { clipboard })
    }
}

#[cfg(feature = "system-clipboard")]
impl ClipboardAccess for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipSyncError> {
        self.clipboard
            .set_text(text.to_owned())
            .map_err(|e| ClipSyncError::ClipboardWrite(format!("failed to set text: {e}")))
    }

    fn get_text(&mut self) -> Result<Option<String>, ClipSyncError> {
        match self.clipboard.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(ClipSyncError::ClipboardWrite(format!(
                "failed to read text: {e}"
            ))),
        }
    }
}

/// Process-local clipboard. Clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }

    pub fn set_contents(&self, text: impl Into<String>) {
        if let Ok(mut contents) = self.contents.lock() {
            *contents = Some(text.into());
        }
    }
}

impl ClipboardAccess for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipSyncError> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|_| ClipSyncError::ClipboardWrite("clipboard lock poisoned".into()))?;
        *contents = Some(text.to_owned());
        Ok(())
    }

    fn get_text(&mut self) -> Result<Option<String>, ClipSyncError> {
        Ok(self.contents())
    }
}
