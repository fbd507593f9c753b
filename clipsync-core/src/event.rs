//! Notifications a session pushes to its host.

use serde::{Deserialize, Serialize};

use crate::codec::ContentKind;
use crate::error::{ClipSyncError, ErrorKind};
use crate::state::SessionStatus;

/// Host-facing notification.
///
/// Serialized with an `event` tag so a host can stream them as JSON lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The status changed. Never sent twice in a row with the same value.
    StatusChanged { status: SessionStatus },

    /// Content from the peer reached the clipboard or image store.
    ///
    /// `detail` is the text itself, or the store's identifier for images.
    ContentReceived { kind: ContentKind, detail: String },

    /// Something went wrong. The session keeps running unless a
    /// `StatusChanged` says otherwise.
    Error { kind: ErrorKind, message: String },
}

impl SessionEvent {
    pub fn status(status: SessionStatus) -> Self {
        Self::StatusChanged { status }
    }

    pub fn error(error: &ClipSyncError) -> Self {
        Self::Error {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StatusChanged { status } => write!(f, "status: {status}"),
            Self::ContentReceived { kind, detail } => write!(f, "received {kind}: {detail}"),
            Self::Error { kind, message } => write!(f, "error [{kind}]: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_event_carries_kind_and_message() {
        let event = SessionEvent::error(&ClipSyncError::RetryExhausted { attempts: 3 });
        match event {
            SessionEvent::Error { kind, message } => {
                assert_eq!(kind, ErrorKind::RetryExhausted);
                assert!(message.contains('3'));
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn display_is_one_line() {
        let event = SessionEvent::status(SessionStatus::Paused);
        assert_eq!(event.to_string(), "status: Paused");
        let event = SessionEvent::ContentReceived {
            kind: ContentKind::Image,
            detail: "clipsync-1.png".into(),
        };
        assert_eq!(event.to_string(), "received image: clipsync-1.png");
    }
}
