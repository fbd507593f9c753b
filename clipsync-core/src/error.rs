//! Domain-specific error types for clipboard sync.
//!
//! All fallible operations return `Result<T, ClipSyncError>`.
//! Every error is typed and recoverable; invalid input never panics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The canonical error type for a sync session.
#[derive(Debug, Error)]
pub enum ClipSyncError {
    // ── Command Errors ───────────────────────────────────────────
    /// The peer address does not match `ws://<ipv4>:<port>/ws`.
    #[error("invalid peer address: {0:?}")]
    InvalidAddress(String),

    /// A send (or pause/resume) was issued while no connection is up.
    #[error("not connected to peer")]
    NotConnected,

    /// A send was issued while the session is paused.
    #[error("sync is paused")]
    Paused,

    /// An outbound image exceeds the configured cap.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// A single connect attempt failed. Transient, feeds the retry policy.
    #[error("connect failed: {0}")]
    ConnectFailure(String),

    /// Every connect attempt failed; the session is now `Failed`.
    #[error("gave up after {attempts} connect attempts")]
    RetryExhausted { attempts: u32 },

    /// The socket reported an error after the connection was established.
    #[error("transport error: {0}")]
    Transport(String),

    /// The TCP/IO layer reported an error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The session's driver task is gone.
    #[error("channel closed")]
    ChannelClosed,

    /// A trigger arrived in a phase that does not accept it.
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),

    // ── Frame Errors ─────────────────────────────────────────────
    /// An inbound frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    // ── Collaborator Errors ──────────────────────────────────────
    /// The local clipboard refused the write.
    #[error("clipboard write failed: {0}")]
    ClipboardWrite(String),

    /// A received image could not be persisted.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ClipSyncError {
    /// Coarse category surfaced to the host through
    /// [`SessionEvent::Error`](crate::event::SessionEvent::Error).
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::Paused => ErrorKind::Paused,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::ConnectFailure(_) => ErrorKind::ConnectFailure,
            Self::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            Self::Transport(_) | Self::Io(_) | Self::ChannelClosed => ErrorKind::Transport,
            Self::InvalidTransition(_) => ErrorKind::InvalidState,
            Self::Decode(_) => ErrorKind::Decode,
            Self::ClipboardWrite(_) => ErrorKind::ClipboardWrite,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

// ── DecodeError ───────────────────────────────────────────────────

/// Why an inbound wire frame was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The frame does not start with `text:` or `image:`.
    #[error("unknown content type")]
    UnknownContentType,

    /// The `image:` body is not valid base64.
    #[error("invalid image encoding: {0}")]
    InvalidEncoding(String),

    /// The `image:` body would decode to more bytes than allowed.
    #[error("image too large: ~{size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

// ── ErrorKind ─────────────────────────────────────────────────────

/// Host-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidAddress,
    NotConnected,
    Paused,
    PayloadTooLarge,
    ConnectFailure,
    RetryExhausted,
    Transport,
    InvalidState,
    Decode,
    ClipboardWrite,
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidAddress => "invalid-address",
            Self::NotConnected => "not-connected",
            Self::Paused => "paused",
            Self::PayloadTooLarge => "payload-too-large",
            Self::ConnectFailure => "connect-failure",
            Self::RetryExhausted => "retry-exhausted",
            Self::Transport => "transport",
            Self::InvalidState => "invalid-state",
            Self::Decode => "decode",
            Self::ClipboardWrite => "clipboard-write",
            Self::Storage => "storage",
        };
        f.write_str(name)
    }
}

// ── Convenient From implementations ──────────────────────────────

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ClipSyncError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ClipSyncError::ChannelClosed
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClipSyncError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClipSyncError::Transport(e.to_string())
    }
}
