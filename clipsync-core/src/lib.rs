//! # clipsync-core
//!
//! Connection-managed clipboard sync client.
//!
//! This crate contains:
//! - **Address**: `PeerAddress`, strict `ws://<ipv4>:<port>/ws` validation
//! - **Codec**: `ContentCodec` for the `text:` / `image:` wire frames
//! - **State**: `ConnectionState` machine with bounded retry bookkeeping
//! - **Network**: `Connector` / `Link` seam, WebSocket and in-memory transports
//! - **Session**: `SyncSession`, one driver task per connection lifecycle
//! - **Bridge**: `ClipboardBridge` between envelopes and the local clipboard
//! - **Controller**: `SessionController`, the host-facing facade
//! - **Error**: `ClipSyncError`, a typed `thiserror` hierarchy

pub mod address;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod network;
pub mod session;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use address::{PeerAddress, is_valid_address};
pub use bridge::{ClipboardAccess, ClipboardBridge, DirectoryImageStore, ImageStore, MemoryClipboard, MemoryImageStore};
#[cfg(feature = "system-clipboard")]
pub use bridge::SystemClipboard;
pub use codec::{ContentCodec, ContentEnvelope, ContentKind};
pub use config::SessionConfig;
pub use controller::SessionController;
pub use error::{ClipSyncError, DecodeError, ErrorKind};
pub use event::SessionEvent;
pub use network::{Connector, Link, MemoryConnector, MemoryPeer, WsConnector};
pub use session::SyncSession;
pub use state::{ConnectionPhase, ConnectionState, Effect, RetryState, SessionStatus};
