//! The socket seam.
//!
//! A [`Connector`] opens [`Link`]s to a peer. The session driver is the
//! only code that ever holds a `Link`; everything above it sees decoded
//! envelopes.

use async_trait::async_trait;

use crate::address::PeerAddress;
use crate::error::ClipSyncError;

pub mod memory;
pub mod websocket;

pub use memory::{MemoryConnector, MemoryPeer};
pub use websocket::{WsConnector, WsLink};

/// Close reason sent with the normal-closure code on `stop()`.
pub const CLOSE_REASON: &str = "Service Stopped";

/// Opens connections to a peer.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Link: Link;

    /// One connect attempt. Retrying is the caller's business.
    async fn connect(&self, peer: &PeerAddress) -> Result<Self::Link, ClipSyncError>;
}

/// One open, full-duplex text connection.
#[async_trait]
pub trait Link: Send + 'static {
    /// Write one frame.
    async fn send_frame(&mut self, frame: String) -> Result<(), ClipSyncError>;

    /// Next inbound frame. `None` once the peer has closed the socket.
    ///
    /// A `ClipSyncError::Decode` item is a bad frame on a healthy socket;
    /// any other error means the socket is gone.
    async fn next_frame(&mut self) -> Option<Result<String, ClipSyncError>>;

    /// Close with the normal-closure code and [`CLOSE_REASON`].
    async fn close(&mut self) -> Result<(), ClipSyncError>;
}
