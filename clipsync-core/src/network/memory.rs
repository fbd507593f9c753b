//! In-process transport.
//!
//! Every successful `connect` hands the far end of the new link to the
//! receiver returned by [`MemoryConnector::new`], so a test (or an
//! embedding host) can play the desktop peer without a socket.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::address::PeerAddress;
use crate::error::ClipSyncError;
use crate::network::{Connector, Link};

#[derive(Debug)]
struct Shared {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    attempts: AtomicU32,
    fail_remaining: AtomicU32,
    stall: AtomicBool,
    write_stall: Arc<AtomicBool>,
}

/// Connector whose links are channel pairs.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
}

impl MemoryConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            shared: Arc::new(Shared {
                peers,
                attempts: AtomicU32::new(0),
                fail_remaining: AtomicU32::new(0),
                stall: AtomicBool::new(false),
                write_stall: Arc::new(AtomicBool::new(false)),
            }),
        };
        (connector, rx)
    }

    /// Refuse the next `n` connect attempts.
    pub fn fail_next(&self, n: u32) {
        self.shared.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// While set, connect attempts never complete.
    pub fn set_stall(&self, stall: bool) {
        self.shared.stall.store(stall, Ordering::SeqCst);
    }

    /// While set, writes on every link from this connector never complete,
    /// like a peer that stopped reading.
    pub fn set_write_stall(&self, stall: bool) {
        self.shared.write_stall.store(stall, Ordering::SeqCst);
    }

    /// Connect attempts made so far, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Link = MemoryLink;

    async fn connect(&self, peer: &PeerAddress) -> Result<MemoryLink, ClipSyncError> {
        let attempt = self.shared.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if self.shared.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let refused = self
            .shared
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            debug!(peer = %peer, attempt, "memory connect refused");
            return Err(ClipSyncError::ConnectFailure("connection refused".into()));
        }

        let (to_link, inbound) = mpsc::unbounded_channel();
        let (outbound, from_link) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let far_end = MemoryPeer {
            tx: Some(to_link),
            rx: from_link,
            closed: closed.clone(),
        };
        if self.shared.peers.send(far_end).is_err() {
            return Err(ClipSyncError::ConnectFailure("no peer listening".into()));
        }

        Ok(MemoryLink {
            inbound,
            outbound,
            closed,
            write_stall: self.shared.write_stall.clone(),
        })
    }
}

/// Session side of an in-process link.
#[derive(Debug)]
pub struct MemoryLink {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
    write_stall: Arc<AtomicBool>,
}

#[async_trait]
impl Link for MemoryLink {
    async fn send_frame(&mut self, frame: String) -> Result<(), ClipSyncError> {
        if self.write_stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.outbound
            .send(frame)
            .map_err(|_| ClipSyncError::Transport("peer went away".into()))
    }

    async fn next_frame(&mut self) -> Option<Result<String, ClipSyncError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), ClipSyncError> {
        self.closed.store(true, Ordering::SeqCst);
        self.inbound.close();
        Ok(())
    }
}

/// Peer side of an in-process link.
#[derive(Debug)]
pub struct MemoryPeer {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl MemoryPeer {
    /// Deliver one frame to the session. `false` once the link is gone.
    pub fn push(&self, frame: impl Into<String>) -> bool {
        match &self.tx {
            Some(tx) => tx.send(frame.into()).is_ok(),
            None => false,
        }
    }

    /// Next frame the session wrote, or `None` after the session dropped
    /// its end.
    pub async fn next_written(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Simulate the peer dropping the connection.
    pub fn disconnect(&mut self) {
        self.tx = None;
    }

    /// `true` once the session closed this link on purpose.
    pub fn was_closed_normally(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> PeerAddress {
        PeerAddress::parse("ws://127.0.0.1:9000/ws").unwrap()
    }

    #[tokio::test]
    async fn frames_flow_both_ways() {
        let (connector, mut peers) = MemoryConnector::new();
        let mut link = connector.connect(&peer()).await.unwrap();
        let mut far = peers.recv().await.unwrap();

        link.send_frame("text:out".into()).await.unwrap();
        assert_eq!(far.next_written().await.as_deref(), Some("text:out"));

        assert!(far.push("text:in"));
        assert_eq!(link.next_frame().await.unwrap().unwrap(), "text:in");
    }

    #[tokio::test]
    async fn fail_next_refuses_then_recovers() {
        let (connector, _peers) = MemoryConnector::new();
        connector.fail_next(2);

        assert!(matches!(
            connector.connect(&peer()).await,
            Err(ClipSyncError::ConnectFailure(_))
        ));
        assert!(connector.connect(&peer()).await.is_err());
        assert!(connector.connect(&peer()).await.is_ok());
        assert_eq!(connector.attempts(), 3);
    }

    #[tokio::test]
    async fn disconnect_ends_the_stream() {
        let (connector, mut peers) = MemoryConnector::new();
        let mut link = connector.connect(&peer()).await.unwrap();
        let mut far = peers.recv().await.unwrap();

        far.disconnect();
        assert!(link.next_frame().await.is_none());
        assert!(!far.push("text:late"));
    }

    #[tokio::test]
    async fn close_is_visible_to_peer() {
        let (connector, mut peers) = MemoryConnector::new();
        let mut link = connector.connect(&peer()).await.unwrap();
        let far = peers.recv().await.unwrap();

        assert!(!far.was_closed_normally());
        link.close().await.unwrap();
        assert!(far.was_closed_normally());
    }
}
