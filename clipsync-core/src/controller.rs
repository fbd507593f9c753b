//! Host-facing facade over at most one [`SyncSession`].

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::address::PeerAddress;
use crate::bridge::ClipboardBridge;
use crate::codec::ContentEnvelope;
use crate::config::SessionConfig;
use crate::error::ClipSyncError;
use crate::event::SessionEvent;
use crate::network::Connector;
use crate::session::SyncSession;
use crate::state::SessionStatus;

/// Starts, steers and stops the sync session on behalf of the host.
///
/// Every rejected command is both returned and reported once on the event
/// channel, so a host that only watches events still sees it.
#[derive(Debug)]
pub struct SessionController<C: Connector> {
    connector: Arc<C>,
    bridge: Arc<ClipboardBridge>,
    config: SessionConfig,
    session: Option<SyncSession>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<C: Connector> SessionController<C> {
    pub fn new(
        connector: C,
        bridge: ClipboardBridge,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let controller = Self {
            connector: Arc::new(connector),
            bridge: Arc::new(bridge),
            config,
            session: None,
            events,
        };
        (controller, rx)
    }

    pub fn bridge(&self) -> &ClipboardBridge {
        &self.bridge
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// `Idle` until the first `start_sync`.
    pub fn status(&self) -> SessionStatus {
        self.session
            .as_ref()
            .map_or(SessionStatus::Idle, SyncSession::status)
    }

    pub fn peer(&self) -> Option<PeerAddress> {
        self.session.as_ref().map(SyncSession::peer)
    }

    pub fn status_receiver(&self) -> Option<watch::Receiver<SessionStatus>> {
        self.session.as_ref().map(SyncSession::status_receiver)
    }

    /// Wait until the current session's status satisfies `predicate`.
    pub async fn wait_for_status(
        &self,
        predicate: impl FnMut(&SessionStatus) -> bool,
    ) -> Result<SessionStatus, ClipSyncError> {
        match &self.session {
            Some(session) => session.wait_for_status(predicate).await,
            None => Err(ClipSyncError::NotConnected),
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Connect to `address`.
    ///
    /// While a session is connecting, active or paused this is a no-op
    /// that returns the current status. A failed session for the same
    /// peer is restarted while its driver still runs; anything else,
    /// including a failed session that was stopped, is replaced by a fresh
    /// session.
    pub async fn start_sync(&mut self, address: &str) -> Result<SessionStatus, ClipSyncError> {
        let peer = PeerAddress::parse(address).map_err(|e| self.reject(e))?;

        if let Some(session) = &self.session {
            let status = session.status();
            if status.is_live() {
                if session.peer() != peer {
                    info!(current = %session.peer(), requested = %peer, "already syncing, stop first to switch peers");
                }
                debug!(%status, "start ignored");
                return Ok(status);
            }
            if status == SessionStatus::Failed && session.peer() == peer && session.is_running() {
                session.restart().map_err(|e| self.reject(e))?;
                return Ok(SessionStatus::Connecting);
            }
        }

        if let Some(mut old) = self.session.take() {
            old.stop().await;
        }

        let session = SyncSession::start_with(
            peer,
            self.connector.clone(),
            self.bridge.clone(),
            self.config.clone(),
            self.events.clone(),
        )
        .map_err(|e| self.reject(e))?;
        let status = session.status();
        self.session = Some(session);
        Ok(status)
    }

    /// Stop the session, if any, and return the resulting status.
    pub async fn stop_sync(&mut self) -> SessionStatus {
        match self.session.as_mut() {
            Some(session) => session.stop().await,
            None => SessionStatus::Idle,
        }
    }

    pub fn pause_sync(&self) -> Result<(), ClipSyncError> {
        let result = self.current()?.pause();
        result.map_err(|e| self.reject(e))
    }

    pub fn resume_sync(&self) -> Result<(), ClipSyncError> {
        let result = self.current()?.resume();
        result.map_err(|e| self.reject(e))
    }

    /// Queue an envelope for the peer.
    pub fn send_content(&self, envelope: ContentEnvelope) -> Result<(), ClipSyncError> {
        let result = self.current()?.send(envelope);
        result.map_err(|e| self.reject(e))
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<(), ClipSyncError> {
        let envelope = self.bridge.capture_outbound_text(text);
        self.send_content(envelope)
    }

    pub fn send_image(&self, png: Vec<u8>) -> Result<(), ClipSyncError> {
        let envelope = self
            .bridge
            .capture_outbound_image(png)
            .map_err(|e| self.reject(e))?;
        self.send_content(envelope)
    }

    /// Send whatever text the local clipboard holds.
    pub fn send_clipboard(&self) -> Result<(), ClipSyncError> {
        let envelope = self
            .bridge
            .capture_clipboard_text()
            .map_err(|e| self.reject(e))?
            .ok_or_else(|| self.reject(ClipSyncError::ClipboardWrite("clipboard holds no text".into())))?;
        self.send_content(envelope)
    }

    fn current(&self) -> Result<&SyncSession, ClipSyncError> {
        self.session
            .as_ref()
            .ok_or_else(|| self.reject(ClipSyncError::NotConnected))
    }

    /// Report a rejected command once and hand the error back.
    fn reject(&self, error: ClipSyncError) -> ClipSyncError {
        warn!("command rejected: {error}");
        let _ = self.events.send(SessionEvent::error(&error));
        error
    }
}

// ── Tests ────────────────────────────────────────────────────────
