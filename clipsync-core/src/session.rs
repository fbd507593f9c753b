//! One connection lifecycle, from `start` to `stop`.
//!
//! A [`SyncSession`] is a cheap handle. All socket work happens on a
//! single driver task that owns the [`Link`] and the [`ConnectionState`];
//! handle methods only enqueue commands onto it, so writes are never
//! interleaved and state is never mutated from two places.
//!
//! ```text
//!  host ──► SyncSession ──cmd──► driver ──frame──► Link ──► peer
//!                ▲                  │
//!                └──── watch ◄──────┤ status
//!  host ◄──────── mpsc ◄────────────┘ events
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::address::PeerAddress;
use crate::bridge::ClipboardBridge;
use crate::codec::{ContentCodec, ContentEnvelope, ContentKind, HANDSHAKE_FRAME};
use crate::config::SessionConfig;
use crate::error::ClipSyncError;
use crate::event::SessionEvent;
use crate::network::{Connector, Link};
use crate::state::{ConnectionState, Effect, InboundDisposition, SessionStatus};

/// Upper bound on the closing handshake during `stop()`.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Work enqueued by the handle for the driver.
#[derive(Debug)]
enum SessionCommand {
    Send(ContentEnvelope),
    Pause,
    Resume,
    Restart,
}

// ── SyncSession ──────────────────────────────────────────────────

/// Handle to a running session.
#[derive(Debug)]
pub struct SyncSession {
    peer: PeerAddress,
    commands: mpsc::UnboundedSender<SessionCommand>,
    status_rx: watch::Receiver<SessionStatus>,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
    max_image_bytes: usize,
}

impl SyncSession {
    /// Validate `address` and start connecting.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`ClipSyncError::InvalidAddress`] if `address` is not
    /// `ws://<ipv4>:<port>/ws`. No socket is opened in that case.
    pub fn start<C: Connector>(
        address: &str,
        connector: Arc<C>,
        bridge: Arc<ClipboardBridge>,
        config: SessionConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self, ClipSyncError> {
        let peer = PeerAddress::parse(address)?;
        Self::start_with(peer, connector, bridge, config, events)
    }

    /// Start connecting to an already validated peer.
    pub fn start_with<C: Connector>(
        peer: PeerAddress,
        connector: Arc<C>,
        bridge: Arc<ClipboardBridge>,
        config: SessionConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self, ClipSyncError> {
        let mut state = ConnectionState::new(config.retry_state());
        let first = state.start()?;

        let status = state.status();
        let (status_tx, status_rx) = watch::channel(status);
        let _ = events.send(SessionEvent::status(status));
        info!(peer = %peer, "sync session starting");

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let max_image_bytes = config.max_image_bytes;

        let driver = SessionDriver {
            peer,
            connector,
            bridge,
            codec: config.codec(),
            config,
            state,
            link: None,
            retry_at: None,
            commands: commands_rx,
            status: status_tx,
            events,
            cancel: cancel.clone(),
        };
        let driver = tokio::spawn(driver.run(first));

        Ok(Self {
            peer,
            commands,
            status_rx,
            cancel,
            driver: Some(driver),
            max_image_bytes,
        })
    }

    pub fn peer(&self) -> PeerAddress {
        self.peer
    }

    /// Last status published by the driver.
    pub fn status(&self) -> SessionStatus {
        *self.status_rx.borrow()
    }

    /// A fresh receiver for status changes.
    pub fn status_receiver(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    /// Wait until the published status satisfies `predicate`.
    pub async fn wait_for_status(
        &self,
        predicate: impl FnMut(&SessionStatus) -> bool,
    ) -> Result<SessionStatus, ClipSyncError> {
        let mut rx = self.status_rx.clone();
        let status = *rx
            .wait_for(predicate)
            .await
            .map_err(|_| ClipSyncError::ChannelClosed)?;
        Ok(status)
    }

    /// Queue `envelope` for the peer. Returns once queued; there is no
    /// delivery confirmation.
    ///
    /// # Errors
    ///
    /// - [`ClipSyncError::Paused`] while paused.
    /// - [`ClipSyncError::NotConnected`] in any other non-active status.
    /// - [`ClipSyncError::PayloadTooLarge`] for an image over the cap.
    pub fn send(&self, envelope: ContentEnvelope) -> Result<(), ClipSyncError> {
        match self.status() {
            SessionStatus::Active => {}
            SessionStatus::Paused => return Err(ClipSyncError::Paused),
            _ => return Err(ClipSyncError::NotConnected),
        }

        if let ContentEnvelope::Image(bytes) = &envelope {
            if bytes.len() > self.max_image_bytes {
                return Err(ClipSyncError::PayloadTooLarge {
                    size: bytes.len(),
                    max: self.max_image_bytes,
                });
            }
        }

        self.commands.send(SessionCommand::Send(envelope))?;
        Ok(())
    }

    /// Stop processing inbound content. The socket stays open.
    pub fn pause(&self) -> Result<(), ClipSyncError> {
        self.enqueue_toggle(SessionCommand::Pause)
    }

    /// Undo [`pause`](Self::pause). Nothing received meanwhile is replayed.
    pub fn resume(&self) -> Result<(), ClipSyncError> {
        self.enqueue_toggle(SessionCommand::Resume)
    }

    fn enqueue_toggle(&self, command: SessionCommand) -> Result<(), ClipSyncError> {
        if !matches!(self.status(), SessionStatus::Active | SessionStatus::Paused) {
            return Err(ClipSyncError::NotConnected);
        }
        self.commands.send(command)?;
        Ok(())
    }

    /// `false` once the driver has exited. A stopped session, failed or
    /// not, cannot be restarted and must be replaced.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Reconnect a `Failed` session with a fresh retry budget.
    pub fn restart(&self) -> Result<(), ClipSyncError> {
        if self.status() != SessionStatus::Failed {
            return Err(ClipSyncError::InvalidTransition(
                "cannot restart: session has not failed",
            ));
        }
        self.commands.send(SessionCommand::Restart)?;
        Ok(())
    }

    /// Close the socket and wait for the driver to exit.
    ///
    /// Cancels any in-flight connect and pending retry. Once this returns,
    /// nothing more reaches the bridge. Calling it again is a no-op.
    pub async fn stop(&mut self) -> SessionStatus {
        self.cancel.cancel();
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                warn!(peer = %self.peer, "session driver panicked: {e}");
            }
        }
        self.status()
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Driver ───────────────────────────────────────────────────────

/// What woke the idle driver.
enum Wake {
    Cancelled,
    Command(Option<SessionCommand>),
    Frame(Option<Result<String, ClipSyncError>>),
    RetryDue,
}

/// Outcome of one connect attempt.
enum Connect<L> {
    Cancelled,
    Opened(L),
    Failed(ClipSyncError),
}

/// Owns the socket and the state machine. Sole writer of both.
struct SessionDriver<C: Connector> {
    peer: PeerAddress,
    connector: Arc<C>,
    bridge: Arc<ClipboardBridge>,
    codec: ContentCodec,
    config: SessionConfig,
    state: ConnectionState,
    link: Option<C::Link>,
    retry_at: Option<Instant>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    status: watch::Sender<SessionStatus>,
    events: mpsc::UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
}

impl<C: Connector> SessionDriver<C> {
    async fn run(mut self, first: Effect) {
        let mut effect = first;
        loop {
            self.publish();
            effect = match effect {
                Effect::OpenSocket => self.open_socket().await,
                Effect::SendHandshake => {
                    if self.config.send_handshake {
                        self.write(HANDSHAKE_FRAME.to_string()).await
                    } else {
                        Effect::None
                    }
                }
                Effect::ScheduleRetry(delay) => {
                    debug!(peer = %self.peer, ?delay, "retry scheduled");
                    self.retry_at = Some(Instant::now() + delay);
                    Effect::None
                }
                Effect::ReportFailure { attempts } => {
                    warn!(peer = %self.peer, attempts, "giving up on peer");
                    self.report(&ClipSyncError::RetryExhausted { attempts });
                    Effect::None
                }
                Effect::CloseSocket => {
                    self.close().await;
                    return;
                }
                Effect::None => match self.next_wake().await {
                    Wake::Cancelled | Wake::Command(None) => match self.state.stop() {
                        // Failed: nothing to close, status stays Failed.
                        Effect::None => return,
                        effect => effect,
                    },
                    Wake::Command(Some(command)) => self.handle_command(command).await,
                    Wake::Frame(frame) => self.handle_frame(frame).await,
                    Wake::RetryDue => {
                        self.retry_at = None;
                        self.transition(ConnectionState::retry_elapsed)
                    }
                },
            };
        }
    }

    async fn next_wake(&mut self) -> Wake {
        let retry_at = self.retry_at;
        let link = self.link.as_mut();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Wake::Cancelled,
            command = self.commands.recv() => Wake::Command(command),
            frame = next_frame(link) => Wake::Frame(frame),
            _ = sleep_until(retry_at) => Wake::RetryDue,
        }
    }

    async fn open_socket(&mut self) -> Effect {
        let attempt = self.state.retry().attempt_count() + 1;
        info!(peer = %self.peer, attempt, "connecting");

        let timeout = self.config.connect_timeout;
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Connect::Cancelled,
            result = tokio::time::timeout(timeout, self.connector.connect(&self.peer)) => match result {
                Ok(Ok(link)) => Connect::Opened(link),
                Ok(Err(e)) => Connect::Failed(e),
                Err(_) => Connect::Failed(ClipSyncError::ConnectFailure(format!(
                    "timed out after {timeout:?}"
                ))),
            },
        };

        match outcome {
            Connect::Cancelled => self.state.stop(),
            Connect::Opened(link) => {
                info!(peer = %self.peer, "connected");
                self.link = Some(link);
                self.transition(ConnectionState::socket_opened)
            }
            Connect::Failed(e) => {
                warn!(peer = %self.peer, attempt, "connect failed: {e}");
                self.report(&e);
                self.transition(ConnectionState::socket_failed)
            }
        }
    }

    async fn handle_command(&mut self, command: SessionCommand) -> Effect {
        match command {
            SessionCommand::Send(envelope) => {
                // Status may have moved on since the handle checked it.
                if let Err(e) = self.state.ensure_can_send() {
                    self.report(&e);
                    return Effect::None;
                }
                let frame = self.codec.encode(&envelope);
                debug!(kind = %envelope.kind(), bytes = frame.len(), "sending");
                self.write(frame).await
            }
            SessionCommand::Pause => self.transition(ConnectionState::pause),
            SessionCommand::Resume => self.transition(ConnectionState::resume),
            SessionCommand::Restart => {
                info!(peer = %self.peer, "restarting");
                self.transition(ConnectionState::restart)
            }
        }
    }

    async fn write(&mut self, frame: String) -> Effect {
        let Some(link) = self.link.as_mut() else {
            self.report(&ClipSyncError::NotConnected);
            return Effect::None;
        };

        // A peer that stops reading can stall the write indefinitely.
        let written = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = link.send_frame(frame) => Some(result),
        };

        match written {
            None => {
                debug!(peer = %self.peer, "write abandoned, stopping");
                self.state.stop()
            }
            Some(Ok(())) => Effect::None,
            Some(Err(e)) => {
                warn!(peer = %self.peer, "write failed: {e}");
                self.report(&e);
                self.lose_connection()
            }
        }
    }

    async fn handle_frame(&mut self, frame: Option<Result<String, ClipSyncError>>) -> Effect {
        match frame {
            Some(Ok(frame)) => {
                self.deliver(&frame).await;
                Effect::None
            }
            Some(Err(ClipSyncError::Decode(e))) => {
                warn!(peer = %self.peer, "dropping unreadable frame: {e}");
                self.report(&e.into());
                Effect::None
            }
            Some(Err(e)) => {
                warn!(peer = %self.peer, "connection lost: {e}");
                self.lose_connection()
            }
            None => {
                info!(peer = %self.peer, "peer closed the connection");
                self.lose_connection()
            }
        }
    }

    /// Drop the socket and go back to connecting.
    fn lose_connection(&mut self) -> Effect {
        let uptime = self.state.phase().connected_duration();
        debug!(peer = %self.peer, ?uptime, "socket dropped");
        self.link = None;
        self.transition(ConnectionState::connection_lost)
    }

    /// Route one inbound frame to the bridge, if the phase allows it.
    async fn deliver(&mut self, frame: &str) {
        match self.state.inbound_disposition() {
            InboundDisposition::Deliver => {}
            InboundDisposition::Discard => {
                debug!(bytes = frame.len(), "paused, discarding inbound frame");
                return;
            }
            InboundDisposition::Reject => {
                debug!(phase = %self.state.phase(), "frame outside an open connection");
                return;
            }
        }
        if self.cancel.is_cancelled() {
            return;
        }

        let envelope = match self.codec.decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(peer = %self.peer, "dropping malformed frame: {e}");
                self.report(&e.into());
                return;
            }
        };

        let result = match envelope {
            ContentEnvelope::Text(text) => self
                .bridge
                .on_text_received(&text)
                .map(|()| (ContentKind::Text, text)),
            ContentEnvelope::Image(bytes) => self
                .bridge
                .on_image_received(&bytes)
                .await
                .map(|id| (ContentKind::Image, id)),
        };

        match result {
            Ok((kind, detail)) => {
                info!(%kind, "content received");
                self.emit(SessionEvent::ContentReceived { kind, detail });
            }
            Err(e) => self.report(&e),
        }
    }

    async fn close(&mut self) {
        self.retry_at = None;
        if let Some(mut link) = self.link.take() {
            match tokio::time::timeout(CLOSE_TIMEOUT, link.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(peer = %self.peer, "close failed: {e}"),
                Err(_) => debug!(peer = %self.peer, "close timed out"),
            }
        }
        if let Err(e) = self.state.finish_close() {
            warn!("{e}");
        }
        self.publish();
        info!(peer = %self.peer, "sync session stopped");
    }

    /// Apply a transition; a rejected trigger becomes an error event.
    fn transition(
        &mut self,
        trigger: impl FnOnce(&mut ConnectionState) -> Result<Effect, ClipSyncError>,
    ) -> Effect {
        match trigger(&mut self.state) {
            Ok(effect) => effect,
            Err(e) => {
                self.report(&e);
                Effect::None
            }
        }
    }

    /// Push the current status out, once per change.
    fn publish(&self) {
        let status = self.state.status();
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            info!(peer = %self.peer, %status, "status changed");
            self.emit(SessionEvent::status(status));
        }
    }

    fn report(&self, error: &ClipSyncError) {
        self.emit(SessionEvent::error(error));
    }

    fn emit(&self, event: SessionEvent) {
        // The host may have stopped listening; the session carries on.
        let _ = self.events.send(event);
    }
}

async fn next_frame<L: Link>(link: Option<&mut L>) -> Option<Result<String, ClipSyncError>> {
    match link {
        Some(link) => link.next_frame().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ── Tests ────────────────────────────────────────────────────────
