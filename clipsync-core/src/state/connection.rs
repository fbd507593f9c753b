//! Connection state machine driving a sync session.
//!
//! Transitions are plain method calls that return the side effect the
//! caller must perform as data ([`Effect`]). Nothing here touches a socket,
//! so the whole lifecycle can be exercised without I/O.

use std::time::{Duration, Instant};

use crate::error::ClipSyncError;
use crate::state::retry::{RetryDecision, RetryState};
use crate::state::status::SessionStatus;

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of the peer connection.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected ◄──► Paused
///       ▲             │  ▲  ▲          │             │
///       │             │  └──┴──────────┴─────────────┘  (socket lost)
///       │             ▼
///       │           Failed ── restart() ──► Connecting
///       │
///       └──────────── Closing ◄── stop() (Connecting/Connected/Paused)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No socket. Initial state, and terminal after `stop()`.
    #[default]
    Disconnected,

    /// Socket being opened, or waiting for the next retry.
    Connecting,

    /// Socket open, traffic flows.
    Connected {
        /// When the connection entered the `Connected` state.
        since: Instant,
    },

    /// Socket open, inbound frames are dropped and sends refused.
    Paused,

    /// Shutdown requested; the socket is being closed.
    Closing,

    /// Retry budget spent. Only `restart()` leaves this state.
    Failed,
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::Paused => write!(f, "Paused"),
            Self::Closing => write!(f, "Closing"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

impl ConnectionPhase {
    /// How long the connection has been in the `Connected` state.
    ///
    /// Returns `None` for any other phase.
    pub fn connected_duration(&self) -> Option<Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }
}

// ── Effect ───────────────────────────────────────────────────────

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing to do (includes no-op triggers).
    None,
    /// Open a fresh socket to the peer.
    OpenSocket,
    /// Write the bootstrap frame on the new socket.
    SendHandshake,
    /// Wait, then fire [`ConnectionState::retry_elapsed`].
    ScheduleRetry(Duration),
    /// Retries exhausted; tell the host.
    ReportFailure { attempts: u32 },
    /// Close the socket with a normal-closure code.
    CloseSocket,
}

/// What to do with an inbound frame in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundDisposition {
    /// Decode and hand to the clipboard bridge.
    Deliver,
    /// Accepted at socket level but dropped (paused).
    Discard,
    /// No open connection; the frame should not exist.
    Reject,
}

// ── ConnectionState ──────────────────────────────────────────────

/// Phase plus retry bookkeeping for one session.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    phase: ConnectionPhase,
    retry: RetryState,
    /// Set once `stop()` has completed; distinguishes Stopped from Idle.
    stopped: bool,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new(RetryState::default())
    }
}

impl ConnectionState {
    pub fn new(retry: RetryState) -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            retry,
            stopped: false,
        }
    }

    pub fn phase(&self) -> &ConnectionPhase {
        &self.phase
    }

    pub fn retry(&self) -> &RetryState {
        &self.retry
    }

    /// Host-facing view of the current phase.
    ///
    /// `Closing` already reports `Stopped`, so `finish_close` never
    /// produces a second notification.
    pub fn status(&self) -> SessionStatus {
        match self.phase {
            ConnectionPhase::Disconnected if self.stopped => SessionStatus::Stopped,
            ConnectionPhase::Disconnected => SessionStatus::Idle,
            ConnectionPhase::Connecting => SessionStatus::Connecting,
            ConnectionPhase::Connected { .. } => SessionStatus::Active,
            ConnectionPhase::Paused => SessionStatus::Paused,
            ConnectionPhase::Closing => SessionStatus::Stopped,
            ConnectionPhase::Failed => SessionStatus::Failed,
        }
    }

    // ── Gates ────────────────────────────────────────────────────

    /// Outbound sends are accepted only while `Connected`.
    pub fn ensure_can_send(&self) -> Result<(), ClipSyncError> {
        match self.phase {
            ConnectionPhase::Connected { .. } => Ok(()),
            ConnectionPhase::Paused => Err(ClipSyncError::Paused),
            _ => Err(ClipSyncError::NotConnected),
        }
    }

    pub fn inbound_disposition(&self) -> InboundDisposition {
        match self.phase {
            ConnectionPhase::Connected { .. } => InboundDisposition::Deliver,
            ConnectionPhase::Paused => InboundDisposition::Discard,
            _ => InboundDisposition::Reject,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// `Disconnected → Connecting`.
    pub fn start(&mut self) -> Result<Effect, ClipSyncError> {
        match self.phase {
            ConnectionPhase::Disconnected if !self.stopped => {
                self.phase = ConnectionPhase::Connecting;
                Ok(Effect::OpenSocket)
            }
            _ => Err(ClipSyncError::InvalidTransition(
                "cannot start: session already started",
            )),
        }
    }

    /// `Connecting → Connected`. Resets the retry budget.
    pub fn socket_opened(&mut self) -> Result<Effect, ClipSyncError> {
        match self.phase {
            ConnectionPhase::Connecting => {
                self.phase = ConnectionPhase::Connected {
                    since: Instant::now(),
                };
                self.retry.reset();
                Ok(Effect::SendHandshake)
            }
            _ => Err(ClipSyncError::InvalidTransition(
                "socket opened outside Connecting",
            )),
        }
    }

    /// A connect attempt failed. Stays `Connecting` with a retry
    /// scheduled, or moves to `Failed` once the budget is spent.
    pub fn socket_failed(&mut self) -> Result<Effect, ClipSyncError> {
        match self.phase {
            ConnectionPhase::Connecting => match self.retry.record_failure() {
                RetryDecision::Retry { after, .. } => Ok(Effect::ScheduleRetry(after)),
                RetryDecision::Exhausted { attempts } => {
                    self.phase = ConnectionPhase::Failed;
                    Ok(Effect::ReportFailure { attempts })
                }
            },
            _ => Err(ClipSyncError::InvalidTransition(
                "connect failure outside Connecting",
            )),
        }
    }

    /// Backoff finished; try again.
    pub fn retry_elapsed(&mut self) -> Result<Effect, ClipSyncError> {
        match self.phase {
            ConnectionPhase::Connecting => Ok(Effect::OpenSocket),
            _ => Err(ClipSyncError::InvalidTransition(
                "retry timer fired outside Connecting",
            )),
        }
    }

    /// `Connected → Paused`. A second pause is a no-op.
    pub fn pause(&mut self) -> Result<Effect, ClipSyncError> {
        match self.phase {
            ConnectionPhase::Connected { .. } => {
                self.phase = ConnectionPhase::Paused;
                Ok(Effect::None)
            }
            ConnectionPhase::Paused => Ok(Effect::None),
            _ => Err(ClipSyncError::NotConnected),
        }
    }

    /// `Paused → Connected`. Resuming a running session is a no-op.
    pub fn resume(&mut self) -> Result<Effect, ClipSyncError> {
        match self.phase {
            ConnectionPhase::Paused => {
                self.phase = ConnectionPhase::Connected {
                    since: Instant::now(),
                };
                Ok(Effect::None)
            }
            ConnectionPhase::Connected { .. } => Ok(Effect::None),
            _ => Err(ClipSyncError::NotConnected),
        }
    }

    /// The peer or the network dropped the socket.
    /// `Connected/Paused → Connecting`, reconnecting immediately.
    pub fn connection_lost(&mut self) -> Result<Effect, ClipSyncError> {
        match self.phase {
            ConnectionPhase::Connected { .. } | ConnectionPhase::Paused => {
                self.phase = ConnectionPhase::Connecting;
                Ok(Effect::OpenSocket)
            }
            _ => Err(ClipSyncError::InvalidTransition(
                "connection lost without an open socket",
            )),
        }
    }

    /// Host-initiated shutdown. Idempotent; `Failed` stays `Failed`.
    pub fn stop(&mut self) -> Effect {
        match self.phase {
            ConnectionPhase::Connecting
            | ConnectionPhase::Connected { .. }
            | ConnectionPhase::Paused => {
                self.phase = ConnectionPhase::Closing;
                Effect::CloseSocket
            }
            ConnectionPhase::Disconnected | ConnectionPhase::Closing | ConnectionPhase::Failed => {
                Effect::None
            }
        }
    }

    /// `Closing → Disconnected` (stopped).
    pub fn finish_close(&mut self) -> Result<Effect, ClipSyncError> {
        match self.phase {
            ConnectionPhase::Closing => {
                self.phase = ConnectionPhase::Disconnected;
                self.stopped = true;
                Ok(Effect::None)
            }
            _ => Err(ClipSyncError::InvalidTransition(
                "cannot finish close: not in Closing state",
            )),
        }
    }

    /// Explicit restart after retry exhaustion. `Failed → Connecting`
    /// with a fresh retry budget.
    pub fn restart(&mut self) -> Result<Effect, ClipSyncError> {
        match self.phase {
            ConnectionPhase::Failed => {
                self.retry.reset();
                self.phase = ConnectionPhase::Connecting;
                Ok(Effect::OpenSocket)
            }
            _ => Err(ClipSyncError::InvalidTransition(
                "cannot restart: session has not failed",
            )),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
