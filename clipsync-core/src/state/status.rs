use serde::{Deserialize, Serialize};

/// Host-visible status of a sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, not started yet.
    #[default]
    Idle,
    /// Opening the socket, or waiting out a retry backoff.
    Connecting,
    /// Socket open, content flows both ways.
    Active,
    /// Socket open, inbound content is discarded and sends are refused.
    Paused,
    /// Retries exhausted. Needs an explicit restart.
    Failed,
    /// Closed by the host.
    Stopped,
}

impl SessionStatus {
    /// `true` while the session holds, or is trying to obtain, a socket.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Active | Self::Paused)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Active => write!(f, "Active"),
            Self::Paused => write!(f, "Paused"),
            Self::Failed => write!(f, "Failed"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}
