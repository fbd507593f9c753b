//! Runtime knobs for a sync session.

use std::time::Duration;

use crate::codec::{ContentCodec, DEFAULT_MAX_IMAGE_BYTES};
use crate::state::{DEFAULT_BACKOFF_DELAY, DEFAULT_MAX_ATTEMPTS, RetryState};

/// Default bound on a single connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Session tuning. Defaults match the desktop peer's expectations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Consecutive failed connects before the session goes `Failed`.
    pub max_attempts: u32,
    /// Fixed wait between connect attempts.
    pub backoff_delay: Duration,
    /// Bound on one connect attempt, handshake included.
    pub connect_timeout: Duration,
    /// Cap on one image, in decoded bytes, both directions.
    pub max_image_bytes: usize,
    /// Write `START_SYNC` after every successful connect.
    pub send_handshake: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_delay: DEFAULT_BACKOFF_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            send_handshake: true,
        }
    }
}

impl SessionConfig {
    pub fn retry_state(&self) -> RetryState {
        RetryState::new(self.max_attempts, self.backoff_delay)
    }

    pub fn codec(&self) -> ContentCodec {
        ContentCodec::new(self.max_image_bytes)
    }
}
