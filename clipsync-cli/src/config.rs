//! Configuration for the clipsync host.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use clipsync_core::bridge::DirectoryImageStore;
use clipsync_core::codec::DEFAULT_MAX_IMAGE_BYTES;
use clipsync_core::config::DEFAULT_CONNECT_TIMEOUT;
use clipsync_core::state::{DEFAULT_BACKOFF_DELAY, DEFAULT_MAX_ATTEMPTS};
use clipsync_core::SessionConfig;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipSyncConfig {
    /// Peer and socket settings.
    pub network: NetworkConfig,
    /// Reconnect policy.
    pub retry: RetryConfig,
    /// Where received images go.
    pub storage: StorageConfig,
    /// Clipboard backend.
    pub clipboard: ClipboardConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Desktop peer, `ws://<ipv4>:<port>/ws`. Empty means "ask at runtime".
    pub peer_address: String,
    /// Connect on launch when `peer_address` is set.
    pub auto_start: bool,
    /// Bound on one connect attempt, in seconds.
    pub connect_timeout_secs: u64,
    /// Send `START_SYNC` after connecting.
    pub send_handshake: bool,
}

/// Reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Consecutive failed connects before giving up.
    pub max_attempts: u32,
    /// Wait between attempts, in milliseconds.
    pub backoff_delay_ms: u64,
}

/// Image storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for received images. Empty means `<pictures>/ClipSync`.
    pub image_dir: String,
    /// Largest image accepted or sent, in bytes.
    pub max_image_bytes: usize,
}

/// Clipboard backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Use the desktop clipboard; otherwise keep clipboard text in memory.
    pub system: bool,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Optional log file path. If empty, logs to stderr.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peer_address: String::new(),
            auto_start: true,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            send_handshake: true,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_delay_ms: DEFAULT_BACKOFF_DELAY.as_millis() as u64,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: String::new(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self { system: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClipSyncConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a new file (for bootstrapping).
    ///
    /// Fails with `AlreadyExists` rather than overwrite an existing file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(text.as_bytes())
    }

    /// Session knobs, with out-of-range values clamped.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            max_attempts: self.retry.max_attempts.max(1),
            backoff_delay: Duration::from_millis(self.retry.backoff_delay_ms),
            connect_timeout: Duration::from_secs(self.network.connect_timeout_secs.max(1)),
            max_image_bytes: self.storage.max_image_bytes.max(1),
            send_handshake: self.network.send_handshake,
        }
    }

    /// Resolved image directory.
    pub fn image_dir(&self) -> PathBuf {
        if self.storage.image_dir.is_empty() {
            DirectoryImageStore::default_dir()
        } else {
            PathBuf::from(&self.storage.image_dir)
        }
    }

    /// Configured peer, if any.
    pub fn peer_address(&self) -> Option<&str> {
        let addr = self.network.peer_address.trim();
        (!addr.is_empty()).then_some(addr)
    }
}

// ── Tests ────────────────────────────────────────────────────────
