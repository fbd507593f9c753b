pub mod connection;
mod retry;
mod status;

pub use connection::{ConnectionPhase, ConnectionState, Effect, InboundDisposition};
pub use retry::{DEFAULT_BACKOFF_DELAY, DEFAULT_MAX_ATTEMPTS, RetryDecision, RetryState};
pub use status::SessionStatus;
