/**
 * Error types for the relay.
 *
 * None of these ever reach the host: the relay logs them, and delivery
 * failures are additionally surfaced through the `Notifier`.
 */

/// Failures of delivery, streaming and relay startup.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The collector answered with a non-2xx status.
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    /// Connection, DNS, TLS or protocol failure below the HTTP status level.
    #[error("{0}")]
    Transport(String),

    #[error("failed to serialize forwarding record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("event stream I/O failed: {0}")]
    Stream(#[from] std::io::Error),

    #[error("an event stream is already running")]
    StreamAlreadyRunning,

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl From<ureq::Error> for RelayError {
    fn from(err: ureq::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}

/// A request issued back to a debug session failed.
#[derive(Debug, thiserror::Error)]
#[error("{command} request failed: {message}")]
pub struct HostError {
    pub command: String,
    pub message: String,
}

impl HostError {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }
}
