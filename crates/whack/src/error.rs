//! Unified error type for the whack server.

use whack_protocol::ProtocolError;
use whack_session::SessionError;
use whack_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WhackError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (malformed line).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (bad config, wrong player count).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The config file isn't valid JSON for a session config.
    #[error("invalid config file: {0}")]
    Config(#[from] serde_json::Error),

    /// Reading a config file or writing a report failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Shutdown was requested while players were still joining.
    #[error("server shut down before the session started")]
    Shutdown,
}
