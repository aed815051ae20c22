//! Transport-layer errors.

use std::io;
use std::net::SocketAddr;

/// Errors from binding, accepting, and moving lines over a connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Listening on or connecting to `addr` failed.
    #[error("cannot reach {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The listener failed to hand over the next connection.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// The WebSocket opening handshake failed.
    #[error("handshake with {peer} failed: {reason}")]
    Handshake { peer: SocketAddr, reason: String },

    /// Reading the next line failed.
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// Writing, flushing, or closing failed.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// The peer went away before an expected message.
    #[error("connection closed: {0}")]
    Closed(String),

    /// The peer sent a line that isn't UTF-8. The connection stays usable.
    #[error("line is not valid UTF-8")]
    NotUtf8,

    /// The peer sent a line longer than the reader accepts. The rest of
    /// that line is discarded and the connection stays usable.
    #[error("line exceeds {max} bytes")]
    LineTooLong { max: usize },
}

impl TransportError {
    /// Whether the connection can keep reading after this error.
    ///
    /// Only a bad line is recoverable; everything else means the
    /// connection is gone.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotUtf8 | Self::LineTooLong { .. })
    }
}
