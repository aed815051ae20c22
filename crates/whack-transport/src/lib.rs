//! Transport abstraction layer for the whack-a-mole server.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! line-oriented network protocols. Every transport carries one protocol
//! message per "line": a `\n`-terminated line on raw TCP, a text frame on
//! WebSocket.
//!
//! A connection is [split](Connection::split) into a [`LineReader`] and a
//! [`LineWriter`] so the inbound and outbound duties of a player can run in
//! separate tasks without contending for one lock.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use tcp::{TcpLineConnection, TcpLineReader, TcpLineTransport, TcpLineWriter};
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketReader, WebSocketTransport, WebSocketWriter,
};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Longest inbound line a reader accepts by default, terminator excluded.
///
/// Every client message fits in a few dozen bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

/// Counter for generating unique connection IDs across all transports.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide connection id.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A single accepted connection, not yet split into its two halves.
pub trait Connection: Send + 'static {
    /// The inbound half.
    type Reader: LineReader;
    /// The outbound half.
    type Writer: LineWriter;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the remote peer's address.
    fn peer_addr(&self) -> SocketAddr;

    /// Splits the connection into independently owned read and write halves.
    fn split(self) -> (Self::Reader, Self::Writer);
}

/// The receiving half of a connection.
pub trait LineReader: Send + 'static {
    /// Receives the next line from the remote peer, without its terminator.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed. A
    /// [recoverable](TransportError::is_recoverable) error rejects one line
    /// and leaves the reader usable; any other error ends the connection.
    fn recv_line(
        &mut self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;
}

/// The sending half of a connection.
pub trait LineWriter: Send + 'static {
    /// Sends one line to the remote peer and flushes it.
    ///
    /// `line` must not contain a line terminator; the transport adds
    /// whatever framing it needs.
    fn send_line(
        &mut self,
        line: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the outbound direction of the connection.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_next_connection_ids_are_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }
}
