//! Error types for the session layer.

use whack_protocol::{CellId, PlayerId, ProtocolError};
use whack_transport::TransportError;

use crate::SessionState;

/// Errors that can occur while building or running a session.
///
/// Everything except [`InvalidConfig`](Self::InvalidConfig) and
/// [`PlayerCount`](Self::PlayerCount) is a per-request rejection: the
/// offending player gets an `ERROR` line and the session carries on.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The configuration can't describe a playable session.
    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    /// The number of channels handed to the session doesn't match the
    /// configured player count.
    #[error("session expects {expected} players, got {got}")]
    PlayerCount { expected: u32, got: usize },

    /// The player sent a line that doesn't decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The player sent a line the transport couldn't read as text.
    #[error(transparent)]
    Unreadable(TransportError),

    /// The player's connection is already closed.
    #[error("player {0} is no longer connected")]
    PlayerGone(PlayerId),

    /// The whack names a cell that isn't on the board.
    #[error("cell {} is off the board ({cells} cells)", cell.0)]
    CellOutOfRange { cell: CellId, cells: usize },

    /// The whack claims to come from a different player.
    #[error("player id {} does not match this connection ({})", claimed.0, actual.0)]
    PlayerMismatch { claimed: PlayerId, actual: PlayerId },

    /// The session isn't accepting whacks right now.
    #[error("session is {0}, not accepting whacks")]
    NotActive(SessionState),
}
