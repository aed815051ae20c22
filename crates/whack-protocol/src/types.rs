//! Core protocol types for the whack-a-mole wire format.
//!
//! Every line on the wire decodes to exactly one of these values. The
//! server only ever sends [`ServerMessage`]s and only ever receives
//! [`ClientMessage`]s.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's identity within one session.
///
/// Assigned in arrival order, `0..players`. Serializes as the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Returns the id as a slot index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A linear board position, `0..rows * cols`.
///
/// Maps to `(row, col) = (index / cols, index % cols)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub u32);

impl CellId {
    /// Returns the id as a slot index.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `(row, col)` for a board with `cols` columns.
    pub fn coords(self, cols: u32) -> (u32, u32) {
        (self.0 / cols, self.0 % cols)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How the session ended for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Strictly highest score.
    Won,
    /// Someone else scored more.
    Lost,
    /// Shares the highest score with at least one other player.
    Tied,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Won => write!(f, "won"),
            Self::Lost => write!(f, "lost"),
            Self::Tied => write!(f, "tied"),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Server → client messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Session parameters, sent once when the player is accepted.
    Welcome {
        rows: u32,
        cols: u32,
        players: u32,
        player_id: PlayerId,
    },

    /// The cell transitioned to Raised.
    MoleUp(CellId),

    /// The cell transitioned to Lowered.
    MoleDown(CellId),

    /// A player's score changed.
    ///
    /// `player` is `None` only when decoding a peer that uses the short
    /// `SCORE <score>` form; the server always names the player.
    Score {
        score: i32,
        player: Option<PlayerId>,
    },

    /// Terminal session outcome. Nothing follows it on the connection.
    Outcome(Outcome),

    /// A protocol or session error, reported to the offending player.
    Error(String),
}

impl ServerMessage {
    /// Returns `true` for the last message a connection will ever carry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Outcome(_))
    }
}

/// Client → server messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    /// The player attempts to lower a raised cell.
    Whack { cell: CellId, player: PlayerId },
}
