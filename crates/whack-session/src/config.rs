//! Session configuration and lifecycle state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use whack_clock::MoleTimings;
use whack_transport::DEFAULT_MAX_LINE_LEN;

use crate::{ScoringRules, SessionError};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for one session.
///
/// Every field has a default, so a JSON file only needs to name what it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Board rows.
    pub rows: u32,

    /// Board columns.
    pub cols: u32,

    /// Players required before the session starts. The session starts
    /// the moment the last one joins.
    pub players: u32,

    /// Session length in milliseconds.
    pub duration_ms: u64,

    /// Mole dwell ranges.
    pub moles: MoleTimings,

    /// Score deltas and clamping.
    pub scoring: ScoringRules,

    /// Malformed requests a player may send before their connection is
    /// closed. `0` closes on the first one.
    pub max_protocol_errors: u32,

    /// Longest request line accepted, in bytes. Longer lines are rejected
    /// like any other malformed request.
    pub max_line_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            players: 2,
            duration_ms: 60_000,
            moles: MoleTimings::default(),
            scoring: ScoringRules::default(),
            max_protocol_errors: 3,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl SessionConfig {
    /// A config with the given shape and default timings and scoring.
    pub fn new(rows: u32, cols: u32, players: u32, duration: Duration) -> Self {
        Self {
            rows,
            cols,
            players,
            duration_ms: duration.as_millis() as u64,
            ..Self::default()
        }
    }

    /// Session length.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Number of cells on the board.
    pub fn cells(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Reject shapes that can't be played and clamp the dwell ranges.
    pub fn validated(mut self) -> Result<Self, SessionError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(SessionError::InvalidConfig(format!(
                "board must have at least one cell, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.rows.checked_mul(self.cols).is_none() {
            return Err(SessionError::InvalidConfig(format!(
                "{}x{} board is too large",
                self.rows, self.cols
            )));
        }
        if self.players == 0 {
            return Err(SessionError::InvalidConfig(
                "at least one player is required".into(),
            ));
        }
        if self.duration_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "duration must be positive".into(),
            ));
        }
        if self.max_line_len == 0 {
            return Err(SessionError::InvalidConfig(
                "max_line_len must be positive".into(),
            ));
        }
        self.moles = self.moles.validated();
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// Transitions are strictly ordered and never skip a state:
///
/// ```text
/// Filling → Active → Concluding → Closed
/// ```
///
/// - **Filling**: accepting connections until the player count is reached.
/// - **Active**: clock running, moles ticking, whacks accepted.
/// - **Concluding**: time is up. Moles and inbound duties are stopped and
///   outcomes computed.
/// - **Closed**: every outcome delivered and every connection closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Filling,
    Active,
    Concluding,
    Closed,
}

impl SessionState {
    /// Returns `true` while whacks are accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// The only state this one may move to, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Filling => Some(Self::Active),
            Self::Active => Some(Self::Concluding),
            Self::Concluding => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filling => write!(f, "Filling"),
            Self::Active => write!(f, "Active"),
            Self::Concluding => write!(f, "Concluding"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
