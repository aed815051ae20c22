//! Game session engine for the whack-a-mole server.
//!
//! A session owns one board, one mole actor per cell, and one
//! [`PlayerChannel`] per player. It runs for a fixed duration, resolves
//! every whack against the board, keeps scores, and finally tells every
//! connected player whether they won, lost, or tied.
//!
//! # Key types
//!
//! - [`GameSession`]: runs one session from start to close
//! - [`PlayerChannel`]: a player's connection, split into inbound and
//!   outbound duties
//! - [`SessionConfig`] / [`ScoringRules`]: board size, duration, dwell
//!   times, score deltas
//! - [`SessionState`]: `Filling → Active → Concluding → Closed`
//! - [`SessionReport`]: final scores and outcomes
//!
//! # How it fits in the stack
//!
//! ```text
//! Orchestrator (above)  ← accepts players, builds one GameSession
//!     ↕
//! Session (this crate)  ← board, moles, scoring, outcomes
//!     ↕
//! Board / Clock / Protocol / Transport (below)
//! ```

mod channel;
mod config;
mod error;
mod player;
mod report;
mod scoring;
mod session;

pub use channel::{PlayerChannel, PlayerSender};
pub use config::{SessionConfig, SessionState};
pub use error::SessionError;
pub use player::{Player, PlayerState};
pub use report::{PlayerReport, SessionReport};
pub use scoring::{ScoringRules, decide_outcomes};
pub use session::{GameSession, WhackRequest, WhackResult};
