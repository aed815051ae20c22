//! The shared mole board and the actors that drive it.
//!
//! - [`BoardState`]: the single source of truth for which cells are up.
//!   Every cell has its own lock; there is no board-wide lock.
//! - [`MoleActor`]: one cancellable task per cell that alternates the
//!   cell between lowered and raised on randomized dwell times.
//! - [`BoardObserver`]: receives a callback for every committed change.
//!
//! # Notification ordering
//!
//! Observers are called while the cell's lock is still held, so the order
//! in which observers see changes to one cell is exactly the order in
//! which those changes were committed. A transition that doesn't change the
//! status (lowering an already-lowered cell) produces no callback.

mod board;
mod mole;

pub use board::{BoardObserver, BoardState, CellStatus};
pub use mole::{MoleActor, MoleStats, spawn_moles};
