//! Mole actor: one cancellable timing task per cell.
//!
//! Each actor owns timing authority over exactly one cell. It sleeps for a
//! lowered dwell, raises the cell, sleeps for a raised dwell, lowers it, and
//! repeats until cancelled. A player may lower the cell in between; the
//! actor's own lowering then finds the cell already down and stays silent.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use whack_clock::MoleTimings;
use whack_protocol::CellId;

use crate::{BoardObserver, BoardState, CellStatus};

/// What one actor did over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoleStats {
    pub cell: CellId,
    /// Times the actor raised its cell.
    pub raised: u32,
}

/// The timing actor for a single cell.
pub struct MoleActor<O: BoardObserver> {
    cell: CellId,
    board: Arc<BoardState>,
    observer: Arc<O>,
    timings: MoleTimings,
    rng: StdRng,
    cancel: CancellationToken,
}

impl<O: BoardObserver> MoleActor<O> {
    pub fn new(
        cell: CellId,
        board: Arc<BoardState>,
        observer: Arc<O>,
        timings: &MoleTimings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            cell,
            board,
            observer,
            rng: timings.rng_for(cell.0),
            timings: timings.clone(),
            cancel,
        }
    }

    /// Runs until the cancellation token fires.
    ///
    /// On cancellation the cell is forced down. That emits one final
    /// lowered notification if the cell was up, and nothing otherwise.
    pub async fn run(mut self) -> MoleStats {
        let mut stats = MoleStats {
            cell: self.cell,
            raised: 0,
        };

        loop {
            let down = self.timings.down.sample(&mut self.rng);
            if !self.dwell(down).await {
                break;
            }
            if self.set(CellStatus::Raised) {
                stats.raised += 1;
            }

            let up = self.timings.up.sample(&mut self.rng);
            if !self.dwell(up).await {
                break;
            }
            self.set(CellStatus::Lowered);
        }

        self.set(CellStatus::Lowered);
        trace!(cell = %self.cell, raised = stats.raised, "mole stopped");
        stats
    }

    /// Sleeps for `dwell`. Returns `false` if cancelled first.
    async fn dwell(&self, dwell: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(dwell) => true,
        }
    }

    /// Moves the cell to `target`, notifying only on an actual change.
    fn set(&self, target: CellStatus) -> bool {
        let observer = &self.observer;
        let cell = self.cell;
        let previous = self.board.transition(cell, target, |status| {
            trace!(%cell, %status, "mole moved");
            observer.cell_changed(cell, status);
        });
        previous != target
    }
}

/// Spawns one actor per board cell into `set`, all sharing `cancel`.
pub fn spawn_moles<O: BoardObserver>(
    board: &Arc<BoardState>,
    observer: &Arc<O>,
    timings: &MoleTimings,
    cancel: &CancellationToken,
    set: &mut JoinSet<MoleStats>,
) {
    for cell in board.cell_ids() {
        let actor = MoleActor::new(
            cell,
            Arc::clone(board),
            Arc::clone(observer),
            timings,
            cancel.clone(),
        );
        set.spawn(actor.run());
    }
}
