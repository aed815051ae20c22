//! Board state: a fixed array of per-cell locked statuses.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use whack_protocol::CellId;

/// Whether a mole is currently up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellStatus {
    Lowered,
    Raised,
}

impl fmt::Display for CellStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lowered => write!(f, "lowered"),
            Self::Raised => write!(f, "raised"),
        }
    }
}

/// Receives every committed cell transition.
///
/// Called with the cell's lock held: implementations must not block and
/// must not touch the same cell again.
pub trait BoardObserver: Send + Sync + 'static {
    fn cell_changed(&self, cell: CellId, status: CellStatus);
}

impl<F> BoardObserver for F
where
    F: Fn(CellId, CellStatus) + Send + Sync + 'static,
{
    fn cell_changed(&self, cell: CellId, status: CellStatus) {
        self(cell, status)
    }
}

/// The shared grid of cell statuses.
///
/// Created with every cell lowered. All operations are atomic with respect
/// to the cell they address; nothing is atomic across cells.
///
/// # Panics
///
/// Every method taking a [`CellId`] panics if the id is outside
/// `0..rows * cols`. Callers handling untrusted input check
/// [`contains`](Self::contains) first.
pub struct BoardState {
    rows: u32,
    cols: u32,
    cells: Box<[Mutex<CellStatus>]>,
}

impl BoardState {
    /// Creates a `rows x cols` board with every cell lowered.
    pub fn new(rows: u32, cols: u32) -> Self {
        let len = rows as usize * cols as usize;
        let cells = (0..len).map(|_| Mutex::new(CellStatus::Lowered)).collect();
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether `cell` addresses a cell on this board.
    pub fn contains(&self, cell: CellId) -> bool {
        cell.index() < self.cells.len()
    }

    /// Iterates over every cell id in index order.
    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> + use<> {
        (0..self.cells.len() as u32).map(CellId)
    }

    /// Current status of `cell`.
    pub fn get(&self, cell: CellId) -> CellStatus {
        *self.lock(cell)
    }

    /// Raises `cell`, returning the status it had before.
    pub fn try_set_raised(&self, cell: CellId) -> CellStatus {
        self.transition(cell, CellStatus::Raised, |_| {})
    }

    /// Lowers `cell`, returning the status it had before.
    ///
    /// A return of [`CellStatus::Raised`] means this call performed the
    /// lowering; concurrent callers all see `Lowered`.
    pub fn try_set_lowered(&self, cell: CellId) -> CellStatus {
        self.transition(cell, CellStatus::Lowered, |_| {})
    }

    /// Moves `cell` to `target` and returns the previous status.
    ///
    /// `on_commit` runs only when the status actually changed, and runs
    /// before the cell's lock is released.
    pub fn transition(
        &self,
        cell: CellId,
        target: CellStatus,
        on_commit: impl FnOnce(CellStatus),
    ) -> CellStatus {
        let mut status = self.lock(cell);
        let previous = *status;
        if previous != target {
            *status = target;
            on_commit(target);
        }
        previous
    }

    /// Copies every cell's status. Not atomic across cells.
    pub fn snapshot(&self) -> Vec<CellStatus> {
        self.cell_ids().map(|cell| self.get(cell)).collect()
    }

    /// Number of cells currently raised. Not atomic across cells.
    pub fn raised_count(&self) -> usize {
        self.cell_ids()
            .filter(|cell| self.get(*cell) == CellStatus::Raised)
            .count()
    }

    fn lock(&self, cell: CellId) -> MutexGuard<'_, CellStatus> {
        let Some(slot) = self.cells.get(cell.index()) else {
            panic!(
                "{cell} is outside the {}x{} board",
                self.rows, self.cols
            );
        };
        // The guarded value is a plain enum; a panicking holder can't leave
        // it half-written.
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardState")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("raised", &self.raised_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_new_board_is_all_lowered() {
        let board = BoardState::new(2, 3);
        assert_eq!(board.len(), 6);
        assert!(board.snapshot().iter().all(|s| *s == CellStatus::Lowered));
        assert_eq!(board.raised_count(), 0);
    }

    #[test]
    fn test_try_set_returns_previous_status() {
        let board = BoardState::new(2, 2);
        assert_eq!(board.try_set_raised(CellId(1)), CellStatus::Lowered);
        assert_eq!(board.try_set_raised(CellId(1)), CellStatus::Raised);
        assert_eq!(board.get(CellId(1)), CellStatus::Raised);
        assert_eq!(board.try_set_lowered(CellId(1)), CellStatus::Raised);
        assert_eq!(board.try_set_lowered(CellId(1)), CellStatus::Lowered);
    }

    #[test]
    fn test_transition_commit_hook_only_on_change() {
        let board = BoardState::new(1, 1);
        let mut commits = Vec::new();
        board.transition(CellId(0), CellStatus::Lowered, |s| commits.push(s));
        board.transition(CellId(0), CellStatus::Raised, |s| commits.push(s));
        board.transition(CellId(0), CellStatus::Raised, |s| commits.push(s));
        assert_eq!(commits, vec![CellStatus::Raised]);
    }

    #[test]
    fn test_cells_are_independent() {
        let board = BoardState::new(2, 2);
        board.try_set_raised(CellId(3));
        assert_eq!(board.get(CellId(0)), CellStatus::Lowered);
        assert_eq!(board.get(CellId(3)), CellStatus::Raised);
        assert_eq!(board.raised_count(), 1);
    }

    #[test]
    fn test_contains() {
        let board = BoardState::new(2, 2);
        assert!(board.contains(CellId(3)));
        assert!(!board.contains(CellId(4)));
    }

    #[test]
    #[should_panic(expected = "outside the 2x2 board")]
    fn test_out_of_range_cell_panics() {
        let board = BoardState::new(2, 2);
        board.get(CellId(4));
    }

    #[test]
    fn test_concurrent_lowering_has_exactly_one_winner() {
        // Many threads race to lower one raised cell; only one may see it up.
        for _ in 0..50 {
            let board = Arc::new(BoardState::new(1, 1));
            board.try_set_raised(CellId(0));
            let winners = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let board = Arc::clone(&board);
                    let winners = Arc::clone(&winners);
                    std::thread::spawn(move || {
                        if board.try_set_lowered(CellId(0)) == CellStatus::Raised {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }

            assert_eq!(winners.load(Ordering::SeqCst), 1);
            assert_eq!(board.get(CellId(0)), CellStatus::Lowered);
        }
    }
}
