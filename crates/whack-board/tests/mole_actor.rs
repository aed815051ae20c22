//! Integration tests for mole actors.
//!
//! Runs under paused Tokio time: dwell sleeps resolve in virtual time and
//! fixed one-millisecond-wide ranges make every dwell exact.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use whack_board::{BoardObserver, BoardState, CellStatus, MoleActor, spawn_moles};
use whack_clock::{DwellRange, MoleTimings};
use whack_protocol::CellId;

// =========================================================================
// Helpers
// =========================================================================

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<(CellId, CellStatus)>>,
}

impl Recorder {
    fn events(&self) -> Vec<(CellId, CellStatus)> {
        self.events.lock().unwrap().clone()
    }
}

impl BoardObserver for Recorder {
    fn cell_changed(&self, cell: CellId, status: CellStatus) {
        self.events.lock().unwrap().push((cell, status));
    }
}

/// Down for exactly `down` ms, up for exactly `up` ms.
fn exact(down: u64, up: u64) -> MoleTimings {
    MoleTimings {
        down: DwellRange::from_millis(down, down + 1),
        up: DwellRange::from_millis(up, up + 1),
        seed: Some(1),
    }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

struct Fixture {
    board: Arc<BoardState>,
    recorder: Arc<Recorder>,
    cancel: CancellationToken,
}

impl Fixture {
    fn new() -> Self {
        Self {
            board: Arc::new(BoardState::new(1, 1)),
            recorder: Arc::new(Recorder::default()),
            cancel: CancellationToken::new(),
        }
    }

    fn spawn(&self, timings: MoleTimings) -> tokio::task::JoinHandle<whack_board::MoleStats> {
        let actor = MoleActor::new(
            CellId(0),
            Arc::clone(&self.board),
            Arc::clone(&self.recorder),
            &timings,
            self.cancel.clone(),
        );
        tokio::spawn(actor.run())
    }
}

// =========================================================================
// Timer-driven transitions
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_mole_raises_after_down_dwell_then_lowers() {
    let fx = Fixture::new();
    let handle = fx.spawn(exact(100, 50));

    sleep_ms(99).await;
    assert_eq!(fx.board.get(CellId(0)), CellStatus::Lowered);
    assert!(fx.recorder.events().is_empty());

    sleep_ms(21).await; // t = 120
    assert_eq!(fx.board.get(CellId(0)), CellStatus::Raised);
    assert_eq!(fx.recorder.events(), vec![(CellId(0), CellStatus::Raised)]);

    sleep_ms(40).await; // t = 160, lowered at 150
    assert_eq!(fx.board.get(CellId(0)), CellStatus::Lowered);
    assert_eq!(
        fx.recorder.events(),
        vec![(CellId(0), CellStatus::Raised), (CellId(0), CellStatus::Lowered)]
    );

    fx.cancel.cancel();
    let stats = handle.await.unwrap();
    assert_eq!(stats.raised, 1);
    // Already down when cancelled: no extra notification.
    assert_eq!(fx.recorder.events().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_mole_keeps_cycling_until_cancelled() {
    let fx = Fixture::new();
    let handle = fx.spawn(exact(30, 20));

    // Each cycle is 50ms; after 260ms five raises have happened.
    sleep_ms(260).await;
    fx.cancel.cancel();
    let stats = handle.await.unwrap();
    assert_eq!(stats.raised, 5);
    assert_eq!(fx.board.get(CellId(0)), CellStatus::Lowered);
}

// =========================================================================
// Cancellation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_while_raised_lowers_with_one_notification() {
    let fx = Fixture::new();
    let handle = fx.spawn(exact(100, 1_000));

    sleep_ms(150).await;
    assert_eq!(fx.board.get(CellId(0)), CellStatus::Raised);

    fx.cancel.cancel();
    handle.await.unwrap();

    assert_eq!(fx.board.get(CellId(0)), CellStatus::Lowered);
    assert_eq!(
        fx.recorder.events(),
        vec![(CellId(0), CellStatus::Raised), (CellId(0), CellStatus::Lowered)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_down_dwell_emits_nothing() {
    let fx = Fixture::new();
    let handle = fx.spawn(exact(1_000, 100));

    sleep_ms(10).await;
    fx.cancel.cancel();
    let stats = handle.await.unwrap();

    assert_eq!(stats.raised, 0);
    assert_eq!(fx.board.get(CellId(0)), CellStatus::Lowered);
    assert!(fx.recorder.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_sleep_immediately() {
    let fx = Fixture::new();
    let handle = fx.spawn(exact(60_000, 60_000));

    sleep_ms(5).await;
    let before = tokio::time::Instant::now();
    fx.cancel.cancel();
    handle.await.unwrap();
    assert_eq!(tokio::time::Instant::now(), before);
}

// =========================================================================
// Racing a player
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_timer_lowering_is_silent_after_a_whack() {
    let fx = Fixture::new();
    let handle = fx.spawn(exact(100, 50));

    sleep_ms(120).await;
    // A player got there first.
    assert_eq!(fx.board.try_set_lowered(CellId(0)), CellStatus::Raised);

    sleep_ms(40).await; // the actor's own lowering at t = 150 finds it down
    assert_eq!(fx.recorder.events(), vec![(CellId(0), CellStatus::Raised)]);

    fx.cancel.cancel();
    handle.await.unwrap();
    assert_eq!(fx.recorder.events().len(), 1);
}

// =========================================================================
// spawn_moles
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_spawn_moles_covers_every_cell() {
    let board = Arc::new(BoardState::new(2, 3));
    let recorder = Arc::new(Recorder::default());
    let cancel = CancellationToken::new();
    let mut set = JoinSet::new();

    spawn_moles(&board, &recorder, &exact(10, 1_000), &cancel, &mut set);
    assert_eq!(set.len(), 6);

    sleep_ms(20).await;
    assert_eq!(board.raised_count(), 6);

    cancel.cancel();
    let mut cells = Vec::new();
    while let Some(res) = set.join_next().await {
        cells.push(res.unwrap().cell);
    }
    cells.sort();
    assert_eq!(cells, (0..6).map(CellId).collect::<Vec<_>>());
    assert_eq!(board.raised_count(), 0);

    // One raise and one forced lowering per cell.
    assert_eq!(recorder.events().len(), 12);
}
