//! Per-player session record: score, liveness, outbound queue.
//!
//! A player moves through three states and never comes back:
//!
//! ```text
//!   Connected ──(session starts)──→ InSession ──(channel closes)──→ Terminated
//!       │                                                              ↑
//!       └──────────────(channel closes before start)───────────────────┘
//! ```

use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use whack_protocol::{PlayerId, ServerMessage};

use crate::{PlayerSender, ScoringRules};

/// Where a player is in their lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Accepted and welcomed, waiting for the session to start.
    Connected,
    /// Playing.
    InSession,
    /// Channel closed, voluntarily, on error, or at session end.
    Terminated,
}

/// One player's record inside a running session.
///
/// The score is only written by the whack-resolution path for this
/// player. The outbound sender is dropped when the player terminates,
/// which lets their writer task flush and close the connection.
#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    score: AtomicI32,
    hits: AtomicU32,
    misses: AtomicU32,
    protocol_errors: AtomicU32,
    state: Mutex<PlayerState>,
    outbound: Mutex<Option<PlayerSender>>,
}

impl Player {
    pub(crate) fn new(id: PlayerId, outbound: PlayerSender) -> Self {
        Self {
            id,
            score: AtomicI32::new(0),
            hits: AtomicU32::new(0),
            misses: AtomicU32::new(0),
            protocol_errors: AtomicU32::new(0),
            state: Mutex::new(PlayerState::Connected),
            outbound: Mutex::new(Some(outbound)),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn score(&self) -> i32 {
        self.score.load(Ordering::Acquire)
    }

    /// Whacks that lowered a raised mole.
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Whacks against a lowered cell.
    pub fn misses(&self) -> u32 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> PlayerState {
        *lock(&self.state)
    }

    /// Whether the player can still receive messages.
    pub fn is_live(&self) -> bool {
        self.state() != PlayerState::Terminated
    }

    /// Applies one whack to the score and returns the new score.
    pub(crate) fn record_whack(&self, hit: bool, rules: &ScoringRules) -> i32 {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);

        let previous = self
            .score
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| Some(rules.apply(s, hit)))
            .unwrap_or_else(|s| s);
        rules.apply(previous, hit)
    }

    /// Counts one malformed request and returns the running total.
    pub(crate) fn record_protocol_error(&self) -> u32 {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Connected → InSession. No-op for a player who already left.
    pub(crate) fn enter_session(&self) {
        let mut state = lock(&self.state);
        if *state == PlayerState::Connected {
            *state = PlayerState::InSession;
        }
    }

    /// Queues a message for this player.
    ///
    /// Returns `false` if the player is gone. A failed send means the
    /// writer task has exited, so the player is terminated on the spot.
    pub(crate) fn send(&self, msg: ServerMessage) -> bool {
        let mut outbound = lock(&self.outbound);
        let Some(sender) = outbound.as_ref() else {
            return false;
        };
        if sender.send(msg).is_ok() {
            return true;
        }
        outbound.take();
        drop(outbound);
        self.mark_terminated();
        tracing::debug!(player_id = %self.id, "outbound closed, player terminated");
        false
    }

    /// Drops the outbound queue and marks the player terminated.
    ///
    /// Returns `true` only for the call that actually terminated the
    /// player. Messages already queued are still delivered.
    pub(crate) fn terminate(&self) -> bool {
        lock(&self.outbound).take();
        self.mark_terminated()
    }

    fn mark_terminated(&self) -> bool {
        let mut state = lock(&self.state);
        let was_live = *state != PlayerState::Terminated;
        *state = PlayerState::Terminated;
        was_live
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
