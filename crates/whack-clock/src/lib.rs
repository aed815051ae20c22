//! Timing primitives for the whack-a-mole server.
//!
//! Two kinds of time drive a session:
//!
//! - **Dwell times**: how long a mole stays lowered or raised. Each mole
//!   draws its next dwell uniformly from a [`DwellRange`]; the pair of
//!   ranges lives in [`MoleTimings`].
//! - **The session deadline**: a single [`SessionClock`] the session's
//!   control task sleeps on until the configured duration has elapsed.
//!
//! # Integration
//!
//! A mole actor races its dwell sleep against cancellation:
//!
//! ```ignore
//! let dwell = timings.down.sample(&mut rng);
//! tokio::select! {
//!     _ = cancel.cancelled() => break,
//!     _ = tokio::time::sleep(dwell) => { /* raise the mole */ }
//! }
//! ```

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// DwellRange
// ---------------------------------------------------------------------------

/// A half-open range `[min, max)` of dwell times, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwellRange {
    /// Shortest dwell (inclusive).
    pub min_ms: u64,
    /// Longest dwell (exclusive).
    pub max_ms: u64,
}

impl DwellRange {
    /// A range expressed in milliseconds.
    pub const fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range expressed in whole seconds.
    pub const fn from_secs(min: u64, max: u64) -> Self {
        Self::from_millis(min * 1_000, max * 1_000)
    }

    /// Fix an empty or inverted range so sampling is always defined.
    ///
    /// `max_ms` is raised to `min_ms + 1`, which pins every sample to
    /// `min_ms`.
    pub fn validated(mut self, name: &str) -> Self {
        if self.max_ms <= self.min_ms {
            warn!(
                range = name,
                min_ms = self.min_ms,
                max_ms = self.max_ms,
                "empty dwell range, pinning to min"
            );
            self.max_ms = self.min_ms + 1;
        }
        self
    }

    /// Draws a dwell uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let ms = if self.max_ms > self.min_ms {
            rng.random_range(self.min_ms..self.max_ms)
        } else {
            self.min_ms
        };
        Duration::from_millis(ms)
    }

    /// Expected value of [`sample`](Self::sample).
    pub fn mean(&self) -> Duration {
        let span = self.max_ms.saturating_sub(self.min_ms).saturating_sub(1);
        Duration::from_millis(self.min_ms) + Duration::from_millis(span) / 2
    }
}

// ---------------------------------------------------------------------------
// MoleTimings
// ---------------------------------------------------------------------------

/// Dwell configuration shared by every mole on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoleTimings {
    /// How long a mole stays lowered before popping up.
    pub down: DwellRange,
    /// How long a mole stays raised before dropping on its own.
    pub up: DwellRange,
    /// Fixed RNG seed. `None` seeds each mole from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for MoleTimings {
    fn default() -> Self {
        Self {
            down: DwellRange::from_secs(3, 8),
            up: DwellRange::from_secs(2, 5),
            seed: None,
        }
    }
}

impl MoleTimings {
    /// Clamp both ranges and flag boards that would be mostly raised.
    ///
    /// Down-time should exceed up-time on average so fewer cells are up
    /// than down at any instant. Breaking that only skews the game, so it
    /// is logged rather than rejected.
    pub fn validated(mut self) -> Self {
        self.down = self.down.validated("down");
        self.up = self.up.validated("up");
        if self.up.mean() >= self.down.mean() {
            warn!(
                up_mean_ms = self.up.mean().as_millis() as u64,
                down_mean_ms = self.down.mean().as_millis() as u64,
                "moles stay up at least as long as they stay down"
            );
        }
        self
    }

    /// Builds the RNG for one mole.
    ///
    /// With a fixed seed every cell gets its own deterministic stream.
    pub fn rng_for(&self, cell: u32) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ u64::from(cell).rotate_left(32)),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionClock
// ---------------------------------------------------------------------------

/// The session's single deadline.
///
/// Uses Tokio's clock so tests can run under `tokio::time::pause()`.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    started: Instant,
    duration: Duration,
}

impl SessionClock {
    /// Starts the clock now.
    pub fn start(duration: Duration) -> Self {
        debug!(duration_ms = duration.as_millis() as u64, "session clock started");
        Self {
            started: Instant::now(),
            duration,
        }
    }

    /// The configured session length.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The instant at which the session expires.
    pub fn deadline(&self) -> Instant {
        self.started + self.duration
    }

    /// Time since [`start`](Self::start).
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the deadline, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.deadline().saturating_duration_since(Instant::now())
    }

    /// Whether `elapsed >= duration`.
    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.duration
    }

    /// Sleeps until the deadline. Returns immediately if already expired.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.deadline()).await;
    }
}
