//! Score deltas and winner determination.

use serde::{Deserialize, Serialize};
use whack_protocol::Outcome;

/// How a whack changes the whacker's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    /// Added for lowering a raised mole.
    pub hit_reward: i32,

    /// Subtracted for whacking a lowered cell.
    pub miss_penalty: i32,

    /// Floor scores at zero. Off by default: scores may go negative.
    pub clamp_at_zero: bool,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            hit_reward: 2,
            miss_penalty: 1,
            clamp_at_zero: false,
        }
    }
}

impl ScoringRules {
    /// The score after one whack.
    pub fn apply(&self, score: i32, hit: bool) -> i32 {
        if hit {
            score.saturating_add(self.hit_reward)
        } else {
            let lowered = score.saturating_sub(self.miss_penalty);
            if self.clamp_at_zero { lowered.max(0) } else { lowered }
        }
    }
}

/// Decides every player's outcome from the final scores.
///
/// `scores[i]` is player `i`'s score. A unique maximum wins and everyone
/// else loses. When several players share the maximum they all tie and
/// everyone else loses.
pub fn decide_outcomes(scores: &[i32]) -> Vec<Outcome> {
    let Some(&best) = scores.iter().max() else {
        return Vec::new();
    };
    let leaders = scores.iter().filter(|&&s| s == best).count();
    let top = if leaders == 1 {
        Outcome::Won
    } else {
        Outcome::Tied
    };
    scores
        .iter()
        .map(|&s| if s == best { top } else { Outcome::Lost })
        .collect()
}
