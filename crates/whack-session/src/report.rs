//! Final session results.

use serde::{Deserialize, Serialize};
use whack_protocol::{Outcome, PlayerId};

/// One player's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerReport {
    pub player: PlayerId,
    pub score: i32,
    pub outcome: Outcome,
    /// Still connected when the session concluded. Only connected
    /// players were sent their outcome.
    pub connected: bool,
    pub hits: u32,
    pub misses: u32,
}

/// What a finished session returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub rows: u32,
    pub cols: u32,
    /// Time from start to conclusion.
    pub elapsed_ms: u64,
    /// Shutdown concluded the session before its duration ran out.
    pub ended_early: bool,
    /// Total raises across every mole.
    pub moles_raised: u64,
    /// Ordered by player id.
    pub players: Vec<PlayerReport>,
}

impl SessionReport {
    /// The sole winner, if there is one.
    pub fn winner(&self) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| p.outcome == Outcome::Won)
            .map(|p| p.player)
    }

    /// Returns `true` when the top score was shared.
    pub fn is_tie(&self) -> bool {
        self.players.iter().any(|p| p.outcome == Outcome::Tied)
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerReport> {
        self.players.get(id.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: &[(i32, Outcome)]) -> SessionReport {
        SessionReport {
            rows: 2,
            cols: 2,
            elapsed_ms: 1_000,
            ended_early: false,
            moles_raised: 0,
            players: outcomes
                .iter()
                .enumerate()
                .map(|(i, &(score, outcome))| PlayerReport {
                    player: PlayerId(i as u32),
                    score,
                    outcome,
                    connected: true,
                    hits: 0,
                    misses: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_winner_is_the_won_player() {
        let r = report(&[(1, Outcome::Lost), (4, Outcome::Won)]);
        assert_eq!(r.winner(), Some(PlayerId(1)));
        assert!(!r.is_tie());
    }

    #[test]
    fn test_tie_has_no_winner() {
        let r = report(&[(2, Outcome::Tied), (2, Outcome::Tied), (0, Outcome::Lost)]);
        assert_eq!(r.winner(), None);
        assert!(r.is_tie());
    }

    #[test]
    fn test_report_serializes_outcomes_lowercase() {
        let r = report(&[(4, Outcome::Won)]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["players"][0]["outcome"], "won");
        assert_eq!(json["players"][0]["player"], 0);
        assert_eq!(json["elapsed_ms"], 1_000);
    }
}
