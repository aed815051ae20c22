//! The game session: whack resolution, broadcasting, and the
//! `Filling → Active → Concluding → Closed` run loop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use whack_board::{BoardObserver, BoardState, CellStatus, spawn_moles};
use whack_clock::SessionClock;
use whack_protocol::{CellId, ClientMessage, Codec, LineCodec, PlayerId, ServerMessage};
use whack_transport::Connection;

use crate::channel::run_inbound;
use crate::{
    Player, PlayerChannel, PlayerReport, PlayerSender, SessionConfig, SessionError,
    SessionReport, SessionState, decide_outcomes,
};

/// A player's attempt to lower a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhackRequest {
    pub cell: CellId,
    /// The id the request claims to come from.
    pub player: PlayerId,
}

impl From<ClientMessage> for WhackRequest {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Whack { cell, player } => Self { cell, player },
        }
    }
}

/// How a whack was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhackResult {
    /// `true` if this whack lowered a raised mole.
    pub hit: bool,
    /// The whacker's score afterwards.
    pub score: i32,
}

// ---------------------------------------------------------------------------
// SessionCore
// ---------------------------------------------------------------------------

/// State shared by the run loop, every mole actor, and every inbound duty.
pub(crate) struct SessionCore {
    config: SessionConfig,
    board: Arc<BoardState>,
    players: Box<[Player]>,
    state: Mutex<SessionState>,
}

impl SessionCore {
    /// Player `i` gets `senders[i]`.
    pub(crate) fn new(config: SessionConfig, senders: Vec<PlayerSender>) -> Self {
        let players = senders
            .into_iter()
            .enumerate()
            .map(|(i, tx)| Player::new(PlayerId(i as u32), tx))
            .collect();
        Self {
            board: Arc::new(BoardState::new(config.rows, config.cols)),
            config,
            players,
            state: Mutex::new(SessionState::Filling),
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.lock_state()
    }

    /// Moves to `target` if that's the next state. Returns whether it did.
    pub(crate) fn advance(&self, target: SessionState) -> bool {
        let mut state = self.lock_state();
        let current = *state;
        if !current.can_transition_to(target) {
            warn!(from = %current, to = %target, "invalid session transition");
            return false;
        }
        *state = target;
        info!(state = %target, "session state changed");
        true
    }

    /// Queues `msg` for every live player.
    pub(crate) fn broadcast(&self, msg: &ServerMessage) {
        for player in self.players.iter() {
            player.send(msg.clone());
        }
    }

    /// Resolves one whack from the connection owned by `from`.
    ///
    /// The read-and-lower is a single per-cell transition, so two players
    /// whacking the same raised mole can't both score. The `MOLE_DOWN`
    /// broadcast is queued before the cell's lock is released, which keeps
    /// it ordered against the owning mole's notifications.
    pub(crate) fn handle_whack(
        &self,
        from: PlayerId,
        req: WhackRequest,
    ) -> Result<WhackResult, SessionError> {
        if req.player != from {
            return Err(SessionError::PlayerMismatch {
                claimed: req.player,
                actual: from,
            });
        }
        let player = self.player(from);
        if !player.is_live() {
            return Err(SessionError::PlayerGone(from));
        }
        if !self.board.contains(req.cell) {
            return Err(SessionError::CellOutOfRange {
                cell: req.cell,
                cells: self.board.len(),
            });
        }
        let state = self.state();
        if !state.is_active() {
            return Err(SessionError::NotActive(state));
        }

        let previous = self.board.transition(req.cell, CellStatus::Lowered, |_| {
            self.broadcast(&ServerMessage::MoleDown(req.cell));
        });
        let hit = previous == CellStatus::Raised;
        let score = player.record_whack(hit, &self.config.scoring);

        self.broadcast(&ServerMessage::Score {
            score,
            player: Some(from),
        });
        Ok(WhackResult { hit, score })
    }

    /// Reports a rejected request to its sender.
    ///
    /// Returns `false` when the player has used up their error budget and
    /// has been disconnected.
    pub(crate) fn reject(&self, from: PlayerId, err: &SessionError) -> bool {
        match err {
            SessionError::NotActive(state) => {
                debug!(player_id = %from, %state, "whack outside active session ignored");
                return true;
            }
            SessionError::PlayerGone(_) => {
                debug!(player_id = %from, "request from a closed player dropped");
                return false;
            }
            _ => {}
        }
        let player = self.player(from);
        let errors = player.record_protocol_error();
        debug!(player_id = %from, error = %err, errors, "request rejected");
        if errors <= self.config.max_protocol_errors {
            player.send(ServerMessage::Error(err.to_string()));
            return true;
        }

        warn!(player_id = %from, errors, "protocol error limit exceeded, closing");
        player.send(ServerMessage::Error(format!("{err}; closing connection")));
        player.terminate();
        false
    }

    /// The player's connection is gone. Their score still counts.
    pub(crate) fn player_disconnected(&self, id: PlayerId, reason: &str) {
        let player = self.player(id);
        if player.terminate() {
            info!(player_id = %id, %reason, score = player.score(), "player left");
        }
    }

    pub(crate) fn is_live(&self, id: PlayerId) -> bool {
        self.player(id).is_live()
    }

    /// Ids come from the session's own channels, never from the wire.
    fn player(&self, id: PlayerId) -> &Player {
        &self.players[id.index()]
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BoardObserver for SessionCore {
    fn cell_changed(&self, cell: CellId, status: CellStatus) {
        let msg = match status {
            CellStatus::Raised => ServerMessage::MoleUp(cell),
            CellStatus::Lowered => ServerMessage::MoleDown(cell),
        };
        self.broadcast(&msg);
    }
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// One session, from the moment every player has joined until every
/// outcome has been delivered.
///
/// ```text
/// new()  ──→  run()
///              ├─ Active: moles + inbound duties, clock running
///              ├─ Concluding: moles stopped, inbound stopped, outcomes sent
///              └─ Closed: writers drained, report returned
/// ```
pub struct GameSession<C: Connection, K: Codec + Clone = LineCodec> {
    core: Arc<SessionCore>,
    readers: Vec<(PlayerId, C::Reader)>,
    writers: Vec<JoinHandle<()>>,
    codec: K,
    shutdown: CancellationToken,
}

impl<C: Connection, K: Codec + Clone> GameSession<C, K> {
    /// Builds a session over already-opened channels.
    ///
    /// There must be exactly `config.players` channels, carrying the ids
    /// `0..players` in any order.
    pub fn new(
        config: SessionConfig,
        mut channels: Vec<PlayerChannel<C>>,
        codec: K,
    ) -> Result<Self, SessionError> {
        let config = config.validated()?;
        if channels.len() != config.players as usize {
            return Err(SessionError::PlayerCount {
                expected: config.players,
                got: channels.len(),
            });
        }

        channels.sort_by_key(|ch| ch.player_id());
        let mut readers = Vec::with_capacity(channels.len());
        let mut senders = Vec::with_capacity(channels.len());
        let mut writers = Vec::with_capacity(channels.len());
        for (i, channel) in channels.into_iter().enumerate() {
            let id = channel.player_id();
            if id.index() != i {
                return Err(SessionError::InvalidConfig(format!(
                    "player ids must be 0..{}, found {id} in slot {i}",
                    config.players
                )));
            }
            let (reader, sender, writer) = channel.into_parts();
            readers.push((id, reader));
            senders.push(sender);
            writers.push(writer);
        }

        Ok(Self {
            core: Arc::new(SessionCore::new(config, senders)),
            readers,
            writers,
            codec,
            shutdown: CancellationToken::new(),
        })
    }

    /// The shared board. Moles and whacks both go through it.
    pub fn board(&self) -> &Arc<BoardState> {
        &self.core.board
    }

    pub fn state(&self) -> SessionState {
        self.core.state()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.core.config
    }

    /// A token that ends the session early when cancelled.
    ///
    /// Early shutdown goes through the normal conclusion: every live
    /// player still receives an outcome.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs the session to completion and returns its report.
    pub async fn run(self) -> SessionReport {
        let Self {
            core,
            readers,
            writers,
            codec,
            shutdown,
        } = self;

        core.advance(SessionState::Active);
        for player in core.players.iter() {
            player.enter_session();
        }
        let clock = SessionClock::start(core.config.duration());
        info!(
            rows = core.config.rows,
            cols = core.config.cols,
            cells = core.config.cells(),
            players = core.config.players,
            duration_ms = core.config.duration_ms,
            "session started"
        );

        let mole_cancel = shutdown.child_token();
        let mut moles = JoinSet::new();
        spawn_moles(&core.board, &core, &core.config.moles, &mole_cancel, &mut moles);

        let inbound_cancel = shutdown.child_token();
        let mut inbound = JoinSet::new();
        for (player_id, reader) in readers {
            inbound.spawn(run_inbound(
                player_id,
                reader,
                codec.clone(),
                Arc::clone(&core),
                inbound_cancel.clone(),
            ));
        }

        tokio::select! {
            _ = clock.expired() => {}
            _ = shutdown.cancelled() => {}
        }
        let ended_early = !clock.is_expired();
        if ended_early {
            info!(
                elapsed_ms = clock.elapsed().as_millis() as u64,
                remaining_ms = clock.remaining().as_millis() as u64,
                "session stopped early"
            );
        }
        core.advance(SessionState::Concluding);

        mole_cancel.cancel();
        let mut moles_raised = 0u64;
        while let Some(joined) = moles.join_next().await {
            match joined {
                Ok(stats) => moles_raised += u64::from(stats.raised),
                Err(e) => warn!(error = %e, "mole task failed"),
            }
        }

        inbound_cancel.cancel();
        while let Some(joined) = inbound.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "inbound task failed");
            }
        }

        let scores: Vec<i32> = core.players.iter().map(Player::score).collect();
        let outcomes = decide_outcomes(&scores);
        let mut reports = Vec::with_capacity(outcomes.len());
        for (player, outcome) in core.players.iter().zip(outcomes) {
            let connected = player.is_live();
            if connected {
                player.send(ServerMessage::Outcome(outcome));
            }
            player.terminate();
            debug!(player_id = %player.id(), score = player.score(), %outcome, connected, "outcome decided");
            reports.push(PlayerReport {
                player: player.id(),
                score: player.score(),
                outcome,
                connected,
                hits: player.hits(),
                misses: player.misses(),
            });
        }

        for writer in writers {
            if let Err(e) = writer.await {
                warn!(error = %e, "outbound task failed");
            }
        }
        core.advance(SessionState::Closed);

        let report = SessionReport {
            rows: core.config.rows,
            cols: core.config.cols,
            elapsed_ms: clock.elapsed().as_millis() as u64,
            ended_early,
            moles_raised,
            players: reports,
        };
        info!(winner = ?report.winner(), moles_raised, "session closed");
        report
    }
}
