//! Player channels: one connection split into an outbound and an inbound
//! duty.
//!
//! The outbound duty starts as soon as the channel is opened, so the
//! orchestrator can greet a player before the session exists. The inbound
//! duty starts only when the session goes active.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use whack_protocol::{Codec, PlayerId, ServerMessage};
use whack_transport::{Connection, ConnectionId, LineReader, LineWriter};

use crate::session::SessionCore;
use crate::SessionError;

/// Channel sender for delivering outbound messages to a player.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// A player's connection, with its writer already running.
pub struct PlayerChannel<C: Connection> {
    player_id: PlayerId,
    conn_id: ConnectionId,
    peer: SocketAddr,
    reader: C::Reader,
    outbound: PlayerSender,
    writer: JoinHandle<()>,
}

impl<C: Connection> PlayerChannel<C> {
    /// Splits `conn` and spawns its outbound duty.
    ///
    /// Messages pushed through [`send`](Self::send) are encoded with
    /// `codec` and written in push order. The writer closes the connection
    /// after a terminal message, or once every sender is gone.
    pub fn open<K: Codec>(player_id: PlayerId, conn: C, codec: K) -> Self {
        let conn_id = conn.id();
        let peer = conn.peer_addr();
        let (reader, writer) = conn.split();
        let (outbound, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_outbound(player_id, writer, rx, codec));

        debug!(%player_id, %conn_id, %peer, "player channel opened");
        Self {
            player_id,
            conn_id,
            peer,
            reader,
            outbound,
            writer,
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Queues a message. Returns `false` if the writer has already exited.
    pub fn send(&self, msg: ServerMessage) -> bool {
        self.outbound.send(msg).is_ok()
    }

    pub(crate) fn into_parts(self) -> (C::Reader, PlayerSender, JoinHandle<()>) {
        (self.reader, self.outbound, self.writer)
    }
}

// ---------------------------------------------------------------------------
// Outbound duty
// ---------------------------------------------------------------------------

async fn run_outbound<W: LineWriter, K: Codec>(
    player_id: PlayerId,
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    codec: K,
) {
    while let Some(msg) = rx.recv().await {
        let line = codec.encode_server(&msg);
        if let Err(e) = writer.send_line(&line).await {
            warn!(%player_id, error = %e, "send failed, closing outbound");
            break;
        }
        if msg.is_terminal() {
            break;
        }
    }

    // Anything still queued after a terminal message is dropped with rx.
    if let Err(e) = writer.close().await {
        debug!(%player_id, error = %e, "close failed");
    }
    debug!(%player_id, "outbound closed");
}

// ---------------------------------------------------------------------------
// Inbound duty
// ---------------------------------------------------------------------------

/// Reads whack requests until the connection ends, the player is closed,
/// or `cancel` fires.
///
/// Each decoded request goes to the session unmodified. Rejections,
/// including lines the transport couldn't read, are handed back to the
/// session, which decides whether the player keeps their connection.
pub(crate) async fn run_inbound<R: LineReader, K: Codec>(
    player_id: PlayerId,
    mut reader: R,
    codec: K,
    core: Arc<SessionCore>,
    cancel: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            received = reader.recv_line() => received,
        };

        let result = match received {
            Ok(Some(line)) => codec
                .decode_client(&line)
                .map_err(SessionError::from)
                .and_then(|msg| core.handle_whack(player_id, msg.into())),
            Ok(None) => {
                core.player_disconnected(player_id, "connection closed");
                return;
            }
            Err(e) if e.is_recoverable() => Err(SessionError::Unreadable(e)),
            Err(e) => {
                core.player_disconnected(player_id, &e.to_string());
                return;
            }
        };

        match result {
            Ok(outcome) => {
                debug!(%player_id, hit = outcome.hit, score = outcome.score, "whack resolved");
            }
            Err(e) => {
                if !core.reject(player_id, &e) {
                    return;
                }
            }
        }

        // The writer may have failed since the last line.
        if !core.is_live(player_id) {
            debug!(%player_id, "player closed, inbound stopping");
            return;
        }
    }
}
