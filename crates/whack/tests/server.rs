//! Integration tests for the orchestrator: accept, welcome, play, conclude.

use std::collections::HashSet;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use whack::prelude::*;
use whack::transport::{TcpLineReader, TcpLineWriter};

// =========================================================================
// Helpers
// =========================================================================

const LINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Moles pop up quickly and stay up longer than any session here, so a
/// raised mole is still raised when a client's whack arrives.
fn config(players: u32, duration_ms: u64) -> SessionConfig {
    let mut config = SessionConfig::new(2, 2, players, Duration::from_millis(duration_ms));
    config.moles = MoleTimings {
        down: DwellRange::from_millis(20, 60),
        up: DwellRange::from_secs(30, 31),
        seed: Some(42),
    };
    config
}

struct Client {
    reader: TcpLineReader,
    writer: TcpLineWriter,
}

impl Client {
    async fn connect(addr: &str) -> Self {
        let conn = TcpLineConnection::connect(addr).await.expect("connect");
        let (reader, writer) = conn.split();
        Self { reader, writer }
    }

    async fn recv(&mut self) -> Option<ServerMessage> {
        let line = tokio::time::timeout(LINE_TIMEOUT, self.reader.recv_line())
            .await
            .expect("timed out waiting for a line")
            .expect("recv");
        line.map(|l| LineCodec.decode_server(&l).expect("decodable line"))
    }

    async fn whack(&mut self, cell: CellId, player: PlayerId) {
        let line = LineCodec.encode_client(&ClientMessage::Whack { cell, player });
        self.writer.send_line(&line).await.expect("send");
    }
}

async fn tcp_server(config: SessionConfig) -> (WhackServer<TcpLineTransport>, String) {
    let server = WhackServer::builder()
        .bind("127.0.0.1:0")
        .config(config)
        .build_tcp()
        .await
        .expect("build");
    let addr = server.local_addr().expect("local addr").to_string();
    (server, addr)
}

// =========================================================================
// Full session over TCP
// =========================================================================

#[tokio::test]
async fn test_players_get_sequential_ids_in_welcome() {
    let (mut server, addr) = tcp_server(config(2, 300)).await;
    let running = tokio::spawn(async move { server.run_session().await });

    let mut first = Client::connect(&addr).await;
    assert_eq!(
        first.recv().await,
        Some(ServerMessage::Welcome {
            rows: 2,
            cols: 2,
            players: 2,
            player_id: PlayerId(0),
        })
    );

    let mut second = Client::connect(&addr).await;
    assert_eq!(
        second.recv().await,
        Some(ServerMessage::Welcome {
            rows: 2,
            cols: 2,
            players: 2,
            player_id: PlayerId(1),
        })
    );

    let report = running.await.expect("task").expect("session");
    assert_eq!(report.players.len(), 2);
    assert!(report.moles_raised > 0);
}

#[tokio::test]
async fn test_whacking_raised_moles_wins() {
    let (mut server, addr) = tcp_server(config(2, 1_500)).await;
    let running = tokio::spawn(async move { server.run_session().await });

    let mut whacker = Client::connect(&addr).await;
    assert!(matches!(whacker.recv().await, Some(ServerMessage::Welcome { .. })));
    let mut idle = Client::connect(&addr).await;
    assert!(matches!(idle.recv().await, Some(ServerMessage::Welcome { .. })));

    // Whack the first two distinct moles that come up.
    let mut whacked = HashSet::new();
    let mut scores = Vec::new();
    let whacker_outcome = loop {
        match whacker.recv().await.expect("outcome before close") {
            ServerMessage::MoleUp(cell) if whacked.len() < 2 && whacked.insert(cell) => {
                whacker.whack(cell, PlayerId(0)).await;
            }
            ServerMessage::Score {
                score,
                player: Some(PlayerId(0)),
            } => scores.push(score),
            ServerMessage::Outcome(outcome) => break outcome,
            _ => {}
        }
    };
    assert_eq!(scores, vec![2, 4]);
    assert_eq!(whacker_outcome, Outcome::Won);

    let idle_outcome = loop {
        if let ServerMessage::Outcome(outcome) = idle.recv().await.expect("outcome") {
            break outcome;
        }
    };
    assert_eq!(idle_outcome, Outcome::Lost);

    let report = running.await.expect("task").expect("session");
    assert_eq!(report.winner(), Some(PlayerId(0)));
    assert_eq!(report.player(PlayerId(0)).expect("p0").hits, 2);
    assert_eq!(report.player(PlayerId(1)).expect("p1").score, 0);
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let result = WhackServer::builder()
        .bind("127.0.0.1:0")
        .config(SessionConfig::new(0, 0, 2, Duration::from_secs(1)))
        .build_tcp()
        .await;
    assert!(matches!(result, Err(WhackError::Session(_))));
}

#[tokio::test]
async fn test_shutdown_while_filling_notifies_joined_players() {
    let (mut server, addr) = tcp_server(config(2, 1_000)).await;
    let shutdown = server.shutdown_token();
    let running = tokio::spawn(async move { server.run_session().await });

    let mut early = Client::connect(&addr).await;
    assert!(matches!(early.recv().await, Some(ServerMessage::Welcome { .. })));

    shutdown.cancel();
    assert!(matches!(early.recv().await, Some(ServerMessage::Error(_))));
    assert_eq!(early.recv().await, None);

    let result = running.await.expect("task");
    assert!(matches!(result, Err(WhackError::Shutdown)));
}

#[tokio::test]
async fn test_shutdown_mid_session_still_delivers_outcomes() {
    let (mut server, addr) = tcp_server(config(1, 60_000)).await;
    let shutdown = server.shutdown_token();
    let running = tokio::spawn(async move { server.run_session().await });

    let mut only = Client::connect(&addr).await;
    assert!(matches!(only.recv().await, Some(ServerMessage::Welcome { .. })));
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let outcome = loop {
        if let ServerMessage::Outcome(outcome) = only.recv().await.expect("outcome") {
            break outcome;
        }
    };
    assert_eq!(outcome, Outcome::Won);

    let report = running.await.expect("task").expect("session");
    assert!(report.ended_early);
    assert!(report.elapsed_ms < 60_000);
}

// =========================================================================
// WebSocket
// =========================================================================

#[tokio::test]
async fn test_websocket_session_speaks_the_same_lines() {
    let mut server = WhackServer::builder()
        .bind("127.0.0.1:0")
        .config(config(1, 400))
        .build_websocket()
        .await
        .expect("build");
    let addr = server.local_addr().expect("local addr");
    let running = tokio::spawn(async move { server.run_session().await });

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("connect");

    let mut frames: Vec<String> = Vec::new();
    let mut whacked = false;
    while let Some(frame) = tokio::time::timeout(LINE_TIMEOUT, ws.next())
        .await
        .expect("timed out waiting for a frame")
    {
        match frame.expect("frame") {
            Message::Text(text) => {
                let text = text.as_str().to_owned();
                let done = text.starts_with("GAME_");
                if let Some(cell) = text.strip_prefix("MOLE_UP ").filter(|_| !whacked) {
                    ws.send(Message::Text(format!("WHACK {cell} 0").into()))
                        .await
                        .expect("send");
                    whacked = true;
                }
                frames.push(text);
                if done {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    assert_eq!(frames.first().map(String::as_str), Some("WELCOME 2 2 1 0"));
    assert!(frames.iter().any(|f| f == "SCORE 2 0"), "frames: {frames:?}");
    assert_eq!(frames.last().map(String::as_str), Some("GAME_WON"));

    let report = running.await.expect("task").expect("session");
    assert_eq!(report.player(PlayerId(0)).expect("p0").hits, 1);
}
