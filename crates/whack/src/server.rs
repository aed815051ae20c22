//! `WhackServer` builder and the session orchestrator.
//!
//! The server ties the layers together: it accepts connections on a
//! transport, greets each player, and once the configured number have
//! joined hands them all to a [`GameSession`].

use std::net::SocketAddr;
use std::path::Path;

use tokio_util::sync::CancellationToken;
use whack_protocol::{Codec, LineCodec, PlayerId, ServerMessage};
use whack_session::{GameSession, PlayerChannel, SessionConfig, SessionReport};
use whack_transport::{Connection, TcpLineTransport, Transport, WebSocketTransport};

use crate::WhackError;

/// Reads a [`SessionConfig`] from a JSON file.
///
/// Fields missing from the file keep their defaults.
pub fn load_config(path: &Path) -> Result<SessionConfig, WhackError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Builder for configuring and starting a whack server.
///
/// # Example
///
/// ```rust,no_run
/// use whack::prelude::*;
///
/// # async fn example() -> Result<(), WhackError> {
/// let mut server = WhackServer::builder()
///     .bind("0.0.0.0:5000")
///     .config(SessionConfig::default())
///     .build_tcp()
///     .await?;
/// let report = server.run_session().await?;
/// println!("winner: {:?}", report.winner());
/// # Ok(())
/// # }
/// ```
pub struct WhackServerBuilder {
    bind_addr: String,
    config: SessionConfig,
}

impl WhackServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            config: SessionConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds a raw TCP listener: one message per `\n`-terminated line.
    pub async fn build_tcp(self) -> Result<WhackServer<TcpLineTransport>, WhackError> {
        let config = self.config.validated()?;
        let transport = TcpLineTransport::bind(&self.bind_addr)
            .await?
            .with_max_line_len(config.max_line_len);
        Ok(WhackServer::new(transport, config, LineCodec))
    }

    /// Binds a WebSocket listener: one message per text frame.
    pub async fn build_websocket(self) -> Result<WhackServer<WebSocketTransport>, WhackError> {
        let config = self.config.validated()?;
        let transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_max_line_len(config.max_line_len);
        Ok(WhackServer::new(transport, config, LineCodec))
    }
}

impl Default for WhackServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound whack server.
///
/// Call [`run_session()`](Self::run_session) to fill and play one session.
pub struct WhackServer<T: Transport, K: Codec + Clone = LineCodec> {
    transport: T,
    config: SessionConfig,
    codec: K,
    shutdown: CancellationToken,
}

impl WhackServer<TcpLineTransport> {
    /// Creates a new builder.
    pub fn builder() -> WhackServerBuilder {
        WhackServerBuilder::new()
    }
}

impl<T: Transport, K: Codec + Clone> WhackServer<T, K> {
    /// Wraps an already-bound transport.
    pub fn new(transport: T, config: SessionConfig, codec: K) -> Self {
        Self {
            transport,
            config,
            codec,
            shutdown: CancellationToken::new(),
        }
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A token that stops the server when cancelled.
    ///
    /// While filling, pending players get an `ERROR` and
    /// [`run_session`](Self::run_session) returns [`WhackError::Shutdown`].
    /// Once the session is running it concludes early and every connected
    /// player still receives an outcome.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Accepts exactly `config.players` players and plays one session.
    ///
    /// Each accepted connection gets the next sequential player id and a
    /// `WELCOME` line straight away. The session starts the moment the
    /// last player joins. Failed accepts are logged and skipped.
    pub async fn run_session(&mut self) -> Result<SessionReport, WhackError> {
        let players = self.config.players;
        tracing::info!(
            addr = ?self.local_addr().ok(),
            players,
            rows = self.config.rows,
            cols = self.config.cols,
            "waiting for players"
        );

        let mut channels: Vec<PlayerChannel<T::Connection>> = Vec::with_capacity(players as usize);
        while channels.len() < players as usize {
            let accepted = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    abandon(channels);
                    return Err(WhackError::Shutdown);
                }
                accepted = self.transport.accept() => accepted,
            };
            let conn = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                    continue;
                }
            };

            let player_id = PlayerId(channels.len() as u32);
            let peer = conn.peer_addr();
            let channel = PlayerChannel::open(player_id, conn, self.codec.clone());
            channel.send(ServerMessage::Welcome {
                rows: self.config.rows,
                cols: self.config.cols,
                players,
                player_id,
            });
            channels.push(channel);
            tracing::info!(%player_id, %peer, joined = channels.len(), players, "player joined");
        }

        let session = GameSession::new(self.config.clone(), channels, self.codec.clone())?;
        let session_stop = session.shutdown_token();
        let run = session.run();
        tokio::pin!(run);

        let report = tokio::select! {
            report = &mut run => report,
            _ = self.shutdown.cancelled() => {
                tracing::info!("shutdown requested, concluding session");
                session_stop.cancel();
                run.await
            }
        };
        Ok(report)
    }
}

/// Tells players who joined a session that will never start.
fn abandon<C: Connection>(channels: Vec<PlayerChannel<C>>) {
    for channel in channels {
        channel.send(ServerMessage::Error("server shutting down".into()));
    }
    tracing::info!("shutdown requested while filling");
}
