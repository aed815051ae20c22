//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Each text frame carries exactly one protocol line.

use std::io;
use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use crate::{
    Connection, ConnectionId, DEFAULT_MAX_LINE_LEN, LineReader, LineWriter, Transport,
    TransportError,
};

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    max_line_len: usize,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        })
    }

    /// Caps inbound messages at `max` bytes.
    pub fn with_max_line_len(mut self, max: usize) -> Self {
        self.max_line_len = max;
        self
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| TransportError::Handshake {
                peer,
                reason: e.to_string(),
            })?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "accepted WebSocket connection");

        Ok(WebSocketConnection {
            id,
            peer,
            ws,
            max_line_len: self.max_line_len,
        })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single server-side WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    ws: WsStream,
    max_line_len: usize,
}

impl Connection for WebSocketConnection {
    type Reader = WebSocketReader;
    type Writer = WebSocketWriter;

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn split(self) -> (WebSocketReader, WebSocketWriter) {
        let (sink, stream) = self.ws.split();
        let reader = WebSocketReader {
            stream,
            max_line_len: self.max_line_len,
        };
        (reader, WebSocketWriter { sink })
    }
}

/// Inbound half of a [`WebSocketConnection`].
pub struct WebSocketReader {
    stream: SplitStream<WsStream>,
    max_line_len: usize,
}

impl WebSocketReader {
    fn checked_line(&self, text: &str) -> Result<Option<String>, TransportError> {
        let line = text.trim_end_matches(['\r', '\n']);
        if line.len() > self.max_line_len {
            return Err(TransportError::LineTooLong {
                max: self.max_line_len,
            });
        }
        Ok(Some(line.to_string()))
    }
}

impl LineReader for WebSocketReader {
    async fn recv_line(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return self.checked_line(text.as_str()),
                Some(Ok(Message::Binary(data))) => {
                    let text = std::str::from_utf8(&data).map_err(|_| TransportError::NotUtf8)?;
                    return self.checked_line(text);
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::Read(io::Error::other(e)));
                }
            }
        }
    }
}

/// Outbound half of a [`WebSocketConnection`].
pub struct WebSocketWriter {
    sink: SplitSink<WsStream, Message>,
}

impl LineWriter for WebSocketWriter {
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(line.to_owned().into()))
            .await
            .map_err(|e| TransportError::Write(io::Error::other(e)))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink
            .close()
            .await
            .map_err(|e| TransportError::Write(io::Error::other(e)))
    }
}
