//! Raw TCP transport: one message per `\n`-terminated line.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use crate::{
    Connection, ConnectionId, DEFAULT_MAX_LINE_LEN, LineReader, LineWriter, Transport,
    TransportError,
};

/// A TCP [`Transport`] that listens for incoming line-oriented connections.
pub struct TcpLineTransport {
    listener: TcpListener,
    max_line_len: usize,
}

impl TcpLineTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "TCP line transport listening");
        Ok(Self {
            listener,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        })
    }

    /// Caps inbound lines at `max` bytes, terminator excluded.
    pub fn with_max_line_len(mut self, max: usize) -> Self {
        self.max_line_len = max;
        self
    }
}

impl Transport for TcpLineTransport {
    type Connection = TcpLineConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "accepted TCP connection");
        Ok(TcpLineConnection::from_stream(id, peer, stream).with_max_line_len(self.max_line_len))
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single TCP connection speaking newline-delimited text.
pub struct TcpLineConnection {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
    max_line_len: usize,
}

impl TcpLineConnection {
    /// Opens an outgoing connection (used by clients and tests).
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let connect_err = |source| TransportError::Connect {
            addr: addr.to_string(),
            source,
        };
        let stream = TcpStream::connect(addr).await.map_err(connect_err)?;
        let peer = stream.peer_addr().map_err(connect_err)?;
        Ok(Self::from_stream(ConnectionId::next(), peer, stream))
    }

    fn from_stream(id: ConnectionId, peer: SocketAddr, stream: TcpStream) -> Self {
        // Each message is small and latency matters more than throughput.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%id, error = %e, "could not disable Nagle");
        }
        Self {
            id,
            peer,
            stream,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    /// Caps inbound lines at `max` bytes, terminator excluded.
    pub fn with_max_line_len(mut self, max: usize) -> Self {
        self.max_line_len = max;
        self
    }
}

impl Connection for TcpLineConnection {
    type Reader = TcpLineReader;
    type Writer = TcpLineWriter;

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn split(self) -> (TcpLineReader, TcpLineWriter) {
        let (read, write) = self.stream.into_split();
        (
            TcpLineReader {
                inner: BufReader::new(read),
                line: Vec::new(),
                overflowed: false,
                max_line_len: self.max_line_len,
            },
            TcpLineWriter { half: write },
        )
    }
}

/// Inbound half of a [`TcpLineConnection`].
///
/// Lines are read as raw bytes, so a line that isn't UTF-8 or is longer
/// than the cap costs only that line: the reader reports it and carries on
/// with the next one.
pub struct TcpLineReader {
    inner: BufReader<OwnedReadHalf>,
    // Partial line, kept across cancelled reads.
    line: Vec<u8>,
    // The current line blew past the cap; its bytes are being skipped.
    overflowed: bool,
    max_line_len: usize,
}

impl TcpLineReader {
    fn finish_line(&mut self) -> Result<String, TransportError> {
        let bytes = std::mem::take(&mut self.line);
        if std::mem::take(&mut self.overflowed) {
            return Err(TransportError::LineTooLong {
                max: self.max_line_len,
            });
        }
        let mut line = String::from_utf8(bytes).map_err(|_| TransportError::NotUtf8)?;
        // Tolerate CRLF clients.
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

impl LineReader for TcpLineReader {
    async fn recv_line(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let available = self.inner.fill_buf().await.map_err(TransportError::Read)?;
            if available.is_empty() {
                // EOF. A trailing line without `\n` still counts.
                if self.line.is_empty() && !self.overflowed {
                    return Ok(None);
                }
                return self.finish_line().map(Some);
            }

            let newline = available.iter().position(|&b| b == b'\n');
            let chunk = &available[..newline.unwrap_or(available.len())];
            if !self.overflowed {
                if self.line.len() + chunk.len() > self.max_line_len {
                    self.overflowed = true;
                    self.line.clear();
                } else {
                    self.line.extend_from_slice(chunk);
                }
            }
            let used = chunk.len() + usize::from(newline.is_some());
            self.inner.consume(used);

            if newline.is_some() {
                return self.finish_line().map(Some);
            }
        }
    }
}

/// Outbound half of a [`TcpLineConnection`].
pub struct TcpLineWriter {
    half: OwnedWriteHalf,
}

impl LineWriter for TcpLineWriter {
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        self.half
            .write_all(buf.as_bytes())
            .await
            .map_err(TransportError::Write)?;
        self.half.flush().await.map_err(TransportError::Write)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.half.shutdown().await.map_err(TransportError::Write)
    }
}
