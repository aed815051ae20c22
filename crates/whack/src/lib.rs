//! # Whack
//!
//! A networked whack-a-mole game server.
//!
//! Players connect over TCP (or WebSocket), receive a `WELCOME`, and once
//! the configured number have joined a timed session starts. Moles pop up
//! and drop on per-cell timers, players race to whack them, and when time
//! runs out every connected player is told whether they won, lost, or tied.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use whack::prelude::*;
//!
//! # async fn example() -> Result<(), WhackError> {
//! let config = SessionConfig::new(3, 3, 2, Duration::from_secs(60));
//! let mut server = WhackServer::builder()
//!     .bind("0.0.0.0:5000")
//!     .config(config)
//!     .build_tcp()
//!     .await?;
//! let report = server.run_session().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod server;

pub use error::WhackError;
pub use server::{WhackServer, WhackServerBuilder, load_config};

pub use whack_board as board;
pub use whack_clock as clock;
pub use whack_protocol as protocol;
pub use whack_session as session;
pub use whack_transport as transport;

pub mod prelude {
    pub use crate::{WhackError, WhackServer, WhackServerBuilder, load_config};
    pub use whack_clock::{DwellRange, MoleTimings};
    pub use whack_protocol::{
        CellId, ClientMessage, Codec, LineCodec, Outcome, PlayerId, ServerMessage,
    };
    pub use whack_session::{
        PlayerReport, ScoringRules, SessionConfig, SessionReport, SessionState,
    };
    pub use whack_transport::{
        Connection, LineReader, LineWriter, TcpLineConnection, TcpLineTransport, Transport,
        WebSocketTransport,
    };
}
