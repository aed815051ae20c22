//! Wire protocol for the whack-a-mole server.
//!
//! This crate defines the "language" that clients and servers speak:
//!
//! - **Types** ([`ServerMessage`], [`ClientMessage`], [`PlayerId`],
//!   [`CellId`], [`Outcome`]): the messages that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`LineCodec`]): how those messages are
//!   turned into single lines of text and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! The protocol layer sits between transport (raw lines) and the session
//! (players and board). It doesn't know about connections or timers.
//!
//! ```text
//! Transport (lines) → Protocol (messages) → Session (players, board)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, LineCodec, commands};
pub use error::ProtocolError;
pub use types::{CellId, ClientMessage, Outcome, PlayerId, ServerMessage};
