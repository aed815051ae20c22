//! Codec trait and the line codec.
//!
//! A "codec" converts between protocol messages and single lines of text.
//! The session doesn't care HOW a message is spelled on the wire; it only
//! needs something that implements [`Codec`]. [`LineCodec`] is the
//! space-separated `COMMAND arg arg` format every client speaks today.

use crate::{CellId, ClientMessage, Outcome, PlayerId, ProtocolError, ServerMessage};

/// Command tokens of the line protocol.
pub mod commands {
    pub const WELCOME: &str = "WELCOME";
    pub const WHACK: &str = "WHACK";
    pub const MOLE_UP: &str = "MOLE_UP";
    pub const MOLE_DOWN: &str = "MOLE_DOWN";
    pub const SCORE: &str = "SCORE";
    pub const GAME_WON: &str = "GAME_WON";
    pub const GAME_LOST: &str = "GAME_LOST";
    pub const GAME_TIED: &str = "GAME_TIED";
    pub const ERROR: &str = "ERROR";
}

use commands::*;

/// Turns protocol messages into lines and back.
///
/// Lines never include their terminator; framing belongs to the transport.
pub trait Codec: Send + Sync + 'static {
    /// Encodes a message the server sends.
    fn encode_server(&self, msg: &ServerMessage) -> String;

    /// Decodes a message the server sent (client side).
    fn decode_server(&self, line: &str) -> Result<ServerMessage, ProtocolError>;

    /// Encodes a message the client sends.
    fn encode_client(&self, msg: &ClientMessage) -> String;

    /// Decodes a message a client sent (server side).
    fn decode_client(&self, line: &str) -> Result<ClientMessage, ProtocolError>;
}

// ---------------------------------------------------------------------------
// LineCodec
// ---------------------------------------------------------------------------

/// The space-separated text codec.
///
/// ```rust
/// use whack_protocol::{CellId, ClientMessage, Codec, LineCodec, PlayerId};
///
/// let codec = LineCodec;
/// let msg = codec.decode_client("WHACK 4 1").unwrap();
/// assert_eq!(msg, ClientMessage::Whack { cell: CellId(4), player: PlayerId(1) });
/// assert_eq!(codec.encode_client(&msg), "WHACK 4 1");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCodec;

impl Codec for LineCodec {
    fn encode_server(&self, msg: &ServerMessage) -> String {
        match msg {
            ServerMessage::Welcome {
                rows,
                cols,
                players,
                player_id,
            } => format!("{WELCOME} {rows} {cols} {players} {}", player_id.0),
            ServerMessage::MoleUp(cell) => format!("{MOLE_UP} {}", cell.0),
            ServerMessage::MoleDown(cell) => format!("{MOLE_DOWN} {}", cell.0),
            ServerMessage::Score {
                score,
                player: Some(player),
            } => format!("{SCORE} {score} {}", player.0),
            ServerMessage::Score {
                score,
                player: None,
            } => format!("{SCORE} {score}"),
            ServerMessage::Outcome(Outcome::Won) => GAME_WON.to_string(),
            ServerMessage::Outcome(Outcome::Lost) => GAME_LOST.to_string(),
            ServerMessage::Outcome(Outcome::Tied) => GAME_TIED.to_string(),
            // Collapse any embedded line breaks so one message stays one line.
            ServerMessage::Error(message) => {
                format!("{ERROR} {}", message.replace(['\r', '\n'], " "))
            }
        }
    }

    fn decode_server(&self, line: &str) -> Result<ServerMessage, ProtocolError> {
        let (command, args) = split(line)?;
        match command {
            WELCOME => {
                expect_arity(WELCOME, &args, 4)?;
                Ok(ServerMessage::Welcome {
                    rows: number("rows", args[0])?,
                    cols: number("cols", args[1])?,
                    players: number("players", args[2])?,
                    player_id: PlayerId(number("player id", args[3])?),
                })
            }
            MOLE_UP => {
                expect_arity(MOLE_UP, &args, 1)?;
                Ok(ServerMessage::MoleUp(CellId(number("cell id", args[0])?)))
            }
            MOLE_DOWN => {
                expect_arity(MOLE_DOWN, &args, 1)?;
                Ok(ServerMessage::MoleDown(CellId(number("cell id", args[0])?)))
            }
            SCORE => match args.as_slice() {
                [score] => Ok(ServerMessage::Score {
                    score: number("score", score)?,
                    player: None,
                }),
                [score, player] => Ok(ServerMessage::Score {
                    score: number("score", score)?,
                    player: Some(PlayerId(number("player id", player)?)),
                }),
                _ => Err(ProtocolError::WrongArity {
                    command: SCORE,
                    expected: 2,
                    got: args.len(),
                }),
            },
            GAME_WON => outcome(GAME_WON, &args, Outcome::Won),
            GAME_LOST => outcome(GAME_LOST, &args, Outcome::Lost),
            GAME_TIED => outcome(GAME_TIED, &args, Outcome::Tied),
            ERROR => Ok(ServerMessage::Error(args.join(" "))),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    fn encode_client(&self, msg: &ClientMessage) -> String {
        match msg {
            ClientMessage::Whack { cell, player } => {
                format!("{WHACK} {} {}", cell.0, player.0)
            }
        }
    }

    fn decode_client(&self, line: &str) -> Result<ClientMessage, ProtocolError> {
        let (command, args) = split(line)?;
        match command {
            WHACK => {
                expect_arity(WHACK, &args, 2)?;
                Ok(ClientMessage::Whack {
                    cell: CellId(number("cell id", args[0])?),
                    player: PlayerId(number("player id", args[1])?),
                })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

fn split(line: &str) -> Result<(&str, Vec<&str>), ProtocolError> {
    let mut tokens = line.split_whitespace();
    let command = tokens.next().ok_or(ProtocolError::Empty)?;
    Ok((command, tokens.collect()))
}

fn expect_arity(
    command: &'static str,
    args: &[&str],
    expected: usize,
) -> Result<(), ProtocolError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ProtocolError::WrongArity {
            command,
            expected,
            got: args.len(),
        })
    }
}

fn number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn outcome(
    command: &'static str,
    args: &[&str],
    outcome: Outcome,
) -> Result<ServerMessage, ProtocolError> {
    expect_arity(command, args, 0)?;
    Ok(ServerMessage::Outcome(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Encoding: exact tokens on the wire
    // =====================================================================

    #[test]
    fn test_encode_welcome() {
        let msg = ServerMessage::Welcome {
            rows: 3,
            cols: 4,
            players: 2,
            player_id: PlayerId(1),
        };
        assert_eq!(LineCodec.encode_server(&msg), "WELCOME 3 4 2 1");
    }

    #[test]
    fn test_encode_board_changes() {
        assert_eq!(LineCodec.encode_server(&ServerMessage::MoleUp(CellId(7))), "MOLE_UP 7");
        assert_eq!(LineCodec.encode_server(&ServerMessage::MoleDown(CellId(0))), "MOLE_DOWN 0");
    }

    #[test]
    fn test_encode_score_names_player_and_allows_negative() {
        let msg = ServerMessage::Score {
            score: -1,
            player: Some(PlayerId(0)),
        };
        assert_eq!(LineCodec.encode_server(&msg), "SCORE -1 0");
    }

    #[test]
    fn test_encode_outcomes() {
        assert_eq!(LineCodec.encode_server(&ServerMessage::Outcome(Outcome::Won)), "GAME_WON");
        assert_eq!(LineCodec.encode_server(&ServerMessage::Outcome(Outcome::Lost)), "GAME_LOST");
        assert_eq!(LineCodec.encode_server(&ServerMessage::Outcome(Outcome::Tied)), "GAME_TIED");
    }

    #[test]
    fn test_encode_error_stays_on_one_line() {
        let msg = ServerMessage::Error("bad\nthing".into());
        assert_eq!(LineCodec.encode_server(&msg), "ERROR bad thing");
    }

    // =====================================================================
    // Decoding: client messages
    // =====================================================================

    #[test]
    fn test_decode_whack_tolerates_extra_whitespace() {
        let msg = LineCodec.decode_client("  WHACK   2\t1 ").unwrap();
        assert_eq!(
            msg,
            ClientMessage::Whack {
                cell: CellId(2),
                player: PlayerId(1)
            }
        );
    }

    #[test]
    fn test_decode_whack_missing_argument() {
        let err = LineCodec.decode_client("WHACK 2").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::WrongArity {
                command: WHACK,
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_decode_whack_non_numeric() {
        let err = LineCodec.decode_client("WHACK two 1").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidNumber { field: "cell id", .. }));
    }

    #[test]
    fn test_decode_whack_negative_cell_is_rejected() {
        let err = LineCodec.decode_client("WHACK -1 0").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidNumber { .. }));
    }

    #[test]
    fn test_decode_empty_and_unknown() {
        assert_eq!(LineCodec.decode_client("   ").unwrap_err(), ProtocolError::Empty);
        assert_eq!(
            LineCodec.decode_client("MOLE_UP 3").unwrap_err(),
            ProtocolError::UnknownCommand("MOLE_UP".into())
        );
    }

    // =====================================================================
    // Decoding: server messages (client side)
    // =====================================================================

    #[test]
    fn test_decode_short_score_form() {
        let msg = LineCodec.decode_server("SCORE 4").unwrap();
        assert_eq!(
            msg,
            ServerMessage::Score {
                score: 4,
                player: None
            }
        );
    }

    #[test]
    fn test_decode_error_keeps_full_message() {
        let msg = LineCodec.decode_server("ERROR cell 99 is off the board").unwrap();
        assert_eq!(msg, ServerMessage::Error("cell 99 is off the board".into()));
    }

    #[test]
    fn test_decode_outcome_with_arguments_is_rejected() {
        let err = LineCodec.decode_server("GAME_WON 1").unwrap_err();
        assert!(matches!(err, ProtocolError::WrongArity { command: GAME_WON, .. }));
    }

    #[test]
    fn test_decode_welcome() {
        let msg = LineCodec.decode_server("WELCOME 2 2 2 0").unwrap();
        assert_eq!(
            msg,
            ServerMessage::Welcome {
                rows: 2,
                cols: 2,
                players: 2,
                player_id: PlayerId(0)
            }
        );
    }
}
