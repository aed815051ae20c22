//! Error types for the protocol layer.

/// Errors that can occur while decoding a protocol line.
///
/// Encoding cannot fail: every message has a textual form. Decoding fails
/// when the peer sends something that doesn't match the command table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The line was empty or only whitespace.
    #[error("empty message")]
    Empty,

    /// The leading token is not a command this side understands.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The command had the wrong number of arguments.
    #[error("{command} expects {expected} argument(s), got {got}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    /// An argument that must be a number wasn't one.
    #[error("invalid {field}: {value:?} is not a number")]
    InvalidNumber { field: &'static str, value: String },
}
