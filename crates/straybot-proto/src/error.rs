//! Error types for the IRC protocol library.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A received line could not be parsed into a message.
    #[error("invalid message {string:?}: {cause}")]
    InvalidMessage {
        /// The offending line.
        string: String,
        /// Why it failed.
        cause: MessageParseError,
    },
}

/// Errors produced while parsing a single IRC line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageParseError {
    /// The line was empty (or only whitespace).
    #[error("empty message")]
    EmptyMessage,

    /// The command token is missing or malformed.
    #[error("invalid command at position {position}")]
    InvalidCommand {
        /// Byte offset where parsing failed.
        position: usize,
    },

    /// The prefix was present but unusable.
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    /// The line exceeded the codec's length limit and was dropped.
    #[error("line too long (max {max} bytes)")]
    LineTooLong {
        /// The configured limit.
        max: usize,
    },
}
