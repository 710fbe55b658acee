//! Error types for the interception pipeline and dispatch layer.

use thiserror::Error;

/// Main error type for interception and dispatch.
#[derive(Debug, Error)]
pub enum Error {
    /// An interceptor failed. Propagated unchanged through the sequence.
    #[error("Interceptor failed: {0}")]
    Handler(String),

    #[error("Unknown control flow bits: {0:#04b}")]
    UnknownControlFlowBits(u8),

    #[error("No table registered for message type: {0}")]
    UnknownTable(String),

    #[error("Row for table {table} has no primary key {pk_name}")]
    MissingPrimaryKey { table: String, pk_name: String },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Shorthand for handler failures.
    pub fn handler(msg: impl Into<String>) -> Self {
        Error::Handler(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type for interception and dispatch.
pub type Result<T> = std::result::Result<T, Error>;
