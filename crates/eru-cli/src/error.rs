//! CLI error types.

use eru_proto::ProtoError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Gateway connection failed or the transport broke mid-stream.
    #[error("connection error: {0}")]
    Connection(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The peer sent something the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The service rejected a request.
    #[error("gateway error {code}: {message}")]
    Gateway {
        /// Error code.
        code: u32,
        /// Error message.
        message: String,
    },

    /// An operation exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProtoError> for CliError {
    fn from(err: ProtoError) -> Self {
        match err {
            ProtoError::Validation(msg) => Self::InvalidArgument(msg),
            other => Self::Protocol(other.to_string()),
        }
    }
}
