//! CLI protocol envelope.
//!
//! Every session starts with a `hello` / `welcome` handshake in JSON text
//! frames, followed by one attach request. After that the server streams
//! [`CliResponse::Attach`] frames and the client sends raw stdin units and
//! resize commands as binary frames.
//!
//! ```text
//! erucli ── hello ──────────────► core
//! erucli ◄────────────── welcome ─ core
//! erucli ── execute_workload ───► core
//! erucli ◄═══════ attach ... ════► core   (binary: stdin / 0x80 resize)
//! ```
//!
//! # Example
//!
//! ```rust
//! use eru_proto::cli::CliMessage;
//!
//! let json = CliMessage::hello("0.1.0").to_json().unwrap();
//! assert!(json.contains("\"type\":\"hello\""));
//! ```

use serde::{Deserialize, Serialize};

use crate::attach::AttachMessage;
use crate::workload::{ExecuteWorkloadRequest, LambdaSpec};
use crate::ProtoError;

/// Protocol version for CLI communication.
pub const CLI_PROTOCOL_VERSION: u32 = 1;

/// Messages sent from CLI to the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CliMessage {
    /// Handshake to identify as CLI client.
    Hello {
        /// Client version.
        version: String,
        /// Protocol version.
        protocol_version: u32,
    },

    /// Attach to a command run inside an existing workload.
    ExecuteWorkload {
        /// Execution request.
        #[serde(flatten)]
        request: ExecuteWorkloadRequest,
    },

    /// Create lambda replicas and attach to all of them until they exit.
    RunAndWait {
        /// Lambda specification.
        spec: LambdaSpec,
        /// Whether local stdin is forwarded.
        open_stdin: bool,
    },
}

/// Responses sent from the service to the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CliResponse {
    /// Handshake accepted.
    Welcome {
        /// Server version.
        server_version: String,
        /// Protocol version.
        protocol_version: u32,
    },

    /// One message of an attach stream.
    Attach {
        /// Tagged payload.
        message: AttachMessage,
    },

    /// Request rejected.
    Error {
        /// Error code.
        code: u32,
        /// Error message.
        message: String,
        /// Original request type (if applicable).
        request_type: Option<String>,
    },
}

/// Error codes for CLI responses.
pub mod error_codes {
    /// Workload not found.
    pub const WORKLOAD_NOT_FOUND: u32 = 1002;
    /// Protocol version mismatch.
    pub const PROTOCOL_MISMATCH: u32 = 1008;
}

impl CliMessage {
    /// Create a hello message.
    #[must_use]
    pub fn hello(version: impl Into<String>) -> Self {
        Self::Hello {
            version: version.into(),
            protocol_version: CLI_PROTOCOL_VERSION,
        }
    }

    /// Create an exec request message.
    #[must_use]
    pub const fn execute_workload(request: ExecuteWorkloadRequest) -> Self {
        Self::ExecuteWorkload { request }
    }

    /// Create a lambda run request message.
    #[must_use]
    pub const fn run_and_wait(spec: LambdaSpec, open_stdin: bool) -> Self {
        Self::RunAndWait { spec, open_stdin }
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }

    /// Get the request type name for error reporting.
    #[must_use]
    pub const fn request_type(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::ExecuteWorkload { .. } => "execute_workload",
            Self::RunAndWait { .. } => "run_and_wait",
        }
    }
}

impl CliResponse {
    /// Create a welcome response.
    #[must_use]
    pub fn welcome(server_version: impl Into<String>) -> Self {
        Self::Welcome {
            server_version: server_version.into(),
            protocol_version: CLI_PROTOCOL_VERSION,
        }
    }

    /// Wrap an attach message.
    #[must_use]
    pub const fn attach(message: AttachMessage) -> Self {
        Self::Attach { message }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
            request_type: None,
        }
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }
}
