//! Attach stream framing.
//!
//! An attach session (`exec`, `lambda run`) is a bidirectional stream:
//!
//! ```text
//! ┌──────────┐   stdin units / 0x80 + {"Row","Col"}   ┌────────┐
//! │  erucli  │───────────────────────────────────────►│  core  │
//! │          │◄───────────────────────────────────────│        │
//! └──────────┘          AttachMessage (tagged)        └────────┘
//! ```
//!
//! Inbound messages carry an explicit [`StdStreamType`]. Older services
//! signal process exit in-band: a stdout/stderr payload starting with
//! [`EXIT_CODE_PREFIX`] followed by the decimal exit code. Both forms are
//! folded into [`Frame::Exit`] by [`Frame::from`].
//!
//! # Example
//!
//! ```rust
//! use eru_proto::attach::{AttachMessage, Frame};
//!
//! let frame = Frame::from(AttachMessage::stdout("c0ffee", b"[exitcode] 3".to_vec()));
//! assert!(matches!(frame, Frame::Exit { code: 3, .. }));
//! ```

use serde::{Deserialize, Serialize};

use crate::ProtoError;

/// Payload prefix marking an in-band exit sentinel.
pub const EXIT_CODE_PREFIX: &[u8] = b"[exitcode] ";

/// Leading byte of an outbound control command.
///
/// `0x80` is a UTF-8 continuation byte, so it never starts an encoded
/// code point typed on the local terminal.
pub const CONTROL_BYTE: u8 = 0x80;

/// Stream a message belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StdStreamType {
    /// Remote process standard output.
    Stdout,
    /// Remote process standard error.
    Stderr,
    /// Error raised by the service itself, not by the remote process.
    #[serde(rename = "erru", alias = "eru")]
    RemoteError,
    /// Identifier of the workload serving this stream.
    TypeWorkloadId,
    /// Structured exit code, payload is the decimal code.
    Exit,
}

impl std::fmt::Display for StdStreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
            Self::RemoteError => write!(f, "erru"),
            Self::TypeWorkloadId => write!(f, "type_workload_id"),
            Self::Exit => write!(f, "exit"),
        }
    }
}

/// One inbound message of an attach stream, as sent on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachMessage {
    /// Workload that produced the message.
    pub workload_id: String,
    /// Raw payload, base64 on the wire.
    #[serde(default, with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Stream tag.
    pub std_stream_type: StdStreamType,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

impl AttachMessage {
    /// Create a message with an arbitrary stream tag.
    #[must_use]
    pub fn new(
        workload_id: impl Into<String>,
        std_stream_type: StdStreamType,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            workload_id: workload_id.into(),
            data: data.into(),
            std_stream_type,
        }
    }

    /// Create a stdout message.
    #[must_use]
    pub fn stdout(workload_id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(workload_id, StdStreamType::Stdout, data)
    }

    /// Create a stderr message.
    #[must_use]
    pub fn stderr(workload_id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(workload_id, StdStreamType::Stderr, data)
    }

    /// Create a service error message.
    #[must_use]
    pub fn remote_error(workload_id: impl Into<String>, message: impl Into<Vec<u8>>) -> Self {
        Self::new(workload_id, StdStreamType::RemoteError, message)
    }

    /// Create a workload identifier announcement.
    #[must_use]
    pub fn workload_id(workload_id: impl Into<String>) -> Self {
        let id = workload_id.into();
        Self::new(id.clone(), StdStreamType::TypeWorkloadId, id)
    }

    /// Create a structured exit message.
    #[must_use]
    pub fn exit(workload_id: impl Into<String>, code: i32) -> Self {
        Self::new(workload_id, StdStreamType::Exit, code.to_string())
    }

    /// Create a legacy in-band exit sentinel on stdout.
    #[must_use]
    pub fn exit_sentinel(workload_id: impl Into<String>, code: i32) -> Self {
        let mut data = EXIT_CODE_PREFIX.to_vec();
        data.extend_from_slice(code.to_string().as_bytes());
        Self::stdout(workload_id, data)
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

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Output destined for local stdout.
    Stdout {
        /// Producing workload.
        source: String,
        /// Payload.
        data: Vec<u8>,
    },
    /// Output destined for local stderr.
    Stderr {
        /// Producing workload.
        source: String,
        /// Payload.
        data: Vec<u8>,
    },
    /// Service-side error; the stream continues.
    RemoteError {
        /// Workload the error relates to.
        source: String,
        /// Error text.
        message: Vec<u8>,
    },
    /// Informational workload identifier.
    WorkloadIdentifier {
        /// Workload ID.
        id: String,
    },
    /// A remote process finished.
    Exit {
        /// Workload that exited.
        source: String,
        /// Exit code.
        code: i32,
    },
}

impl From<AttachMessage> for Frame {
    fn from(msg: AttachMessage) -> Self {
        let AttachMessage {
            workload_id: source,
            data,
            std_stream_type,
        } = msg;

        match std_stream_type {
            StdStreamType::RemoteError => Self::RemoteError {
                source,
                message: data,
            },
            StdStreamType::TypeWorkloadId => {
                let id = if data.is_empty() {
                    source
                } else {
                    String::from_utf8_lossy(&data).into_owned()
                };
                Self::WorkloadIdentifier { id }
            }
            StdStreamType::Exit => match parse_exit_code(&data) {
                Some(code) => Self::Exit { source, code },
                None => Self::Stdout { source, data },
            },
            StdStreamType::Stdout => match parse_exit_sentinel(&data) {
                Some(code) => Self::Exit { source, code },
                None => Self::Stdout { source, data },
            },
            StdStreamType::Stderr => match parse_exit_sentinel(&data) {
                Some(code) => Self::Exit { source, code },
                None => Self::Stderr { source, data },
            },
        }
    }
}

/// Parse an in-band exit sentinel.
///
/// Returns `None` when the payload lacks [`EXIT_CODE_PREFIX`] or the
/// remainder is not exactly a base-10 integer. Surrounding whitespace is
/// not accepted, so a line printed by the remote program stays output.
#[must_use]
pub fn parse_exit_sentinel(data: &[u8]) -> Option<i32> {
    data.strip_prefix(EXIT_CODE_PREFIX).and_then(parse_exit_code)
}

fn parse_exit_code(data: &[u8]) -> Option<i32> {
    std::str::from_utf8(data).ok()?.parse().ok()
}

/// Local terminal geometry sent on resize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowSize {
    /// Number of rows.
    #[serde(rename = "Row")]
    pub rows: u16,
    /// Number of columns.
    #[serde(rename = "Col")]
    pub cols: u16,
}

impl WindowSize {
    /// Create a window size.
    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

/// Encode a resize control command: [`CONTROL_BYTE`] followed by JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_resize_command(size: &WindowSize) -> Result<Vec<u8>, ProtoError> {
    let mut out = vec![CONTROL_BYTE];
    serde_json::to_writer(&mut out, size).map_err(|e| ProtoError::Encoding(e.to_string()))?;
    Ok(out)
}

/// Decode an outbound command as a resize request.
///
/// Returns `Ok(None)` for plain keystroke data.
///
/// # Errors
///
/// Returns an error if the control payload is not a valid window size.
pub fn decode_resize_command(data: &[u8]) -> Result<Option<WindowSize>, ProtoError> {
    match data.split_first() {
        Some((&CONTROL_BYTE, payload)) => serde_json::from_slice(payload)
            .map(Some)
            .map_err(|e| ProtoError::Decoding(e.to_string())),
        _ => Ok(None),
    }
}
