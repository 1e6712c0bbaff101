//! # eru-proto
//!
//! Wire definitions shared by the eru command-line client and the core
//! service it talks to: the attach stream frames, the window-size control
//! frame, and the request envelope used to open an attach session.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attach;
pub mod cli;
pub mod error;
pub mod validation;
pub mod workload;

pub use attach::{AttachMessage, Frame, StdStreamType, WindowSize};
pub use error::ProtoError;
pub use workload::{ExecuteWorkloadRequest, LambdaSpec};
