//! # eru-cli
//!
//! Command-line client for the eru core service.
//!
//! Provides commands for:
//! - `exec`: attach to a command inside a running workload
//! - `lambda run`: run replicas to completion and stream their output
//!
//! # Architecture
//!
//! The CLI connects to the core service via WebSocket using the protocol
//! defined in `eru-proto::cli`. [`client::GatewayClient`] performs the
//! handshake and opens the attach session; [`interactive::StreamHandler`]
//! drains it and produces the process exit code.
//!
//! ```text
//! ┌──────────┐   hello / request (JSON)   ┌────────┐
//! │  erucli  │───────────────────────────►│  core  │
//! │          │◄═════ attach frames ══════►│        │
//! └──────────┘   stdin / resize (binary)  └────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod interactive;
pub mod output;

pub use cli::{Cli, Commands, ExecArgs, LambdaCommands, LambdaRunArgs};
pub use client::{GatewayClient, WsChannel};
pub use config::ClientConfig;
pub use error::CliError;
pub use interactive::{handle, StreamHandler};
pub use output::{LineEnding, OutputTemplate};
