//! Command-line argument parsing with clap.

use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_ADDRESS, DEFAULT_CONNECT_TIMEOUT_SECS};

/// eru command-line client.
#[derive(Parser, Debug, Clone)]
#[command(name = "erucli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Core service address to connect to.
    #[arg(short, long, global = true, env = "ERU_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Connection timeout in seconds.
    #[arg(long, global = true, env = "ERU_TIMEOUT", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Enable debug logging.
    #[arg(long, global = true, env = "ERU_DEBUG")]
    pub debug: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a command inside a running workload.
    Exec(ExecArgs),

    /// Lambda commands.
    Lambda {
        /// Lambda subcommand to execute.
        #[command(subcommand)]
        command: LambdaCommands,
    },
}

/// Arguments for the exec command.
#[derive(Parser, Debug, Clone)]
pub struct ExecArgs {
    /// Workload ID to attach to.
    #[arg(required = true)]
    pub workload_id: String,

    /// Command to execute in the workload.
    #[arg(last = true)]
    pub command: Vec<String>,

    /// Attach local stdin and put the terminal in raw mode.
    #[arg(short, long)]
    pub interactive: bool,

    /// Environment variables (KEY=VALUE).
    #[arg(short, long, value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Working directory inside the workload.
    #[arg(short, long)]
    pub workdir: Option<String>,
}

/// Lambda subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum LambdaCommands {
    /// Run replicas to completion and stream their output.
    Run(LambdaRunArgs),
}

/// Arguments for `lambda run`.
#[derive(Parser, Debug, Clone)]
pub struct LambdaRunArgs {
    /// Lambda name.
    #[arg(required = true)]
    pub name: String,

    /// Command to execute in each replica.
    #[arg(last = true)]
    pub command: Vec<String>,

    /// Container image to run.
    #[arg(long, required = true)]
    pub image: String,

    /// Number of replicas.
    #[arg(short, long, default_value_t = 1)]
    pub count: u32,

    /// Network to join.
    #[arg(short, long)]
    pub network: Option<String>,

    /// Environment variables (KEY=VALUE).
    #[arg(short, long, value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Working directory inside the container.
    #[arg(short, long)]
    pub workdir: Option<String>,

    /// Attach local stdin and put the terminal in raw mode.
    #[arg(short = 'i', long = "stdin")]
    pub interactive: bool,
}
