//! eru CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use eru_cli::cli::{Cli, Commands};
use eru_cli::commands::{ExecCommand, LambdaCommand};
use eru_cli::config::ClientConfig;
use eru_cli::interactive::TRANSPORT_FAILURE_EXIT_CODE;
use eru_cli::CliError;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = ClientConfig::from(&cli);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return exit_code(TRANSPORT_FAILURE_EXIT_CODE);
        }
    };

    let result = runtime.block_on(run(&cli, &config));
    // The stdin pump may still be parked on a read.
    runtime.shutdown_background();

    match result {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code(TRANSPORT_FAILURE_EXIT_CODE)
        }
    }
}

async fn run(cli: &Cli, config: &ClientConfig) -> Result<i32, CliError> {
    match &cli.command {
        Commands::Exec(args) => ExecCommand::new(config).execute(args).await,
        Commands::Lambda { command } => LambdaCommand::new(config).execute(command).await,
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(exit_status(code))
}

/// Truncate to the 8 bits a process status can carry.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn exit_status(code: i32) -> u8 {
    code as u8
}
