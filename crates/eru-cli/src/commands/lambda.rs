//! Lambda command implementation.
//!
//! `lambda run` creates `count` replicas and streams all of them until
//! every replica has exited.

use eru_proto::LambdaSpec;
use tracing::debug;

use super::parse_envs;
use crate::cli::{LambdaCommands, LambdaRunArgs};
use crate::client::GatewayClient;
use crate::config::ClientConfig;
use crate::error::CliError;
use crate::interactive;

/// Lambda command executor.
#[derive(Debug)]
pub struct LambdaCommand<'a> {
    config: &'a ClientConfig,
}

impl<'a> LambdaCommand<'a> {
    /// Create a new lambda command.
    #[must_use]
    pub const fn new(config: &'a ClientConfig) -> Self {
        Self { config }
    }

    /// Dispatch a lambda subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the subcommand fails.
    pub async fn execute(&self, command: &LambdaCommands) -> Result<i32, CliError> {
        match command {
            LambdaCommands::Run(args) => self.run(args).await,
        }
    }

    /// Run replicas to completion and return the combined exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid, the connection
    /// fails, or the stream breaks before every replica exits.
    pub async fn run(&self, args: &LambdaRunArgs) -> Result<i32, CliError> {
        let spec = Self::build_spec(args)?;
        let (expected_exit_count, show_source_id) = session_params(&spec);

        let client = GatewayClient::connect(self.config).await?;
        let mut channel = client.run_and_wait(spec, args.interactive).await?;

        let result = interactive::handle(
            args.interactive,
            &mut channel,
            expected_exit_count,
            show_source_id,
        )
        .await;
        debug!(?result, "lambda session finished");
        channel.close().await;
        result
    }

    /// Build the lambda spec from arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable is malformed or the
    /// spec fails validation.
    pub fn build_spec(args: &LambdaRunArgs) -> Result<LambdaSpec, CliError> {
        let mut spec = LambdaSpec::new(&args.name, &args.image)
            .with_command(args.command.clone())
            .with_count(args.count);
        for (key, value) in parse_envs(&args.env)? {
            spec = spec.with_env(key, value);
        }
        if let Some(network) = &args.network {
            spec = spec.with_network(network);
        }
        if let Some(workdir) = &args.workdir {
            spec = spec.with_working_dir(workdir);
        }
        spec.validate()?;
        Ok(spec)
    }
}

/// Exit count and output template for a spec.
fn session_params(spec: &LambdaSpec) -> (usize, bool) {
    let count = usize::try_from(spec.count).unwrap_or(usize::MAX);
    (count, count > 1)
}
