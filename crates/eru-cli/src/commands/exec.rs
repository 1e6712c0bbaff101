//! Exec command implementation.
//!
//! Attaches to a new process inside an existing workload.

use eru_proto::ExecuteWorkloadRequest;
use tracing::debug;

use super::parse_envs;
use crate::cli::ExecArgs;
use crate::client::GatewayClient;
use crate::config::ClientConfig;
use crate::error::CliError;
use crate::interactive;

/// Exec command executor.
#[derive(Debug)]
pub struct ExecCommand<'a> {
    config: &'a ClientConfig,
}

impl<'a> ExecCommand<'a> {
    /// Create a new exec command.
    #[must_use]
    pub const fn new(config: &'a ClientConfig) -> Self {
        Self { config }
    }

    /// Run the command and return the remote exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid, the connection
    /// fails, or the stream breaks before the process exits.
    pub async fn execute(&self, args: &ExecArgs) -> Result<i32, CliError> {
        let request = Self::build_request(args)?;
        let client = GatewayClient::connect(self.config).await?;
        let mut channel = client.execute_workload(request).await?;

        let result = interactive::handle(args.interactive, &mut channel, 1, false).await;
        debug!(?result, "exec session finished");
        channel.close().await;
        result
    }

    /// Build the exec request from arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable is malformed or the
    /// request fails validation.
    pub fn build_request(args: &ExecArgs) -> Result<ExecuteWorkloadRequest, CliError> {
        let mut request = ExecuteWorkloadRequest::new(&args.workload_id)
            .with_commands(args.command.clone())
            .with_open_stdin(args.interactive);
        for (key, value) in parse_envs(&args.env)? {
            request = request.with_env(key, value);
        }
        if let Some(workdir) = &args.workdir {
            request = request.with_workdir(workdir);
        }
        request.validate()?;
        Ok(request)
    }
}
