//! CLI command implementations.
//!
//! Both commands follow the same pipeline: build a request from the
//! arguments, connect, open the attach session, and hand the channel to
//! [`interactive::handle`](crate::interactive::handle).
//!
//! - [`exec`] - Attach to a command inside a running workload
//! - [`lambda`] - Run replicas to completion

pub mod exec;
pub mod lambda;

pub use exec::ExecCommand;
pub use lambda::LambdaCommand;

use eru_proto::validation::parse_env_pair;
use eru_proto::ProtoError;

use crate::error::CliError;

/// Parse repeated `KEY=VALUE` arguments.
fn parse_envs(pairs: &[String]) -> Result<Vec<(String, String)>, CliError> {
    pairs
        .iter()
        .map(|pair| parse_env_pair(pair).map_err(|e| CliError::from(ProtoError::from(e))))
        .collect()
}
