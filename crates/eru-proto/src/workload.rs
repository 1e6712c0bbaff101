//! Request payloads that open an attach session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;
use crate::validation::{
    validate_count, validate_env_key, validate_image, validate_name, ValidationResult,
};

/// Execute a command inside an existing workload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecuteWorkloadRequest {
    /// Target workload.
    pub workload_id: String,
    /// Command and arguments. Empty runs the workload's default shell.
    #[serde(default)]
    pub commands: Vec<String>,
    /// Extra environment for the command.
    #[serde(default)]
    pub envs: BTreeMap<String, String>,
    /// Working directory inside the workload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    /// Whether local stdin is forwarded.
    #[serde(default)]
    pub open_stdin: bool,
}

impl ExecuteWorkloadRequest {
    /// Create a request for the given workload.
    #[must_use]
    pub fn new(workload_id: impl Into<String>) -> Self {
        Self {
            workload_id: workload_id.into(),
            commands: Vec::new(),
            envs: BTreeMap::new(),
            workdir: None,
            open_stdin: false,
        }
    }

    /// Set the command.
    #[must_use]
    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Forward local stdin.
    #[must_use]
    pub const fn with_open_stdin(mut self, open_stdin: bool) -> Self {
        self.open_stdin = open_stdin;
        self
    }

    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any field is invalid.
    pub fn validate(&self) -> Result<(), ProtoError> {
        let mut result = ValidationResult::new();
        result.check(validate_name("workload_id", &self.workload_id));
        for key in self.envs.keys() {
            result.check(validate_env_key(key));
        }
        result.into_result().map_err(Into::into)
    }
}

/// A short-lived batch of replicas run to completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LambdaSpec {
    /// Lambda name.
    pub name: String,
    /// Container image.
    pub image: String,
    /// Command and arguments.
    #[serde(default)]
    pub command: Vec<String>,
    /// Environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Number of replicas.
    pub count: u32,
    /// Network to join, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Working directory inside the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

impl LambdaSpec {
    /// Create a single-replica spec.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command: Vec::new(),
            env: BTreeMap::new(),
            count: 1,
            network: None,
            working_dir: None,
        }
    }

    /// Set the command.
    #[must_use]
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the replica count.
    #[must_use]
    pub const fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Set the network.
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Validate the spec.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any field is invalid.
    pub fn validate(&self) -> Result<(), ProtoError> {
        let mut result = ValidationResult::new();
        result.check(validate_name("name", &self.name));
        result.check(validate_image(&self.image));
        result.check(validate_count(self.count));
        for key in self.env.keys() {
            result.check(validate_env_key(key));
        }
        result.into_result().map_err(Into::into)
    }
}
