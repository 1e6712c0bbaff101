//! Connection configuration.
//!
//! Built once per invocation from the parsed [`Cli`] and passed by
//! reference to [`GatewayClient::connect`](crate::client::GatewayClient::connect).

use std::time::Duration;

use crate::cli::Cli;
use crate::error::CliError;

/// Default core service address.
pub const DEFAULT_ADDRESS: &str = "ws://127.0.0.1:5001";

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Immutable client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service URL (`ws://` or `wss://`).
    pub address: String,
    /// Deadline for connect plus handshake.
    pub connect_timeout: Duration,
    /// Debug logging.
    pub debug: bool,
}

impl ClientConfig {
    /// Create a config with default timeout and logging.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            debug: false,
        }
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable debug logging.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Check the address scheme and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if either is unusable.
    pub fn validate(&self) -> Result<(), CliError> {
        if !self.address.starts_with("ws://") && !self.address.starts_with("wss://") {
            return Err(CliError::Config(format!(
                "invalid gateway URL: {}, must start with ws:// or wss://",
                self.address
            )));
        }
        if self.connect_timeout.is_zero() {
            return Err(CliError::Config("timeout must be greater than zero".into()));
        }
        Ok(())
    }

    /// Default log directive for this config.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

impl From<&Cli> for ClientConfig {
    fn from(cli: &Cli) -> Self {
        Self::new(cli.address.clone())
            .with_connect_timeout(Duration::from_secs(cli.timeout))
            .with_debug(cli.debug)
    }
}
