//! Execution behavior configuration

use serde::{Deserialize, Serialize};

use crate::domains::utils::default_true;
use crate::error::ConfigResult;
use crate::expand::{expand, EnvVars};
use crate::validation::Validatable;

/// Default execution timeout in seconds
pub const DEFAULT_TIMEOUT: u64 = 3600;

/// Execution behavior configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Wall-clock execution timeout in seconds, as expandable text.
    /// `0` disables the timeout entirely.
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Tear down running tool instances after a failed test verdict
    #[serde(default = "default_true")]
    pub stop_on_error: bool,

    /// Validate the test artifact before running it
    #[serde(default = "default_true")]
    pub check_test_file: bool,
}

fn default_timeout() -> String {
    DEFAULT_TIMEOUT.to_string()
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            stop_on_error: true,
            check_test_file: true,
        }
    }
}

impl ExecutionConfig {
    /// Expand environment variables in the timeout text.
    pub fn expand(&self, env: &EnvVars) -> Self {
        Self {
            timeout: expand(&self.timeout, env),
            stop_on_error: self.stop_on_error,
            check_test_file: self.check_test_file,
        }
    }

    /// Parse the timeout text, falling back to [`DEFAULT_TIMEOUT`] when it
    /// does not parse as seconds.
    pub fn parsed_timeout(&self) -> u64 {
        match self.timeout.trim().parse() {
            Ok(timeout) => timeout,
            Err(_) => {
                log::warn!(
                    "Invalid execution timeout '{}', assuming default of {} seconds",
                    self.timeout,
                    DEFAULT_TIMEOUT
                );
                DEFAULT_TIMEOUT
            }
        }
    }
}

impl Validatable for ExecutionConfig {
    fn validate(&self) -> ConfigResult<()> {
        // Variables are resolved at build time; only reject values that can
        // never parse.
        let timeout = self.timeout.trim();
        if !timeout.is_empty() && !timeout.contains('$') && timeout.parse::<u64>().is_err() {
            return Err(self.validation_error(format!(
                "timeout must be a number of seconds, got '{}'",
                self.timeout
            )));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "execution"
    }
}
