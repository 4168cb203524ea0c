//! Error types for test execution

use thiserror::Error;

use testrig_config::ConfigError;
use testrig_remote::{AgentError, RemoteError};

/// Errors that abort a test run
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The run could not start because its inputs are unusable
    #[error("{0}")]
    Configuration(String),

    /// The agent channel itself failed
    #[error("Remote call error: {0}")]
    Remote(String),

    /// The agent reported an in-band failure where none is tolerated
    #[error("Agent error: {0}")]
    Agent(String),

    /// The agent answered a request with a response of the wrong shape
    #[error("Unexpected response to {0} request")]
    UnexpectedResponse(&'static str),

    /// The run was cancelled from outside
    #[error("Test execution has been interrupted!")]
    Interrupted,

    /// The run finished with a failed verdict
    #[error("Test execution failed!")]
    TestFailed,
}

impl From<RemoteError> for ExecutionError {
    fn from(err: RemoteError) -> Self {
        ExecutionError::Remote(err.to_string())
    }
}

impl From<ConfigError> for ExecutionError {
    fn from(err: ConfigError) -> Self {
        ExecutionError::Configuration(err.to_string())
    }
}

impl From<AgentError> for ExecutionError {
    fn from(err: AgentError) -> Self {
        ExecutionError::Agent(err.to_string())
    }
}

/// Result alias for execution operations
pub type Result<T> = std::result::Result<T, ExecutionError>;
