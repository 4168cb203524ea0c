//! Automation tool facade used by the agent
//!
//! The agent process does not know how a concrete test bench is driven.
//! It talks to this trait; production builds plug in a COM or HTTP backed
//! implementation, tests plug in scripted fakes.

use async_trait::async_trait;
use thiserror::Error;

use testrig_config::{ExecutionConfig, TestConfig};
use testrig_remote::{OpenOptions, StartOptions, ValidationFinding};

/// In-band failure reported by the tool itself.
///
/// Tool errors are ordinary outcomes of a run (a configuration that does
/// not start, an artifact that does not open); they are reported to the
/// scheduler as data, not as channel failures.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ToolError {
    message: String,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result the tool reports for one finished execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRunResult {
    /// Verdict string, e.g. `SUCCESS` or `FAILED`
    pub result: String,
    /// Path of the report database the tool wrote
    pub report_db: String,
}

/// Driver interface to the automation tool on the agent host.
///
/// All methods report tool-level failures as `Err(ToolError)`; the agent
/// service converts those into in-band protocol errors.
#[async_trait]
pub trait AutomationTool: Send + Sync {
    /// Load and optionally start a test configuration.
    async fn load_configuration(
        &self,
        test: &TestConfig,
        execution: &ExecutionConfig,
    ) -> Result<(), ToolError>;

    /// Open a test artifact in the tool.
    async fn open_artifact(&self, path: &str, options: &OpenOptions) -> Result<(), ToolError>;

    /// Run the tool's checks on an open artifact.
    async fn check_artifact(&self, path: &str) -> Result<Vec<ValidationFinding>, ToolError>;

    /// Start executing an open artifact, returning the tool's own handle
    /// for the running execution.
    async fn start_execution(
        &self,
        path: &str,
        options: &StartOptions,
    ) -> Result<String, ToolError>;

    /// Current state of a running execution, e.g. `RUNNING`.
    async fn execution_state(&self, token: &str) -> Result<String, ToolError>;

    /// Ask the tool to abort a running execution.
    async fn abort_execution(&self, token: &str) -> Result<(), ToolError>;

    /// Collect verdict and report location of a finished execution.
    async fn execution_result(&self, token: &str) -> Result<ToolRunResult, ToolError>;

    /// Close the open artifact. `Ok(false)` means the tool refused.
    async fn close_artifact(&self, path: &str) -> Result<bool, ToolError>;

    /// Read a tool setting by name, returning its raw string value.
    async fn get_setting(&self, name: &str) -> Result<String, ToolError>;

    /// Shut the tool down cooperatively within the given bound.
    async fn stop(&self, timeout_secs: u64) -> Result<bool, ToolError>;

    /// Wait until the tool reports an idle state.
    async fn wait_for_idle(&self, timeout_secs: u64) -> Result<bool, ToolError>;
}
