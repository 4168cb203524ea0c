//! Testrig Execution Engine
//!
//! This crate provides the test execution core of testrig: the
//! orchestrator and protocol driver used on the scheduler side, and the
//! agent service, automation tool facade and process control used on the
//! agent side.

pub mod agent;
pub mod cancel;
pub mod driver;
pub mod error;
pub mod instances;
pub mod orchestrator;
pub mod paths;
pub mod process;
pub mod tool;

#[cfg(test)]
pub(crate) mod testkit;

// Re-export main types
pub use agent::{AgentService, LocalAgent};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use driver::{
    ArtifactStrategy, ArtifactVerdict, ExecutionDriver, ExecutionOutcome, FolderVerdict,
    POLL_INTERVAL,
};
pub use error::ExecutionError;
pub use instances::InstanceManager;
pub use orchestrator::{OutcomeRecord, TestOrchestrator, TestSession};
pub use paths::{PathResolver, CONFIGURATIONS_SETTING, PACKAGES_SETTING};
pub use process::{ProcessControl, SystemProcessControl};
pub use tool::{AutomationTool, ToolError, ToolRunResult};
