//! Remote protocol definitions and message types

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use testrig_config::{
    ExecutionConfig, JobExecutionMode, PackageConfig, ProjectConfig, ScanMode, TestConfig,
};

/// Remote protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Execution state string reported by the tool while a run is in progress
pub const RUNNING_STATE: &str = "RUNNING";

/// Sentinel value the tool returns for settings that are not set
pub const SETTING_UNSET: &str = "None";

/// Test artifact kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Package,
    Project,
}

impl ArtifactKind {
    /// Noun used in log output
    pub fn noun(self) -> &'static str {
        match self {
            ArtifactKind::Package => "package",
            ArtifactKind::Project => "project",
        }
    }

    /// File extension of this artifact kind, including the dot
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Package => ".pkg",
            ArtifactKind::Project => ".prj",
        }
    }
}

/// Artifact-specific options applied when opening
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpenOptions {
    /// Packages are opened without options
    Package,
    /// Project open options
    Project {
        exec_in_current_pkg_dir: bool,
        filter_expression: String,
    },
}

impl From<&ProjectConfig> for OpenOptions {
    fn from(config: &ProjectConfig) -> Self {
        OpenOptions::Project {
            exec_in_current_pkg_dir: config.exec_in_current_pkg_dir,
            filter_expression: config.filter_expression.clone(),
        }
    }
}

/// Artifact-specific options applied when starting execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StartOptions {
    /// Package execution options
    Package {
        run_test: bool,
        run_trace_analysis: bool,
        parameters: BTreeMap<String, String>,
    },
    /// Project execution options
    Project { job_mode: JobExecutionMode },
}

impl From<&PackageConfig> for StartOptions {
    fn from(config: &PackageConfig) -> Self {
        StartOptions::Package {
            run_test: config.run_test,
            run_trace_analysis: config.run_trace_analysis,
            parameters: config.parameters.clone(),
        }
    }
}

impl From<&ProjectConfig> for StartOptions {
    fn from(config: &ProjectConfig) -> Self {
        StartOptions::Project {
            job_mode: config.job_mode,
        }
    }
}

/// Requests sent from the scheduler side to the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentRequest {
    /// Create the workspace directory if it does not exist
    EnsureWorkspace { path: String },

    /// Probe a path on the agent filesystem
    FileExists { path: String },

    /// Query a tool setting by name
    GetSetting { name: String },

    /// List processes matching an image name, optionally killing them
    ListProcesses { image: String, kill: bool },

    /// Cooperatively shut the tool down, killing its image as a fallback
    StopTool { image: String, timeout_secs: u64 },

    /// Enumerate test artifacts under a directory
    ScanFolder {
        dir: String,
        recursive: bool,
        scan_mode: ScanMode,
    },

    /// Push a test configuration into the tool
    LoadConfig {
        test_config: TestConfig,
        execution_config: ExecutionConfig,
    },

    /// Open a test artifact
    OpenArtifact { path: String, options: OpenOptions },

    /// Run the tool's checks on an open artifact
    Validate { path: String },

    /// Begin asynchronous execution of an open artifact
    StartExecution { path: String, options: StartOptions },

    /// Poll the state of a running execution
    ExecutionState { execution_id: Uuid },

    /// Request graceful abort of a running execution
    AbortExecution { execution_id: Uuid },

    /// Collect result and report location of a finished execution
    ExecutionResult { execution_id: Uuid },

    /// Close the open artifact
    CloseArtifact { path: String },

    /// Wait for the tool to return to an idle state
    WaitForIdle { timeout_secs: u64 },
}

impl AgentRequest {
    /// Operation name for logging
    pub fn name(&self) -> &'static str {
        match self {
            AgentRequest::EnsureWorkspace { .. } => "ensure_workspace",
            AgentRequest::FileExists { .. } => "file_exists",
            AgentRequest::GetSetting { .. } => "get_setting",
            AgentRequest::ListProcesses { .. } => "list_processes",
            AgentRequest::StopTool { .. } => "stop_tool",
            AgentRequest::ScanFolder { .. } => "scan_folder",
            AgentRequest::LoadConfig { .. } => "load_config",
            AgentRequest::OpenArtifact { .. } => "open_artifact",
            AgentRequest::Validate { .. } => "validate",
            AgentRequest::StartExecution { .. } => "start_execution",
            AgentRequest::ExecutionState { .. } => "execution_state",
            AgentRequest::AbortExecution { .. } => "abort_execution",
            AgentRequest::ExecutionResult { .. } => "execution_result",
            AgentRequest::CloseArtifact { .. } => "close_artifact",
            AgentRequest::WaitForIdle { .. } => "wait_for_idle",
        }
    }
}

/// A test artifact found by a folder scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMember {
    pub kind: ArtifactKind,
    pub path: String,
}

/// Seriousness of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seriousness {
    Note,
    Warning,
    Error,
}

/// A single finding reported by the tool's artifact checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub file_path: String,
    pub seriousness: Seriousness,
    pub description: String,
    pub line: u64,
}

/// Responses sent from the agent back to the scheduler side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentResponse {
    /// Operation completed without a payload
    Ack,

    /// Boolean payload
    Bool { value: bool },

    /// Tool setting value
    Setting { value: String },

    /// Process names found by a process list
    Processes { names: Vec<String> },

    /// Artifacts found by a folder scan
    Artifacts { members: Vec<FolderMember> },

    /// Findings of an artifact validation
    Findings { findings: Vec<ValidationFinding> },

    /// Execution started, identified by an opaque id
    ExecutionStarted { execution_id: Uuid },

    /// Current execution state string
    State { state: String },

    /// Collected execution result and report database path
    RunResult { result: String, report_db: String },

    /// In-band agent-side failure
    Error { error: AgentError },
}

/// Agent-side error types carried in-band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum AgentError {
    /// Tool-level operation failed
    Tool { message: String },

    /// Filesystem or process I/O failed on the agent
    Io { message: String },

    /// The tool returned the unset sentinel for a setting
    SettingUnset { name: String },

    /// No execution is known under the given id
    UnknownExecution { execution_id: Uuid },

    /// The agent cannot perform the requested operation
    Unsupported { reason: String },
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::Tool { message } => write!(f, "Tool error: {}", message),
            AgentError::Io { message } => write!(f, "IO error: {}", message),
            AgentError::SettingUnset { name } => write!(f, "Setting '{}' is not set", name),
            AgentError::UnknownExecution { execution_id } => {
                write!(f, "Unknown execution: {}", execution_id)
            }
            AgentError::Unsupported { reason } => write!(f, "Unsupported operation: {}", reason),
        }
    }
}

impl std::error::Error for AgentError {}

/// Message envelope for all remote communications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub protocol_version: u32,
    pub correlation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message: T,
}

impl<T> MessageEnvelope<T> {
    /// Create a new envelope with a fresh correlation id
    pub fn new(message: T) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            correlation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            message,
        }
    }

    /// Create a reply envelope carrying the correlation id of a request
    pub fn reply_to(correlation_id: Uuid, message: T) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            correlation_id,
            timestamp: Utc::now(),
            message,
        }
    }

    /// Check if protocol version is compatible
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}
