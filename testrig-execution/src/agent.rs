//! Agent-side request handling
//!
//! `AgentService` executes scheduler requests against the automation tool,
//! the host filesystem and the host process table. Handling is total:
//! every request produces exactly one response, and failures travel back
//! in-band as [`AgentResponse::Error`] rather than tearing the channel
//! down.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use testrig_config::ScanMode;
use testrig_remote::{
    AgentChannel, AgentError, AgentRequest, AgentResponse, ArtifactKind, FolderMember,
    MessageEnvelope, MessageTransport, RemoteError, SETTING_UNSET,
};

use crate::process::ProcessControl;
use crate::tool::{AutomationTool, ToolError};

/// Request handler running on the agent host.
pub struct AgentService<T, P> {
    tool: T,
    processes: P,
    executions: Mutex<HashMap<Uuid, String>>,
}

impl<T: AutomationTool, P: ProcessControl> AgentService<T, P> {
    pub fn new(tool: T, processes: P) -> Self {
        Self {
            tool,
            processes,
            executions: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one request. Never fails; agent-side problems become
    /// in-band error responses.
    pub async fn handle(&self, request: AgentRequest) -> AgentResponse {
        match request {
            AgentRequest::EnsureWorkspace { path } => {
                match tokio::fs::create_dir_all(&path).await {
                    Ok(()) => AgentResponse::Ack,
                    Err(err) => io_error(err),
                }
            }
            AgentRequest::FileExists { path } => match tokio::fs::try_exists(&path).await {
                Ok(value) => AgentResponse::Bool { value },
                Err(err) => io_error(err),
            },
            AgentRequest::GetSetting { name } => match self.tool.get_setting(&name).await {
                Ok(value) if value == SETTING_UNSET => AgentResponse::Error {
                    error: AgentError::SettingUnset { name },
                },
                Ok(value) => AgentResponse::Setting { value },
                Err(err) => tool_error(err),
            },
            AgentRequest::ListProcesses { image, kill } => {
                let names = self.processes.list(&image);
                if kill {
                    let killed = self.processes.kill(&image);
                    debug!("Killed {} process(es) matching {}", killed, image);
                }
                AgentResponse::Processes { names }
            }
            AgentRequest::StopTool {
                image,
                timeout_secs,
            } => {
                let stopped = match self.tool.stop(timeout_secs).await {
                    Ok(stopped) => stopped,
                    Err(err) => {
                        warn!("Cooperative tool stop failed: {}", err);
                        false
                    }
                };
                let value = if stopped {
                    true
                } else {
                    // Fall back to killing the tool image outright.
                    let killed = self.processes.kill(&image);
                    killed > 0 || self.processes.list(&image).is_empty()
                };
                AgentResponse::Bool { value }
            }
            AgentRequest::ScanFolder {
                dir,
                recursive,
                scan_mode,
            } => match scan_folder(&dir, recursive, scan_mode) {
                Ok(members) => AgentResponse::Artifacts { members },
                Err(err) => io_error(err),
            },
            AgentRequest::LoadConfig {
                test_config,
                execution_config,
            } => {
                match self
                    .tool
                    .load_configuration(&test_config, &execution_config)
                    .await
                {
                    Ok(()) => AgentResponse::Ack,
                    Err(err) => tool_error(err),
                }
            }
            AgentRequest::OpenArtifact { path, options } => {
                match self.tool.open_artifact(&path, &options).await {
                    Ok(()) => AgentResponse::Ack,
                    Err(err) => tool_error(err),
                }
            }
            AgentRequest::Validate { path } => match self.tool.check_artifact(&path).await {
                Ok(findings) => AgentResponse::Findings { findings },
                Err(err) => tool_error(err),
            },
            AgentRequest::StartExecution { path, options } => {
                match self.tool.start_execution(&path, &options).await {
                    Ok(token) => {
                        let execution_id = Uuid::new_v4();
                        self.executions.lock().await.insert(execution_id, token);
                        AgentResponse::ExecutionStarted { execution_id }
                    }
                    Err(err) => tool_error(err),
                }
            }
            AgentRequest::ExecutionState { execution_id } => {
                let Some(token) = self.execution_token(execution_id).await else {
                    return unknown_execution(execution_id);
                };
                match self.tool.execution_state(&token).await {
                    Ok(state) => AgentResponse::State { state },
                    Err(err) => tool_error(err),
                }
            }
            AgentRequest::AbortExecution { execution_id } => {
                let Some(token) = self.execution_token(execution_id).await else {
                    return unknown_execution(execution_id);
                };
                match self.tool.abort_execution(&token).await {
                    Ok(()) => AgentResponse::Ack,
                    Err(err) => tool_error(err),
                }
            }
            AgentRequest::ExecutionResult { execution_id } => {
                // Collecting consumes the handle, finished or not.
                let Some(token) = self.executions.lock().await.remove(&execution_id) else {
                    return unknown_execution(execution_id);
                };
                match self.tool.execution_result(&token).await {
                    Ok(run) => AgentResponse::RunResult {
                        result: run.result,
                        report_db: run.report_db,
                    },
                    Err(err) => tool_error(err),
                }
            }
            AgentRequest::CloseArtifact { path } => {
                match self.tool.close_artifact(&path).await {
                    Ok(value) => AgentResponse::Bool { value },
                    Err(err) => tool_error(err),
                }
            }
            AgentRequest::WaitForIdle { timeout_secs } => {
                match self.tool.wait_for_idle(timeout_secs).await {
                    Ok(value) => AgentResponse::Bool { value },
                    Err(err) => tool_error(err),
                }
            }
        }
    }

    /// Serve requests from a transport until the peer goes away.
    pub async fn serve<M: MessageTransport>(&self, transport: &mut M) -> Result<(), RemoteError> {
        loop {
            let envelope: MessageEnvelope<AgentRequest> = match transport.receive().await {
                Ok(envelope) => envelope,
                Err(RemoteError::ConnectionClosed) => {
                    debug!("Scheduler channel closed, stopping agent service");
                    return Ok(());
                }
                Err(err) => return Err(err),
            };

            let correlation_id = envelope.correlation_id;
            debug!("Handling {} request", envelope.message.name());
            let response = self.handle(envelope.message).await;
            transport
                .send(&MessageEnvelope::reply_to(correlation_id, response))
                .await?;
        }
    }

    async fn execution_token(&self, execution_id: Uuid) -> Option<String> {
        self.executions.lock().await.get(&execution_id).cloned()
    }
}

/// In-process channel wired straight into an [`AgentService`].
///
/// Used when scheduler and agent share a process, and by tests.
pub struct LocalAgent<T, P> {
    service: Arc<AgentService<T, P>>,
}

impl<T, P> LocalAgent<T, P> {
    pub fn new(service: Arc<AgentService<T, P>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<T: AutomationTool, P: ProcessControl> AgentChannel for LocalAgent<T, P> {
    async fn call(&self, request: AgentRequest) -> Result<AgentResponse, RemoteError> {
        Ok(self.service.handle(request).await)
    }
}

fn tool_error(err: ToolError) -> AgentResponse {
    AgentResponse::Error {
        error: AgentError::Tool {
            message: err.to_string(),
        },
    }
}

fn io_error(err: io::Error) -> AgentResponse {
    AgentResponse::Error {
        error: AgentError::Io {
            message: err.to_string(),
        },
    }
}

fn unknown_execution(execution_id: Uuid) -> AgentResponse {
    AgentResponse::Error {
        error: AgentError::UnknownExecution { execution_id },
    }
}

/// Enumerate test artifacts under a directory, packages before projects,
/// each group sorted by path.
fn scan_folder(
    dir: &str,
    recursive: bool,
    scan_mode: ScanMode,
) -> Result<Vec<FolderMember>, io::Error> {
    if !Path::new(dir).is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", dir),
        ));
    }

    let mut walker = WalkDir::new(dir);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut packages = Vec::new();
    let mut projects = Vec::new();
    for entry in walker.into_iter().filter_map(|entry| entry.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        match scan_kind(name, scan_mode) {
            Some(ArtifactKind::Package) => packages.push(entry.path().display().to_string()),
            Some(ArtifactKind::Project) => projects.push(entry.path().display().to_string()),
            None => {}
        }
    }

    packages.sort();
    projects.sort();
    Ok(packages
        .into_iter()
        .map(|path| FolderMember {
            kind: ArtifactKind::Package,
            path,
        })
        .chain(projects.into_iter().map(|path| FolderMember {
            kind: ArtifactKind::Project,
            path,
        }))
        .collect())
}

/// Match a file name against the artifact extensions the scan asks for,
/// case-insensitively.
fn scan_kind(name: &str, scan_mode: ScanMode) -> Option<ArtifactKind> {
    let matches = |kind: ArtifactKind| {
        let extension = kind.extension();
        name.len()
            .checked_sub(extension.len())
            .and_then(|start| name.get(start..))
            .is_some_and(|tail| tail.eq_ignore_ascii_case(extension))
    };

    if scan_mode.includes_packages() && matches(ArtifactKind::Package) {
        Some(ArtifactKind::Package)
    } else if scan_mode.includes_projects() && matches(ArtifactKind::Project) {
        Some(ArtifactKind::Project)
    } else {
        None
    }
}
