//! Build-step orchestration
//!
//! Ties the pieces together for one scheduled test step: workspace
//! preparation, the running-instance precondition, environment
//! expansion, path resolution, driving the protocol, recording outcomes
//! and tearing tool instances down after a failed verdict.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use testrig_config::{
    expand, EnvVars, ExecutionConfig, FolderConfig, PackageConfig, ProjectConfig, TestConfig,
    ToolConfig,
};
use testrig_remote::{AgentChannel, AgentRequest, AgentResponse};

use crate::cancel::{cancel_pair, CancelHandle, CancelSignal};
use crate::driver::{ExecutionDriver, ExecutionOutcome};
use crate::error::{ExecutionError, Result};
use crate::instances::InstanceManager;
use crate::paths::PathResolver;

/// One collected execution outcome with its position in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    /// Index of this outcome within the session, 0-based
    pub test_id: usize,
    /// Resolved artifact path the outcome belongs to
    pub artifact: String,
    pub outcome: ExecutionOutcome,
}

/// Per-build state shared by every test step of one scheduled run.
pub struct TestSession {
    workspace: PathBuf,
    env: EnvVars,
    outcomes: Vec<OutcomeRecord>,
    cancel_handle: Arc<CancelHandle>,
    cancel: CancelSignal,
}

impl TestSession {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self::with_env(workspace, EnvVars::new())
    }

    pub fn with_env(workspace: impl Into<PathBuf>, env: EnvVars) -> Self {
        let (handle, signal) = cancel_pair();
        Self {
            workspace: workspace.into(),
            env,
            outcomes: Vec::new(),
            cancel_handle: Arc::new(handle),
            cancel: signal,
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn env(&self) -> &EnvVars {
        &self.env
    }

    /// Outcomes recorded so far, in execution order.
    pub fn outcomes(&self) -> &[OutcomeRecord] {
        &self.outcomes
    }

    /// Handle the embedding scheduler uses to interrupt the run.
    pub fn cancel_handle(&self) -> Arc<CancelHandle> {
        self.cancel_handle.clone()
    }

    fn record(&mut self, artifact: String, outcome: ExecutionOutcome) {
        let test_id = self.outcomes.len();
        self.outcomes.push(OutcomeRecord {
            test_id,
            artifact,
            outcome,
        });
    }
}

/// What a single test step executes.
enum Target<'a> {
    Package {
        file: &'a str,
        config: &'a PackageConfig,
    },
    Project {
        file: &'a str,
        config: &'a ProjectConfig,
    },
    Folder {
        dir: &'a str,
        config: &'a FolderConfig,
    },
}

/// Target with expanded configs and agent-side resolved paths.
enum ResolvedTarget {
    Package { path: String, config: PackageConfig },
    Project { path: String, config: ProjectConfig },
    Folder { dir: String, config: FolderConfig },
}

/// Runs complete test steps against one agent channel.
pub struct TestOrchestrator<C> {
    channel: C,
    tool: ToolConfig,
}

impl<C: AgentChannel> TestOrchestrator<C> {
    pub fn new(channel: C, tool: ToolConfig) -> Self {
        Self { channel, tool }
    }

    /// Run a single test package as one build step.
    pub async fn run_package(
        &self,
        session: &mut TestSession,
        file: &str,
        test_config: &TestConfig,
        package_config: &PackageConfig,
        execution_config: &ExecutionConfig,
    ) -> Result<()> {
        let target = Target::Package {
            file,
            config: package_config,
        };
        self.run(session, target, test_config, execution_config).await
    }

    /// Run a single test project as one build step.
    pub async fn run_project(
        &self,
        session: &mut TestSession,
        file: &str,
        test_config: &TestConfig,
        project_config: &ProjectConfig,
        execution_config: &ExecutionConfig,
    ) -> Result<()> {
        let target = Target::Project {
            file,
            config: project_config,
        };
        self.run(session, target, test_config, execution_config).await
    }

    /// Run every matching artifact below a test folder as one build step.
    pub async fn run_folder(
        &self,
        session: &mut TestSession,
        dir: &str,
        test_config: &TestConfig,
        folder_config: &FolderConfig,
        execution_config: &ExecutionConfig,
    ) -> Result<()> {
        let target = Target::Folder {
            dir,
            config: folder_config,
        };
        self.run(session, target, test_config, execution_config).await
    }

    async fn run(
        &self,
        session: &mut TestSession,
        target: Target<'_>,
        test_config: &TestConfig,
        execution_config: &ExecutionConfig,
    ) -> Result<()> {
        self.ensure_workspace(session).await?;
        self.require_tool_instance().await?;

        let execution_config = execution_config.expand(session.env());
        let mut test_config = test_config.expand(session.env());

        let resolver = PathResolver::new(&self.channel, session.workspace(), &self.tool);
        let resolved = match target {
            Target::Package { file, config } => ResolvedTarget::Package {
                path: resolver
                    .resolve_artifact(&required_artifact(file, session.env())?)
                    .await?,
                config: config.expand(session.env()),
            },
            Target::Project { file, config } => ResolvedTarget::Project {
                path: resolver
                    .resolve_artifact(&required_artifact(file, session.env())?)
                    .await?,
                config: config.expand(session.env()),
            },
            Target::Folder { dir, config } => ResolvedTarget::Folder {
                dir: resolver
                    .resolve_workspace_dir(&expand(dir, session.env()))
                    .await?,
                config: config.expand(session.env()),
            },
        };
        test_config.bench_config = resolver
            .resolve_config_file(&test_config.bench_config)
            .await?;
        test_config.scenario_config = resolver
            .resolve_config_file(&test_config.scenario_config)
            .await?;

        let driver = ExecutionDriver::new(
            &self.channel,
            &test_config,
            &execution_config,
            session.cancel.clone(),
        );
        let passed = match resolved {
            ResolvedTarget::Package { path, config } => {
                let verdict = driver.run_package(&path, &config).await?;
                if let Some(outcome) = verdict.outcome {
                    session.record(verdict.artifact, outcome);
                }
                verdict.passed
            }
            ResolvedTarget::Project { path, config } => {
                let verdict = driver.run_project(&path, &config).await?;
                if let Some(outcome) = verdict.outcome {
                    session.record(verdict.artifact, outcome);
                }
                verdict.passed
            }
            ResolvedTarget::Folder { dir, config } => {
                let verdict = driver.run_folder(&dir, &config).await?;
                for member in verdict.members {
                    if let Some(outcome) = member.outcome {
                        session.record(member.artifact, outcome);
                    }
                }
                verdict.passed
            }
        };

        if passed {
            return Ok(());
        }
        if execution_config.stop_on_error {
            self.teardown().await;
        }
        Err(ExecutionError::TestFailed)
    }

    async fn ensure_workspace(&self, session: &TestSession) -> Result<()> {
        let path = session.workspace().display().to_string();
        match self
            .channel
            .call(AgentRequest::EnsureWorkspace { path })
            .await?
        {
            AgentResponse::Ack => Ok(()),
            AgentResponse::Error { error } => Err(ExecutionError::Configuration(format!(
                "Failed to prepare workspace: {}",
                error
            ))),
            _ => Err(ExecutionError::UnexpectedResponse("ensure_workspace")),
        }
    }

    async fn require_tool_instance(&self) -> Result<()> {
        let instances = InstanceManager::new(&self.channel, &self.tool);
        let running = instances.check_tool(false).await?;
        if running.is_empty() {
            return Err(ExecutionError::Configuration(format!(
                "No running {} instance found, please configure one at first!",
                self.tool.tool_name
            )));
        }
        Ok(())
    }

    /// Tear tool instances down after a failed verdict. Failures here are
    /// logged only; the build already failed.
    async fn teardown(&self) {
        let instances = InstanceManager::new(&self.channel, &self.tool);

        info!("- Closing running {} instance...", self.tool.tool_name);
        if let Err(err) = instances.close_tool().await {
            warn!("{}", err);
        }

        info!(
            "- Stopping running {} instances...",
            self.tool.service_executable
        );
        if let Err(err) = instances.check_service(true).await {
            warn!("{}", err);
        }
    }
}

fn required_artifact(file: &str, env: &EnvVars) -> Result<String> {
    let expanded = expand(file, env);
    if expanded.trim().is_empty() {
        return Err(ExecutionError::Configuration(
            "No package or project file declared!".to_string(),
        ));
    }
    Ok(expanded)
}
