//! Five-phase execution protocol driver
//!
//! Packages and projects run through the same skeleton: load the test
//! configuration, open the artifact, validate it, run it under the poll
//! monitor, close it. The phases are asymmetric on failure: a failed
//! open leaves nothing to close, a failed validation still closes, a
//! timeout aborts the execution but still collects whatever result the
//! tool reports.

use std::path::Path;
use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use testrig_config::{
    ExecutionConfig, FolderConfig, MemberFailurePolicy, PackageConfig, ProjectConfig, TestConfig,
};
use testrig_remote::{
    AgentChannel, AgentError, AgentRequest, AgentResponse, ArtifactKind, OpenOptions,
    Seriousness, StartOptions, RUNNING_STATE,
};

use crate::cancel::CancelSignal;
use crate::error::{ExecutionError, Result};

/// Poll cadence of the execution monitor.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Per-kind knobs of the protocol skeleton.
#[derive(Debug, Clone)]
pub struct ArtifactStrategy {
    kind: ArtifactKind,
    open_options: OpenOptions,
    start_options: StartOptions,
}

impl ArtifactStrategy {
    pub fn package(config: &PackageConfig) -> Self {
        Self {
            kind: ArtifactKind::Package,
            open_options: OpenOptions::Package,
            start_options: StartOptions::from(config),
        }
    }

    pub fn project(config: &ProjectConfig) -> Self {
        Self {
            kind: ArtifactKind::Project,
            open_options: OpenOptions::from(config),
            start_options: StartOptions::from(config),
        }
    }

    fn noun(&self) -> &'static str {
        self.kind.noun()
    }

    /// Capitalized noun for result lines.
    fn title(&self) -> &'static str {
        match self.kind {
            ArtifactKind::Package => "Package",
            ArtifactKind::Project => "Project",
        }
    }
}

/// Outcome collected from one finished execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Verdict string reported by the tool
    pub result: String,
    /// Directory holding the tool's report database
    pub report_dir: String,
}

/// Verdict of one artifact run.
#[derive(Debug, Clone)]
pub struct ArtifactVerdict {
    pub artifact: String,
    pub passed: bool,
    pub outcome: Option<ExecutionOutcome>,
}

impl ArtifactVerdict {
    fn failed(artifact: &str) -> Self {
        Self {
            artifact: artifact.to_string(),
            passed: false,
            outcome: None,
        }
    }
}

/// Aggregated verdict of a folder run.
#[derive(Debug, Clone)]
pub struct FolderVerdict {
    pub passed: bool,
    pub members: Vec<ArtifactVerdict>,
}

/// Drives the execution protocol for one expanded configuration.
pub struct ExecutionDriver<'a, C> {
    channel: &'a C,
    test_config: &'a TestConfig,
    execution_config: &'a ExecutionConfig,
    cancel: CancelSignal,
}

impl<'a, C: AgentChannel> ExecutionDriver<'a, C> {
    pub fn new(
        channel: &'a C,
        test_config: &'a TestConfig,
        execution_config: &'a ExecutionConfig,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            channel,
            test_config,
            execution_config,
            cancel,
        }
    }

    /// Run a single package through the protocol.
    pub async fn run_package(
        &self,
        path: &str,
        config: &PackageConfig,
    ) -> Result<ArtifactVerdict> {
        self.run_artifact(path, &ArtifactStrategy::package(config))
            .await
    }

    /// Run a single project through the protocol.
    pub async fn run_project(
        &self,
        path: &str,
        config: &ProjectConfig,
    ) -> Result<ArtifactVerdict> {
        self.run_artifact(path, &ArtifactStrategy::project(config))
            .await
    }

    /// Scan a folder and run every matching artifact.
    pub async fn run_folder(&self, dir: &str, config: &FolderConfig) -> Result<FolderVerdict> {
        let request = AgentRequest::ScanFolder {
            dir: dir.to_string(),
            recursive: config.recursive_scan,
            scan_mode: config.scan_mode,
        };
        let members = match self.channel.call(request).await? {
            AgentResponse::Artifacts { members } => members,
            AgentResponse::Error { error } => {
                log_tool_error(&error);
                return Ok(FolderVerdict {
                    passed: false,
                    members: Vec::new(),
                });
            }
            _ => return Err(ExecutionError::UnexpectedResponse("scan_folder")),
        };

        if members.is_empty() {
            info!("No matching test artifacts found.");
            return Ok(FolderVerdict {
                passed: true,
                members: Vec::new(),
            });
        }
        info!("-> Found {} test artifact(s).", members.len());

        let mut verdicts = Vec::new();
        let mut passed = true;
        for member in members {
            info!("Executing {} {}...", member.kind.noun(), member.path);
            let verdict = match member.kind {
                ArtifactKind::Package => {
                    self.run_package(&member.path, &config.package_config).await?
                }
                ArtifactKind::Project => {
                    self.run_project(&member.path, &config.project_config).await?
                }
            };
            passed &= verdict.passed;
            let member_failed = !verdict.passed;
            verdicts.push(verdict);
            if member_failed && config.failure_policy == MemberFailurePolicy::HaltOnFailure {
                warn!(
                    "Skipping remaining folder members after failed {}!",
                    member.kind.noun()
                );
                break;
            }
        }
        Ok(FolderVerdict {
            passed,
            members: verdicts,
        })
    }

    async fn run_artifact(&self, path: &str, strategy: &ArtifactStrategy) -> Result<ArtifactVerdict> {
        if !self.load_config().await? {
            return Ok(ArtifactVerdict::failed(path));
        }

        if !self.open(path, strategy).await? {
            // Nothing was opened, so there is nothing to close.
            return Ok(ArtifactVerdict::failed(path));
        }

        let mut passed = true;
        if self.execution_config.check_test_file {
            passed = self.validate(path, strategy).await?;
        }

        let mut outcome = None;
        if passed {
            outcome = self.run(path, strategy).await?;
            passed = outcome.is_some();
        }

        self.close(path, strategy).await?;

        Ok(ArtifactVerdict {
            artifact: path.to_string(),
            passed,
            outcome,
        })
    }

    async fn load_config(&self) -> Result<bool> {
        info!("- Loading test configuration...");
        let request = AgentRequest::LoadConfig {
            test_config: self.test_config.clone(),
            execution_config: self.execution_config.clone(),
        };
        match self.channel.call(request).await? {
            AgentResponse::Ack => Ok(true),
            AgentResponse::Error { error } => {
                log_tool_error(&error);
                Ok(false)
            }
            _ => Err(ExecutionError::UnexpectedResponse("load_config")),
        }
    }

    async fn open(&self, path: &str, strategy: &ArtifactStrategy) -> Result<bool> {
        info!("- Opening {} {}...", strategy.noun(), path);
        let request = AgentRequest::OpenArtifact {
            path: path.to_string(),
            options: strategy.open_options.clone(),
        };
        match self.channel.call(request).await? {
            AgentResponse::Ack => Ok(true),
            AgentResponse::Error { error } => {
                error!("-> Opening {} failed!", strategy.noun());
                log_tool_error(&error);
                Ok(false)
            }
            _ => Err(ExecutionError::UnexpectedResponse("open_artifact")),
        }
    }

    async fn validate(&self, path: &str, strategy: &ArtifactStrategy) -> Result<bool> {
        info!("- Validating {}...", strategy.noun());
        let request = AgentRequest::Validate {
            path: path.to_string(),
        };
        match self.channel.call(request).await? {
            AgentResponse::Findings { findings } => {
                if findings.is_empty() {
                    info!("-> {} validated successfully!", strategy.title());
                    return Ok(true);
                }
                let mut passed = true;
                for finding in &findings {
                    let line = format!(
                        "{} (line {}): {}",
                        finding.file_path, finding.line, finding.description
                    );
                    match finding.seriousness {
                        Seriousness::Note => info!("{}", line),
                        Seriousness::Warning => warn!("{}", line),
                        Seriousness::Error => {
                            error!("{}", line);
                            passed = false;
                        }
                    }
                }
                Ok(passed)
            }
            AgentResponse::Error { error } => {
                log_tool_error(&error);
                Ok(false)
            }
            _ => Err(ExecutionError::UnexpectedResponse("validate")),
        }
    }

    /// RUN phase: start, monitor, collect, settle.
    async fn run(&self, path: &str, strategy: &ArtifactStrategy) -> Result<Option<ExecutionOutcome>> {
        info!("- Running {}...", strategy.noun());
        let request = AgentRequest::StartExecution {
            path: path.to_string(),
            options: strategy.start_options.clone(),
        };
        let execution_id = match self.channel.call(request).await? {
            AgentResponse::ExecutionStarted { execution_id } => execution_id,
            AgentResponse::Error { error } => {
                log_tool_error(&error);
                return Ok(None);
            }
            _ => return Err(ExecutionError::UnexpectedResponse("start_execution")),
        };

        if !self.monitor(execution_id).await? {
            return Ok(None);
        }

        let Some(outcome) = self.collect(execution_id, strategy).await? else {
            return Ok(None);
        };

        self.wait_for_idle().await?;
        Ok(Some(outcome))
    }

    /// Poll the execution until it leaves the running state.
    ///
    /// Returns `false` when the result must not be collected: the state
    /// query failed in-band, or the timeout abort did.
    async fn monitor(&self, execution_id: Uuid) -> Result<bool> {
        let timeout = self.execution_config.parsed_timeout();
        let started = tokio::time::Instant::now();
        let mut cancel = self.cancel.clone();
        let mut tick: u64 = 0;

        loop {
            let request = AgentRequest::ExecutionState { execution_id };
            let state = match self.channel.call(request).await? {
                AgentResponse::State { state } => state,
                AgentResponse::Error { error } => {
                    log_tool_error(&error);
                    return Ok(false);
                }
                _ => return Err(ExecutionError::UnexpectedResponse("execution_state")),
            };
            if state != RUNNING_STATE {
                return Ok(true);
            }

            if tick % 60 == 0 {
                info!("-- tick...");
            }

            if timeout > 0 && started.elapsed() > Duration::from_secs(timeout) {
                warn!(
                    "-> Test execution timeout of {} seconds reached! Aborting now...",
                    timeout
                );
                return self.abort(execution_id).await;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    error!("Test execution has been interrupted!");
                    return Err(ExecutionError::Interrupted);
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
            tick += 1;
        }
    }

    async fn abort(&self, execution_id: Uuid) -> Result<bool> {
        let request = AgentRequest::AbortExecution { execution_id };
        match self.channel.call(request).await? {
            AgentResponse::Ack => Ok(true),
            AgentResponse::Error { error } => {
                log_tool_error(&error);
                Ok(false)
            }
            _ => Err(ExecutionError::UnexpectedResponse("abort_execution")),
        }
    }

    async fn collect(
        &self,
        execution_id: Uuid,
        strategy: &ArtifactStrategy,
    ) -> Result<Option<ExecutionOutcome>> {
        let request = AgentRequest::ExecutionResult { execution_id };
        match self.channel.call(request).await? {
            AgentResponse::RunResult { result, report_db } => {
                info!(
                    "-> {} execution completed with result: {}",
                    strategy.title(),
                    result
                );
                let report_dir = Path::new(&report_db)
                    .parent()
                    .map(|dir| dir.display().to_string())
                    .unwrap_or_default();
                info!("-> Test report directory: {}", report_dir);
                Ok(Some(ExecutionOutcome { result, report_dir }))
            }
            AgentResponse::Error { error } => {
                log_tool_error(&error);
                Ok(None)
            }
            _ => Err(ExecutionError::UnexpectedResponse("execution_result")),
        }
    }

    async fn wait_for_idle(&self) -> Result<()> {
        let timeout = self.execution_config.parsed_timeout();
        let request = AgentRequest::WaitForIdle {
            timeout_secs: timeout,
        };
        match self.channel.call(request).await? {
            AgentResponse::Bool { value: true } => {}
            AgentResponse::Bool { value: false } => {
                warn!("-> Post-execution timeout of {} seconds reached!", timeout);
            }
            AgentResponse::Error { error } => {
                // Does not overturn the collected outcome.
                log_tool_error(&error);
            }
            _ => return Err(ExecutionError::UnexpectedResponse("wait_for_idle")),
        }
        Ok(())
    }

    async fn close(&self, path: &str, strategy: &ArtifactStrategy) -> Result<()> {
        info!("- Closing {}...", strategy.noun());
        let request = AgentRequest::CloseArtifact {
            path: path.to_string(),
        };
        match self.channel.call(request).await? {
            AgentResponse::Bool { value: true } => {
                info!("-> {} closed successfully.", strategy.title());
            }
            AgentResponse::Bool { value: false } => {
                warn!("-> Closing {} failed!", strategy.noun());
            }
            AgentResponse::Error { error } => {
                warn!("-> Closing {} failed!", strategy.noun());
                log_tool_error(&error);
            }
            _ => return Err(ExecutionError::UnexpectedResponse("close_artifact")),
        }
        Ok(())
    }
}

fn log_tool_error(error: &AgentError) {
    match error {
        AgentError::Tool { message } => error!("Caught tool error: {}", message),
        other => error!("Caught agent error: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use testrig_remote::{FolderMember, ValidationFinding};

    use crate::cancel::cancel_pair;
    use crate::testkit::ScriptChannel;

    fn configs(timeout: &str) -> (TestConfig, ExecutionConfig) {
        let mut execution = ExecutionConfig::default();
        execution.timeout = timeout.to_string();
        (TestConfig::default(), execution)
    }

    fn driver<'a>(
        channel: &'a ScriptChannel,
        test_config: &'a TestConfig,
        execution_config: &'a ExecutionConfig,
    ) -> ExecutionDriver<'a, ScriptChannel> {
        let (_, signal) = cancel_pair();
        ExecutionDriver::new(channel, test_config, execution_config, signal)
    }

    fn success_response(request: &AgentRequest) -> AgentResponse {
        match request {
            AgentRequest::LoadConfig { .. } => AgentResponse::Ack,
            AgentRequest::OpenArtifact { .. } => AgentResponse::Ack,
            AgentRequest::Validate { .. } => AgentResponse::Findings {
                findings: Vec::new(),
            },
            AgentRequest::StartExecution { .. } => AgentResponse::ExecutionStarted {
                execution_id: Uuid::nil(),
            },
            AgentRequest::ExecutionState { .. } => AgentResponse::State {
                state: "IDLE".to_string(),
            },
            AgentRequest::AbortExecution { .. } => AgentResponse::Ack,
            AgentRequest::ExecutionResult { .. } => AgentResponse::RunResult {
                result: "SUCCESS".to_string(),
                report_db: "/reports/run1/report.db".to_string(),
            },
            AgentRequest::WaitForIdle { .. } => AgentResponse::Bool { value: true },
            AgentRequest::CloseArtifact { .. } => AgentResponse::Bool { value: true },
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_package_run_walks_all_phases() {
        let channel = ScriptChannel::new(|request| Ok(success_response(request)));
        let (test_config, execution_config) = configs("3600");
        let driver = driver(&channel, &test_config, &execution_config);

        let verdict = driver
            .run_package("demo.pkg", &PackageConfig::default())
            .await
            .unwrap();

        assert!(verdict.passed);
        assert_eq!(
            verdict.outcome,
            Some(ExecutionOutcome {
                result: "SUCCESS".to_string(),
                report_dir: "/reports/run1".to_string(),
            })
        );
        assert_eq!(
            channel.request_names(),
            vec![
                "load_config",
                "open_artifact",
                "validate",
                "start_execution",
                "execution_state",
                "execution_result",
                "wait_for_idle",
                "close_artifact",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_load_config_skips_everything() {
        let channel = ScriptChannel::new(|request| match request {
            AgentRequest::LoadConfig { .. } => Ok(AgentResponse::Error {
                error: AgentError::Tool {
                    message: "configuration start failed".to_string(),
                },
            }),
            other => panic!("unexpected request {:?}", other),
        });
        let (test_config, execution_config) = configs("3600");
        let driver = driver(&channel, &test_config, &execution_config);

        let verdict = driver
            .run_package("demo.pkg", &PackageConfig::default())
            .await
            .unwrap();

        assert!(!verdict.passed);
        assert_eq!(channel.request_names(), vec!["load_config"]);
    }

    #[tokio::test]
    async fn test_failed_open_leaves_nothing_to_close() {
        let channel = ScriptChannel::new(|request| match request {
            AgentRequest::OpenArtifact { .. } => Ok(AgentResponse::Error {
                error: AgentError::Tool {
                    message: "artifact is locked".to_string(),
                },
            }),
            other => Ok(success_response(other)),
        });
        let (test_config, execution_config) = configs("3600");
        let driver = driver(&channel, &test_config, &execution_config);

        let verdict = driver
            .run_package("demo.pkg", &PackageConfig::default())
            .await
            .unwrap();

        assert!(!verdict.passed);
        assert!(verdict.outcome.is_none());
        assert_eq!(channel.request_names(), vec!["load_config", "open_artifact"]);
    }

    #[tokio::test]
    async fn test_validation_error_skips_run_but_closes() {
        let channel = ScriptChannel::new(|request| match request {
            AgentRequest::Validate { path } => Ok(AgentResponse::Findings {
                findings: vec![
                    ValidationFinding {
                        file_path: path.clone(),
                        seriousness: Seriousness::Warning,
                        description: "parameter unused".to_string(),
                        line: 3,
                    },
                    ValidationFinding {
                        file_path: path.clone(),
                        seriousness: Seriousness::Error,
                        description: "missing mapping".to_string(),
                        line: 17,
                    },
                ],
            }),
            other => Ok(success_response(other)),
        });
        let (test_config, execution_config) = configs("3600");
        let driver = driver(&channel, &test_config, &execution_config);

        let verdict = driver
            .run_package("demo.pkg", &PackageConfig::default())
            .await
            .unwrap();

        assert!(!verdict.passed);
        assert!(verdict.outcome.is_none());
        assert_eq!(
            channel.request_names(),
            vec!["load_config", "open_artifact", "validate", "close_artifact"]
        );
    }

    #[tokio::test]
    async fn test_validation_can_be_disabled() {
        let channel = ScriptChannel::new(|request| Ok(success_response(request)));
        let (test_config, mut execution_config) = configs("3600");
        execution_config.check_test_file = false;
        let driver = driver(&channel, &test_config, &execution_config);

        driver
            .run_package("demo.pkg", &PackageConfig::default())
            .await
            .unwrap();

        assert!(!channel.request_names().contains(&"validate"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_queries_until_not_running() {
        let polls = Arc::new(AtomicUsize::new(0));
        let handler_polls = polls.clone();
        let channel = ScriptChannel::new(move |request| match request {
            AgentRequest::ExecutionState { .. } => {
                let seen = handler_polls.fetch_add(1, Ordering::SeqCst);
                let state = if seen < 3 { RUNNING_STATE } else { "IDLE" };
                Ok(AgentResponse::State {
                    state: state.to_string(),
                })
            }
            other => Ok(success_response(other)),
        });
        let (test_config, execution_config) = configs("3600");
        let driver = driver(&channel, &test_config, &execution_config);

        let verdict = driver
            .run_package("demo.pkg", &PackageConfig::default())
            .await
            .unwrap();

        assert!(verdict.passed);
        assert_eq!(polls.load(Ordering::SeqCst), 4);
        assert!(!channel.request_names().contains(&"abort_execution"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_once_and_still_collects() {
        let channel = ScriptChannel::new(|request| match request {
            AgentRequest::ExecutionState { .. } => Ok(AgentResponse::State {
                state: RUNNING_STATE.to_string(),
            }),
            other => Ok(success_response(other)),
        });
        let (test_config, execution_config) = configs("2");
        let driver = driver(&channel, &test_config, &execution_config);

        let verdict = driver
            .run_package("demo.pkg", &PackageConfig::default())
            .await
            .unwrap();

        // The abort went through, so the result is still collected and
        // the verdict may pass.
        assert!(verdict.passed);
        assert!(verdict.outcome.is_some());

        let names = channel.request_names();
        let aborts = names.iter().filter(|name| **name == "abort_execution").count();
        assert_eq!(aborts, 1);
        let tail: Vec<&str> = names[names.len() - 3..].to_vec();
        assert_eq!(tail, vec!["execution_result", "wait_for_idle", "close_artifact"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_abort_skips_collect_but_closes() {
        let channel = ScriptChannel::new(|request| match request {
            AgentRequest::ExecutionState { .. } => Ok(AgentResponse::State {
                state: RUNNING_STATE.to_string(),
            }),
            AgentRequest::AbortExecution { .. } => Ok(AgentResponse::Error {
                error: AgentError::Tool {
                    message: "abort rejected".to_string(),
                },
            }),
            other => Ok(success_response(other)),
        });
        let (test_config, execution_config) = configs("1");
        let driver = driver(&channel, &test_config, &execution_config);

        let verdict = driver
            .run_package("demo.pkg", &PackageConfig::default())
            .await
            .unwrap();

        assert!(!verdict.passed);
        assert!(verdict.outcome.is_none());
        let names = channel.request_names();
        assert!(!names.contains(&"execution_result"));
        assert_eq!(*names.last().unwrap(), "close_artifact");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_without_close() {
        let channel = ScriptChannel::new(|request| match request {
            AgentRequest::ExecutionState { .. } => Ok(AgentResponse::State {
                state: RUNNING_STATE.to_string(),
            }),
            other => Ok(success_response(other)),
        });
        let (test_config, execution_config) = configs("3600");
        let (handle, signal) = cancel_pair();
        let driver = ExecutionDriver::new(&channel, &test_config, &execution_config, signal);

        let package_config = PackageConfig::default();
        let run = driver.run_package("demo.pkg", &package_config);
        let cancel_later = async {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            handle.cancel();
        };
        let (result, ()) = tokio::join!(run, cancel_later);

        assert!(matches!(result, Err(ExecutionError::Interrupted)));
        let names = channel.request_names();
        assert!(!names.contains(&"abort_execution"));
        assert!(!names.contains(&"execution_result"));
        assert!(!names.contains(&"close_artifact"));
    }

    #[tokio::test]
    async fn test_wait_for_idle_timeout_keeps_outcome() {
        let channel = ScriptChannel::new(|request| match request {
            AgentRequest::WaitForIdle { .. } => Ok(AgentResponse::Bool { value: false }),
            other => Ok(success_response(other)),
        });
        let (test_config, execution_config) = configs("3600");
        let driver = driver(&channel, &test_config, &execution_config);

        let verdict = driver
            .run_package("demo.pkg", &PackageConfig::default())
            .await
            .unwrap();

        assert!(verdict.passed);
        assert!(verdict.outcome.is_some());
    }

    #[tokio::test]
    async fn test_empty_folder_passes() {
        let channel = ScriptChannel::new(|request| match request {
            AgentRequest::ScanFolder { .. } => Ok(AgentResponse::Artifacts {
                members: Vec::new(),
            }),
            other => panic!("unexpected request {:?}", other),
        });
        let (test_config, execution_config) = configs("3600");
        let driver = driver(&channel, &test_config, &execution_config);

        let verdict = driver
            .run_folder("/work/tests", &FolderConfig::default())
            .await
            .unwrap();

        assert!(verdict.passed);
        assert!(verdict.members.is_empty());
        assert_eq!(channel.request_names(), vec!["scan_folder"]);
    }

    #[tokio::test]
    async fn test_folder_halts_after_first_failure_when_configured() {
        let channel = ScriptChannel::new(|request| match request {
            AgentRequest::ScanFolder { .. } => Ok(AgentResponse::Artifacts {
                members: vec![
                    FolderMember {
                        kind: ArtifactKind::Package,
                        path: "a.pkg".to_string(),
                    },
                    FolderMember {
                        kind: ArtifactKind::Package,
                        path: "b.pkg".to_string(),
                    },
                ],
            }),
            AgentRequest::OpenArtifact { path, .. } if path == "a.pkg" => {
                Ok(AgentResponse::Error {
                    error: AgentError::Tool {
                        message: "artifact is locked".to_string(),
                    },
                })
            }
            other => Ok(success_response(other)),
        });
        let (test_config, execution_config) = configs("3600");
        let driver = driver(&channel, &test_config, &execution_config);

        let mut folder = FolderConfig::default();
        folder.failure_policy = MemberFailurePolicy::HaltOnFailure;
        let verdict = driver.run_folder("/work/tests", &folder).await.unwrap();

        assert!(!verdict.passed);
        assert_eq!(verdict.members.len(), 1);
        // b.pkg was never opened.
        let opens = channel
            .requests()
            .iter()
            .filter(|request| matches!(request, AgentRequest::OpenArtifact { .. }))
            .count();
        assert_eq!(opens, 1);
    }

    #[tokio::test]
    async fn test_folder_continues_and_aggregates_by_default() {
        let channel = ScriptChannel::new(|request| match request {
            AgentRequest::ScanFolder { .. } => Ok(AgentResponse::Artifacts {
                members: vec![
                    FolderMember {
                        kind: ArtifactKind::Package,
                        path: "a.pkg".to_string(),
                    },
                    FolderMember {
                        kind: ArtifactKind::Project,
                        path: "suite.prj".to_string(),
                    },
                ],
            }),
            AgentRequest::OpenArtifact { path, .. } if path == "a.pkg" => {
                Ok(AgentResponse::Error {
                    error: AgentError::Tool {
                        message: "artifact is locked".to_string(),
                    },
                })
            }
            other => Ok(success_response(other)),
        });
        let (test_config, execution_config) = configs("3600");
        let driver = driver(&channel, &test_config, &execution_config);

        let verdict = driver
            .run_folder("/work/tests", &FolderConfig::default())
            .await
            .unwrap();

        assert!(!verdict.passed);
        assert_eq!(verdict.members.len(), 2);
        assert!(!verdict.members[0].passed);
        assert!(verdict.members[1].passed);
        assert!(verdict.members[1].outcome.is_some());
    }

    #[tokio::test]
    async fn test_channel_error_propagates_without_close() {
        let channel = ScriptChannel::new(|request| match request {
            AgentRequest::StartExecution { .. } => {
                Err(testrig_remote::RemoteError::ConnectionClosed)
            }
            other => Ok(success_response(other)),
        });
        let (test_config, execution_config) = configs("3600");
        let driver = driver(&channel, &test_config, &execution_config);

        let result = driver
            .run_package("demo.pkg", &PackageConfig::default())
            .await;

        assert!(matches!(result, Err(ExecutionError::Remote(_))));
        assert!(!channel.request_names().contains(&"close_artifact"));
    }
}
