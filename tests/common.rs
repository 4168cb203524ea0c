//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

use testrig_config::{ExecutionConfig, TestConfig, ToolConfig};
use testrig_execution::{
    AgentService, AutomationTool, LocalAgent, ProcessControl, TestOrchestrator, ToolError,
    ToolRunResult,
};
use testrig_remote::{
    MessageEnvelope, MessageTransport, OpenOptions, RemoteError, StartOptions, ValidationFinding,
    PROTOCOL_VERSION, RUNNING_STATE, SETTING_UNSET,
};

/// Behavior switches for the scripted automation tool.
pub struct ToolScript {
    /// Setting values returned by `get_setting`; missing names return
    /// the unset sentinel.
    pub settings: HashMap<String, String>,
    /// Findings returned by every artifact check.
    pub findings: Vec<ValidationFinding>,
    /// Artifact path suffixes whose open fails in-band.
    pub fail_open_suffixes: Vec<String>,
    /// How many state queries report a running execution before the
    /// tool settles.
    pub running_polls: usize,
    /// Result string of every collected execution.
    pub result: String,
    /// Report database path of every collected execution.
    pub report_db: String,
}

impl Default for ToolScript {
    fn default() -> Self {
        Self {
            settings: HashMap::new(),
            findings: Vec::new(),
            fail_open_suffixes: Vec::new(),
            running_polls: 0,
            result: "SUCCESS".to_string(),
            report_db: "/reports/run1/report.db".to_string(),
        }
    }
}

/// Automation tool fake driven by a [`ToolScript`], recording every call.
pub struct ScriptedTool {
    script: ToolScript,
    polls: AtomicUsize,
    starts: AtomicUsize,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTool {
    pub fn new(script: ToolScript) -> (Self, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let tool = Self {
            script,
            polls: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            calls: calls.clone(),
        };
        (tool, calls)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AutomationTool for ScriptedTool {
    async fn load_configuration(
        &self,
        test: &TestConfig,
        _execution: &ExecutionConfig,
    ) -> Result<(), ToolError> {
        self.record(format!("load:{}", test.bench_config));
        Ok(())
    }

    async fn open_artifact(&self, path: &str, _options: &OpenOptions) -> Result<(), ToolError> {
        self.record(format!("open:{}", path));
        if self
            .script
            .fail_open_suffixes
            .iter()
            .any(|suffix| path.ends_with(suffix))
        {
            return Err(ToolError::new("artifact is locked"));
        }
        Ok(())
    }

    async fn check_artifact(&self, path: &str) -> Result<Vec<ValidationFinding>, ToolError> {
        self.record(format!("check:{}", path));
        Ok(self.script.findings.clone())
    }

    async fn start_execution(
        &self,
        path: &str,
        _options: &StartOptions,
    ) -> Result<String, ToolError> {
        self.record(format!("start:{}", path));
        let token = self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(format!("token-{}", token))
    }

    async fn execution_state(&self, _token: &str) -> Result<String, ToolError> {
        let polled = self.polls.fetch_add(1, Ordering::SeqCst);
        let state = if polled < self.script.running_polls {
            RUNNING_STATE
        } else {
            "IDLE"
        };
        Ok(state.to_string())
    }

    async fn abort_execution(&self, token: &str) -> Result<(), ToolError> {
        self.record(format!("abort:{}", token));
        Ok(())
    }

    async fn execution_result(&self, token: &str) -> Result<ToolRunResult, ToolError> {
        self.record(format!("result:{}", token));
        Ok(ToolRunResult {
            result: self.script.result.clone(),
            report_db: self.script.report_db.clone(),
        })
    }

    async fn close_artifact(&self, path: &str) -> Result<bool, ToolError> {
        self.record(format!("close:{}", path));
        Ok(true)
    }

    async fn get_setting(&self, name: &str) -> Result<String, ToolError> {
        self.record(format!("setting:{}", name));
        Ok(self
            .script
            .settings
            .get(name)
            .cloned()
            .unwrap_or_else(|| SETTING_UNSET.to_string()))
    }

    async fn stop(&self, timeout_secs: u64) -> Result<bool, ToolError> {
        self.record(format!("stop:{}", timeout_secs));
        Ok(true)
    }

    async fn wait_for_idle(&self, timeout_secs: u64) -> Result<bool, ToolError> {
        self.record(format!("wait_for_idle:{}", timeout_secs));
        Ok(true)
    }
}

/// Process table fake with a fixed name list and a kill recorder.
pub struct FakeProcesses {
    names: Vec<String>,
    killed: Arc<Mutex<Vec<String>>>,
}

impl FakeProcesses {
    pub fn new(names: &[&str]) -> (Self, Arc<Mutex<Vec<String>>>) {
        let killed = Arc::new(Mutex::new(Vec::new()));
        let processes = Self {
            names: names.iter().map(|name| name.to_string()).collect(),
            killed: killed.clone(),
        };
        (processes, killed)
    }
}

impl ProcessControl for FakeProcesses {
    fn list(&self, image: &str) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| name.eq_ignore_ascii_case(image))
            .cloned()
            .collect()
    }

    fn kill(&self, image: &str) -> usize {
        self.killed.lock().unwrap().push(image.to_string());
        self.list(image).len()
    }
}

/// A fully wired in-process scheduler/agent pair.
pub struct Rig {
    pub orchestrator: TestOrchestrator<LocalAgent<ScriptedTool, FakeProcesses>>,
    pub tool_calls: Arc<Mutex<Vec<String>>>,
    pub killed: Arc<Mutex<Vec<String>>>,
}

pub fn rig(script: ToolScript) -> Rig {
    rig_with_tool(script, ToolConfig::default())
}

pub fn rig_with_tool(script: ToolScript, tool_config: ToolConfig) -> Rig {
    let (tool, tool_calls) = ScriptedTool::new(script);
    let (processes, killed) = FakeProcesses::new(&["testbench.exe", "toolserver.exe"]);
    let service = Arc::new(AgentService::new(tool, processes));
    let orchestrator = TestOrchestrator::new(LocalAgent::new(service), tool_config);
    Rig {
        orchestrator,
        tool_calls,
        killed,
    }
}

/// Agent service plus its recorders, for serving over a transport.
pub fn scripted_service(
    script: ToolScript,
) -> (
    Arc<AgentService<ScriptedTool, FakeProcesses>>,
    Arc<Mutex<Vec<String>>>,
    Arc<Mutex<Vec<String>>>,
) {
    let (tool, tool_calls) = ScriptedTool::new(script);
    let (processes, killed) = FakeProcesses::new(&["testbench.exe", "toolserver.exe"]);
    (
        Arc::new(AgentService::new(tool, processes)),
        tool_calls,
        killed,
    )
}

pub fn recorded(calls: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    calls.lock().unwrap().clone()
}

/// In-memory transport over a duplex pipe, framed like the production
/// transports: one JSON envelope per line.
pub struct DuplexTransport {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

pub fn duplex_pair() -> (DuplexTransport, DuplexTransport) {
    let (left, right) = tokio::io::duplex(64 * 1024);
    (DuplexTransport::new(left), DuplexTransport::new(right))
}

impl DuplexTransport {
    fn new(stream: DuplexStream) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read),
            writer: write,
        }
    }
}

#[async_trait]
impl MessageTransport for DuplexTransport {
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), RemoteError> {
        let json = serde_json::to_string(message)
            .map_err(|e| RemoteError::SerializationError(e.to_string()))?;
        self.writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| RemoteError::IoError(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .await
            .map_err(|e| RemoteError::IoError(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| RemoteError::IoError(e.to_string()))?;
        Ok(())
    }

    async fn receive<T: for<'de> Deserialize<'de> + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, RemoteError> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| RemoteError::IoError(e.to_string()))?;
        if read == 0 {
            return Err(RemoteError::ConnectionClosed);
        }
        let envelope: MessageEnvelope<T> = serde_json::from_str(line.trim())
            .map_err(|e| RemoteError::DeserializationError(e.to_string()))?;
        if !envelope.is_compatible() {
            return Err(RemoteError::ProtocolVersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: envelope.protocol_version,
            });
        }
        Ok(envelope)
    }

    async fn close(&mut self) -> Result<(), RemoteError> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| RemoteError::IoError(e.to_string()))?;
        Ok(())
    }
}
