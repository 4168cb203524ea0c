//! Tool instance checks and teardown

use tracing::{info, warn};

use testrig_config::ToolConfig;
use testrig_remote::{AgentChannel, AgentRequest, AgentResponse};

use crate::error::{ExecutionError, Result};

/// Queries and controls tool processes on the agent host.
pub struct InstanceManager<'a, C> {
    channel: &'a C,
    tool: &'a ToolConfig,
}

impl<'a, C: AgentChannel> InstanceManager<'a, C> {
    pub fn new(channel: &'a C, tool: &'a ToolConfig) -> Self {
        Self { channel, tool }
    }

    /// Running tool instances, optionally killing them.
    pub async fn check_tool(&self, kill: bool) -> Result<Vec<String>> {
        self.list(&self.tool.tool_executable, kill).await
    }

    /// Running companion service instances, optionally killing them.
    pub async fn check_service(&self, kill: bool) -> Result<Vec<String>> {
        self.list(&self.tool.service_executable, kill).await
    }

    /// Close the running tool instance cooperatively.
    ///
    /// Reports `false` when no instance is running or the tool refuses to
    /// stop; tool-level failures are logged, not propagated.
    pub async fn close_tool(&self) -> Result<bool> {
        let running = self.check_tool(false).await?;
        if running.is_empty() {
            warn!(
                "No running {} instance found to close.",
                self.tool.tool_name
            );
            return Ok(false);
        }

        let request = AgentRequest::StopTool {
            image: self.tool.tool_executable.clone(),
            timeout_secs: self.tool.stop_timeout_secs,
        };
        match self.channel.call(request).await? {
            AgentResponse::Bool { value: true } => {
                info!("{} instance closed.", self.tool.tool_name);
                Ok(true)
            }
            AgentResponse::Bool { value: false } => {
                warn!("Closing {} instance failed!", self.tool.tool_name);
                Ok(false)
            }
            AgentResponse::Error { error } => {
                warn!("Caught tool error: {}", error);
                Ok(false)
            }
            _ => Err(ExecutionError::UnexpectedResponse("stop_tool")),
        }
    }

    async fn list(&self, image: &str, kill: bool) -> Result<Vec<String>> {
        let request = AgentRequest::ListProcesses {
            image: image.to_string(),
            kill,
        };
        match self.channel.call(request).await? {
            AgentResponse::Processes { names } => Ok(names),
            AgentResponse::Error { error } => Err(error.into()),
            _ => Err(ExecutionError::UnexpectedResponse("list_processes")),
        }
    }
}
