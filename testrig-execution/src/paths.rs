//! Remote path resolution for test artifacts and configuration files
//!
//! Relative artifact references are resolved against directories the tool
//! itself advertises through its settings. When a setting cannot be read
//! the resolver falls back to the configured default directory below the
//! workspace and keeps going; a missing file is a configuration error.

use std::path::{Path, PathBuf};

use tracing::warn;

use testrig_config::ToolConfig;
use testrig_remote::{AgentChannel, AgentRequest, AgentResponse};

use crate::error::{ExecutionError, Result};

/// Tool setting naming the packages directory.
pub const PACKAGES_SETTING: &str = "packagePath";

/// Tool setting naming the configurations directory.
pub const CONFIGURATIONS_SETTING: &str = "configPath";

/// Resolves artifact and configuration file references on the agent side.
pub struct PathResolver<'a, C> {
    channel: &'a C,
    workspace: &'a Path,
    tool: &'a ToolConfig,
}

impl<'a, C: AgentChannel> PathResolver<'a, C> {
    pub fn new(channel: &'a C, workspace: &'a Path, tool: &'a ToolConfig) -> Self {
        Self {
            channel,
            workspace,
            tool,
        }
    }

    /// Resolve a package or project reference to a full path that exists
    /// on the agent.
    pub async fn resolve_artifact(&self, file: &str) -> Result<String> {
        let path = Path::new(file);
        let full = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let dir = self
                .settings_dir(PACKAGES_SETTING, &self.tool.packages_dir, "packages")
                .await;
            dir.join(file)
        };
        self.require_exists(full).await
    }

    /// Resolve a bench or scenario configuration file reference.
    ///
    /// An empty reference means "keep the tool's current file" and
    /// resolves to the empty string without touching the agent.
    pub async fn resolve_config_file(&self, file: &str) -> Result<String> {
        if file.is_empty() {
            return Ok(String::new());
        }
        let path = Path::new(file);
        let full = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let dir = self
                .settings_dir(
                    CONFIGURATIONS_SETTING,
                    &self.tool.configurations_dir,
                    "config",
                )
                .await;
            dir.join(file)
        };
        self.require_exists(full).await
    }

    /// Resolve a test folder reference against the workspace.
    ///
    /// Folders never consult tool settings.
    pub async fn resolve_workspace_dir(&self, dir: &str) -> Result<String> {
        let full = self.absolutize(dir);
        self.require_exists(full).await
    }

    /// Look up a directory setting, falling back to the configured
    /// default below the workspace when the tool cannot provide it.
    async fn settings_dir(&self, setting: &str, fallback: &str, noun: &str) -> PathBuf {
        let request = AgentRequest::GetSetting {
            name: setting.to_string(),
        };
        match self.channel.call(request).await {
            Ok(AgentResponse::Setting { value }) => self.absolutize(&value),
            _ => {
                warn!("Could not get {} dir, assuming default values now!", noun);
                self.workspace.join(fallback)
            }
        }
    }

    async fn require_exists(&self, full: PathBuf) -> Result<String> {
        let full = full.display().to_string();
        let response = self
            .channel
            .call(AgentRequest::FileExists { path: full.clone() })
            .await?;
        match response {
            AgentResponse::Bool { value: true } => Ok(full),
            AgentResponse::Bool { value: false } => Err(ExecutionError::Configuration(format!(
                "{} does not exist!",
                full
            ))),
            AgentResponse::Error { error } => Err(error.into()),
            _ => Err(ExecutionError::UnexpectedResponse("file_exists")),
        }
    }

    fn absolutize(&self, dir: &str) -> PathBuf {
        let path = Path::new(dir);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }
}
