//! Configuration loading and environment variable handling

use std::path::Path;

use crate::domains::tool::ToolConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::validation::Validatable;

/// Tool configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with the default prefix
    pub fn new() -> Self {
        Self {
            prefix: "TESTRIG".to_string(),
        }
    }

    /// Create a new config loader with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load tool configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<ToolConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ToolConfig = serde_yaml::from_str(&content)?;
        self.apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load tool configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<ToolConfig> {
        let mut config = ToolConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<ToolConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to the tool configuration
    fn apply_env_overrides(&self, config: &mut ToolConfig) -> ConfigResult<()> {
        if let Ok(name) = self.get_env_var("TOOL_NAME") {
            config.tool_name = name;
        }
        if let Ok(executable) = self.get_env_var("TOOL_EXECUTABLE") {
            config.tool_executable = executable;
        }
        if let Ok(executable) = self.get_env_var("SERVICE_EXECUTABLE") {
            config.service_executable = executable;
        }
        if let Ok(dir) = self.get_env_var("PACKAGES_DIR") {
            config.packages_dir = dir;
        }
        if let Ok(dir) = self.get_env_var("CONFIGURATIONS_DIR") {
            config.configurations_dir = dir;
        }
        if let Ok(timeout) = self.get_env_var("STOP_TIMEOUT_SECS") {
            config.stop_timeout_secs = timeout.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid STOP_TIMEOUT_SECS: {}", e))
            })?;
        }
        Ok(())
    }

    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
