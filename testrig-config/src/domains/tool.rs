//! Tool installation configuration for the build agent

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{
    validate_image_name, validate_nonzero_secs, validate_required_string, Validatable,
};

/// Default packages directory relative to the workspace
pub const DEFAULT_PACKAGES_DIR: &str = "Packages";

/// Default configurations directory relative to the workspace
pub const DEFAULT_CONFIGURATIONS_DIR: &str = "Configurations";

/// Tool installation configuration.
///
/// Describes the automation tool installed on the build agent: process
/// image names for instance checks and the fallback directories used when
/// the tool's own settings cannot be queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Display name used in log output
    #[serde(default = "default_tool_name")]
    pub tool_name: String,

    /// Process image name of the tool
    #[serde(default = "default_tool_executable")]
    pub tool_executable: String,

    /// Process image name of the companion service
    #[serde(default = "default_service_executable")]
    pub service_executable: String,

    /// Fallback packages directory, relative to the workspace
    #[serde(default = "default_packages_dir")]
    pub packages_dir: String,

    /// Fallback configurations directory, relative to the workspace
    #[serde(default = "default_configurations_dir")]
    pub configurations_dir: String,

    /// Bound in seconds for a cooperative tool shutdown
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,
}

fn default_tool_name() -> String {
    "TestBench".to_string()
}

fn default_tool_executable() -> String {
    "testbench.exe".to_string()
}

fn default_service_executable() -> String {
    "toolserver.exe".to_string()
}

fn default_packages_dir() -> String {
    DEFAULT_PACKAGES_DIR.to_string()
}

fn default_configurations_dir() -> String {
    DEFAULT_CONFIGURATIONS_DIR.to_string()
}

fn default_stop_timeout() -> u64 {
    30
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            tool_name: default_tool_name(),
            tool_executable: default_tool_executable(),
            service_executable: default_service_executable(),
            packages_dir: default_packages_dir(),
            configurations_dir: default_configurations_dir(),
            stop_timeout_secs: default_stop_timeout(),
        }
    }
}

impl Validatable for ToolConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.tool_name, "tool_name", self.domain_name())?;
        validate_image_name(&self.tool_executable, "tool_executable", self.domain_name())?;
        validate_image_name(
            &self.service_executable,
            "service_executable",
            self.domain_name(),
        )?;
        validate_required_string(&self.packages_dir, "packages_dir", self.domain_name())?;
        validate_required_string(
            &self.configurations_dir,
            "configurations_dir",
            self.domain_name(),
        )?;
        validate_nonzero_secs(self.stop_timeout_secs, "stop_timeout_secs", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "tool"
    }
}
