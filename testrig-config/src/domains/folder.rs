//! Test folder execution configuration

use serde::{Deserialize, Serialize};

use crate::domains::{package::PackageConfig, project::ProjectConfig};
use crate::error::ConfigResult;
use crate::expand::EnvVars;
use crate::validation::Validatable;

/// Which artifact kinds a folder scan picks up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Scan for packages only
    PackagesOnly,
    /// Scan for projects only
    ProjectsOnly,
    /// Scan for both packages and projects
    #[default]
    PackagesAndProjects,
}

impl ScanMode {
    /// Whether the scan includes packages.
    pub fn includes_packages(self) -> bool {
        matches!(self, Self::PackagesOnly | Self::PackagesAndProjects)
    }

    /// Whether the scan includes projects.
    pub fn includes_projects(self) -> bool {
        matches!(self, Self::ProjectsOnly | Self::PackagesAndProjects)
    }
}

/// What happens to the remaining folder members after one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberFailurePolicy {
    /// Run every member, aggregate the verdicts
    #[default]
    ContinueRemaining,
    /// Stop after the first failed member
    HaltOnFailure,
}

/// Test folder execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderConfig {
    /// Which artifact kinds to scan for
    pub scan_mode: ScanMode,

    /// Scan subdirectories recursively
    pub recursive_scan: bool,

    /// Behavior after a failed member verdict
    pub failure_policy: MemberFailurePolicy,

    /// Settings applied to scanned packages
    pub package_config: PackageConfig,

    /// Settings applied to scanned projects
    pub project_config: ProjectConfig,
}

impl FolderConfig {
    /// Expand environment variables in the per-kind settings.
    pub fn expand(&self, env: &EnvVars) -> Self {
        Self {
            scan_mode: self.scan_mode,
            recursive_scan: self.recursive_scan,
            failure_policy: self.failure_policy,
            package_config: self.package_config.expand(env),
            project_config: self.project_config.expand(env),
        }
    }
}

impl Validatable for FolderConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.package_config.validate()?;
        self.project_config.validate()?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "folder"
    }
}
