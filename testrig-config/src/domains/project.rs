//! Project execution configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::expand::{expand, EnvVars};
use crate::validation::Validatable;

/// How analysis jobs of a project are executed.
///
/// The discriminants are the values the tool API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobExecutionMode {
    /// Do not execute analysis jobs
    NoExecution = 0,
    /// Run analysis jobs sequentially within the project run
    #[default]
    SequentialExecution = 1,
    /// Run analysis jobs in parallel within the project run
    ParallelExecution = 2,
    /// Run analysis jobs sequentially in a separate pass
    SeparateSequentialExecution = 5,
    /// Run analysis jobs in parallel in a separate pass
    SeparateParallelExecution = 6,
    /// Skip the analysis part entirely
    NoAnalysisExecution = 9,
}

impl JobExecutionMode {
    /// Numeric mode value passed to the tool API.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Map a tool API mode value back to the enum.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NoExecution),
            1 => Some(Self::SequentialExecution),
            2 => Some(Self::ParallelExecution),
            5 => Some(Self::SeparateSequentialExecution),
            6 => Some(Self::SeparateParallelExecution),
            9 => Some(Self::NoAnalysisExecution),
            _ => None,
        }
    }
}

/// Project execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Resolve package references relative to the project's own directory
    pub exec_in_current_pkg_dir: bool,

    /// Test case filter expression applied when opening the project
    pub filter_expression: String,

    /// Analysis job execution mode
    pub job_mode: JobExecutionMode,
}

impl ProjectConfig {
    /// Expand environment variables in the filter expression.
    pub fn expand(&self, env: &EnvVars) -> Self {
        Self {
            exec_in_current_pkg_dir: self.exec_in_current_pkg_dir,
            filter_expression: expand(&self.filter_expression, env),
            job_mode: self.job_mode,
        }
    }
}

impl Validatable for ProjectConfig {
    fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "project"
    }
}
