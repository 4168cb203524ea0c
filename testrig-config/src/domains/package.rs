//! Package execution configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domains::utils::default_true;
use crate::error::ConfigResult;
use crate::expand::{expand_map, EnvVars};
use crate::validation::{validate_required_string, Validatable};

/// Package execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Execute the test part of the package
    #[serde(default = "default_true")]
    pub run_test: bool,

    /// Execute the trace analysis part of the package
    #[serde(default = "default_true")]
    pub run_trace_analysis: bool,

    /// Package parameters, pushed at execution start
    pub parameters: BTreeMap<String, String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            run_test: true,
            run_trace_analysis: true,
            parameters: BTreeMap::new(),
        }
    }
}

impl PackageConfig {
    /// Expand environment variables in parameter names and values.
    pub fn expand(&self, env: &EnvVars) -> Self {
        Self {
            run_test: self.run_test,
            run_trace_analysis: self.run_trace_analysis,
            parameters: expand_map(&self.parameters, env),
        }
    }
}

impl Validatable for PackageConfig {
    fn validate(&self) -> ConfigResult<()> {
        for name in self.parameters.keys() {
            validate_required_string(name, "parameter name", self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "package"
    }
}
