//! Domain-driven configuration for testrig
//!
//! This crate provides the configuration domains of the test execution
//! system, with validation, defaults, environment variable expansion and
//! file/environment loading support.

pub mod error;
pub mod expand;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use expand::{expand, expand_map, EnvVars};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    execution::ExecutionConfig,
    folder::{FolderConfig, MemberFailurePolicy, ScanMode},
    package::PackageConfig,
    project::{JobExecutionMode, ProjectConfig},
    test::TestConfig,
    tool::ToolConfig,
};
