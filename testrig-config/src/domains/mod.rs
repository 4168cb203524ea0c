//! Domain-specific configuration modules

pub mod execution;
pub mod folder;
pub mod package;
pub mod project;
pub mod tool;
pub mod utils;
