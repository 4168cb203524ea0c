//! Remote agent protocol for testrig
//!
//! This crate defines the serializable operations the scheduler side sends
//! to the build agent, the transports that carry them, and the dispatcher
//! that correlates requests with responses. All tool interaction of the
//! execution crates goes through the [`AgentChannel`] seam defined here.

pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-export commonly used types
pub use dispatch::{AgentChannel, Dispatcher};
pub use error::RemoteError;
pub use protocol::{
    AgentError, AgentRequest, AgentResponse, ArtifactKind, FolderMember, MessageEnvelope,
    OpenOptions, Seriousness, StartOptions, ValidationFinding, PROTOCOL_VERSION, RUNNING_STATE,
    SETTING_UNSET,
};
pub use transport::{ChildProcessTransport, MessageTransport, StdioTransport};
