//! Scheduler-side request dispatch

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::RemoteError;
use crate::protocol::{AgentRequest, AgentResponse, MessageEnvelope};
use crate::transport::MessageTransport;

/// The seam all scheduler-side code is programmed against.
///
/// A call sends one request and yields exactly one response. In-band
/// failures come back as [`AgentResponse::Error`]; an `Err` means the
/// channel itself failed.
#[async_trait]
pub trait AgentChannel: Send + Sync {
    /// Dispatch a single request to the agent
    async fn call(&self, request: AgentRequest) -> Result<AgentResponse, RemoteError>;
}

/// Channel implementation that drives a [`MessageTransport`].
///
/// Each request is wrapped in an envelope with a fresh correlation id; the
/// response envelope must carry the same id.
pub struct Dispatcher<T: MessageTransport> {
    transport: Mutex<T>,
}

impl<T: MessageTransport> Dispatcher<T> {
    /// Create a new dispatcher over a transport
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
        }
    }

    /// Close the underlying transport
    pub async fn close(&self) -> Result<(), RemoteError> {
        self.transport.lock().await.close().await
    }
}

#[async_trait]
impl<T: MessageTransport> AgentChannel for Dispatcher<T> {
    async fn call(&self, request: AgentRequest) -> Result<AgentResponse, RemoteError> {
        trace!("Dispatching {} request", request.name());

        let envelope = MessageEnvelope::new(request);
        let correlation_id = envelope.correlation_id;

        // One request/response exchange at a time per transport
        let mut transport = self.transport.lock().await;
        transport.send(&envelope).await?;
        let reply: MessageEnvelope<AgentResponse> = transport.receive().await?;

        if reply.correlation_id != correlation_id {
            return Err(RemoteError::CorrelationMismatch {
                expected: correlation_id,
                actual: reply.correlation_id,
            });
        }

        Ok(reply.message)
    }
}
