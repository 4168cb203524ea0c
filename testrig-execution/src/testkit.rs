//! Test doubles shared by the crate's unit tests

use std::sync::Mutex;

use async_trait::async_trait;

use testrig_remote::{AgentChannel, AgentRequest, AgentResponse, RemoteError};

type Handler = Box<dyn Fn(&AgentRequest) -> Result<AgentResponse, RemoteError> + Send + Sync>;

/// Channel fake that answers requests from a scripted handler and records
/// every request it sees, in order.
pub(crate) struct ScriptChannel {
    handler: Handler,
    requests: Mutex<Vec<AgentRequest>>,
}

impl ScriptChannel {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&AgentRequest) -> Result<AgentResponse, RemoteError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Everything the code under test sent, in call order.
    pub(crate) fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Operation names only, for order assertions.
    pub(crate) fn request_names(&self) -> Vec<&'static str> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.name())
            .collect()
    }
}

#[async_trait]
impl AgentChannel for ScriptChannel {
    async fn call(&self, request: AgentRequest) -> Result<AgentResponse, RemoteError> {
        let response = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}
