//! Remote message transport implementations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};

use crate::error::RemoteError;
use crate::protocol::{MessageEnvelope, PROTOCOL_VERSION};

/// Message transport trait for different communication mechanisms
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send a message to the other end
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), RemoteError>;

    /// Receive a message from the other end
    async fn receive<T: for<'de> Deserialize<'de> + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, RemoteError>;

    /// Close the transport
    async fn close(&mut self) -> Result<(), RemoteError>;
}

/// Write one envelope as a newline-delimited JSON frame and flush it.
async fn write_frame<W, T>(writer: &mut W, message: &MessageEnvelope<T>) -> Result<(), RemoteError>
where
    W: AsyncWrite + Unpin + Send,
    T: Serialize + Send + Sync,
{
    let mut json = serde_json::to_string(message)
        .map_err(|e| RemoteError::SerializationError(e.to_string()))?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame, decode it and reject incompatible protocol versions.
async fn read_frame<R, T>(reader: &mut R) -> Result<MessageEnvelope<T>, RemoteError>
where
    R: AsyncBufRead + Unpin + Send,
    T: for<'de> Deserialize<'de> + Send,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(RemoteError::ConnectionClosed);
    }

    let envelope: MessageEnvelope<T> = serde_json::from_str(line.trim_end())
        .map_err(|e| RemoteError::DeserializationError(e.to_string()))?;
    if !envelope.is_compatible() {
        return Err(RemoteError::ProtocolVersionMismatch {
            expected: PROTOCOL_VERSION,
            actual: envelope.protocol_version,
        });
    }
    Ok(envelope)
}

/// Stdin/stdout transport used by the agent process.
///
/// The reader is buffered once at construction; frames arriving back to
/// back stay in the buffer between calls instead of being dropped with a
/// per-call reader.
pub struct StdioTransport {
    stdin: BufReader<tokio::io::Stdin>,
    stdout: tokio::io::Stdout,
}

impl StdioTransport {
    /// Create a transport over this process's stdin/stdout
    pub fn new() -> Self {
        Self {
            stdin: BufReader::new(tokio::io::stdin()),
            stdout: tokio::io::stdout(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageTransport for StdioTransport {
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), RemoteError> {
        write_frame(&mut self.stdout, message).await
    }

    async fn receive<T: for<'de> Deserialize<'de> + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, RemoteError> {
        read_frame(&mut self.stdin).await
    }

    async fn close(&mut self) -> Result<(), RemoteError> {
        // Stdin/stdout don't need explicit closing
        Ok(())
    }
}

/// Transport over the stdio handles of a spawned agent process.
///
/// Closing drops the handles; the agent sees EOF and its serve loop ends.
pub struct ChildProcessTransport {
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
}

impl ChildProcessTransport {
    /// Take ownership of a spawned agent's stdio handles
    pub fn new(stdin: ChildStdin, stdout: ChildStdout) -> Self {
        Self {
            stdin: Some(stdin),
            stdout: Some(BufReader::new(stdout)),
        }
    }
}

#[async_trait]
impl MessageTransport for ChildProcessTransport {
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), RemoteError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RemoteError::IoError("stdin already closed".to_string()))?;
        write_frame(stdin, message).await
    }

    async fn receive<T: for<'de> Deserialize<'de> + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, RemoteError> {
        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| RemoteError::IoError("stdout already closed".to_string()))?;
        read_frame(stdout).await
    }

    async fn close(&mut self) -> Result<(), RemoteError> {
        let _ = self.stdin.take();
        let _ = self.stdout.take();
        Ok(())
    }
}
