//! Newline-delimited JSON-RPC 2.0 over an async byte stream.
//!
//! One request is in flight at a time. While waiting for its response the
//! reader skips anything that is not that response: blank lines, banner text
//! some servers print on stdout, notifications, and stale ids.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server closed the stream")]
    Closed,

    #[error("No response to '{method}' within {timeout_ms}ms")]
    Timeout { method: String, timeout_ms: u64 },

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Response to '{0}' carried neither result nor error")]
    EmptyResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct JsonRpcTransport<R, W> {
    reader: R,
    writer: W,
    next_id: u64,
    request_timeout: Duration,
}

impl<R, W> JsonRpcTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, request_timeout: Duration) -> Self {
        Self {
            reader,
            writer,
            next_id: 1,
            request_timeout,
        }
    }

    /// Send a request and wait for its result.
    pub async fn request(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, TransportError> {
        let id = self.next_id;
        self.next_id += 1;

        let timeout = self.request_timeout;
        tokio::time::timeout(timeout, self.round_trip(id, method, params))
            .await
            .map_err(|_| TransportError::Timeout {
                method: method.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })?
    }

    /// Send a notification. Nothing is read back.
    pub async fn notify(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), TransportError> {
        let line = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        self.write_line(&line).await
    }

    async fn round_trip(
        &mut self,
        id: u64,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, TransportError> {
        let line = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;
        trace!(id, method, "-> {line}");
        self.write_line(&line).await?;

        let response = self.read_response(id).await?;
        if let Some(error) = response.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        response
            .result
            .ok_or_else(|| TransportError::EmptyResponse(method.to_string()))
    }

    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_response(&mut self, id: u64) -> Result<JsonRpcResponse, TransportError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(TransportError::Closed);
            }

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let value: serde_json::Value = match serde_json::from_str(text) {
                Ok(v) => v,
                Err(_) => {
                    debug!(line = text, "Skipping non-JSON output from server");
                    continue;
                }
            };

            if value.get("method").is_some() {
                trace!(line = text, "Skipping server notification");
                continue;
            }

            match value.get("id").and_then(|v| v.as_u64()) {
                Some(got) if got == id => return Ok(serde_json::from_value(value)?),
                other => {
                    warn!(expected = id, got = ?other, "Skipping unexpected response");
                }
            }
        }
    }

    /// Give back the underlying halves.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}
