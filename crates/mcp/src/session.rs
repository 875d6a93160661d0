//! An initialized MCP session over any line transport.

use std::time::Duration;

use async_trait::async_trait;
use dayloop_core::capability::{BoundArguments, CapabilitySession, RemoteResult, ToolDescriptor};
use dayloop_core::error::CapabilityError;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::protocol::{InitializeParams, InitializeResult, ListToolsResult};
use crate::transport::{JsonRpcTransport, TransportError};

/// Pages fetched from `tools/list` before giving up on a looping cursor.
const MAX_LIST_PAGES: usize = 64;

pub struct McpSession<R, W> {
    transport: JsonRpcTransport<R, W>,
    child: Option<Child>,
    server: Option<String>,
}

impl<R, W> McpSession<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Run the `initialize` handshake over an already connected stream.
    pub async fn handshake(
        reader: R,
        writer: W,
        request_timeout: Duration,
    ) -> Result<Self, CapabilityError> {
        let mut transport = JsonRpcTransport::new(reader, writer, request_timeout);

        let params = serde_json::to_value(InitializeParams::dayloop())
            .map_err(|e| CapabilityError::Connect(e.to_string()))?;
        let result = transport
            .request("initialize", Some(params))
            .await
            .map_err(|e| CapabilityError::Connect(format!("initialize failed: {e}")))?;
        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| CapabilityError::Connect(format!("bad initialize result: {e}")))?;

        transport
            .notify("notifications/initialized", None)
            .await
            .map_err(|e| CapabilityError::Connect(e.to_string()))?;

        let server = init.server_info.map(|s| match s.version {
            Some(v) => format!("{} {v}", s.name),
            None => s.name,
        });
        info!(
            server = server.as_deref().unwrap_or("unknown"),
            protocol = %init.protocol_version,
            "MCP session initialized"
        );

        Ok(Self {
            transport,
            child: None,
            server,
        })
    }

    /// Tie a server process to this session; it is killed on close.
    pub fn with_child(mut self, child: Child) -> Self {
        self.child = Some(child);
        self
    }

    /// Name and version the server reported, if any.
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }
}

#[async_trait]
impl<R, W> CapabilitySession for McpSession<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, CapabilityError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));
            let result = self
                .transport
                .request("tools/list", params)
                .await
                .map_err(|e| CapabilityError::Discovery(e.to_string()))?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| CapabilityError::Discovery(format!("malformed tool listing: {e}")))?;

            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        Err(CapabilityError::Discovery(format!(
            "tool listing did not end after {MAX_LIST_PAGES} pages"
        )))
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: &BoundArguments,
    ) -> Result<RemoteResult, CapabilityError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments.to_json(),
        });
        debug!(capability = name, arguments = %arguments, "tools/call");

        self.transport
            .request("tools/call", Some(params))
            .await
            .map(RemoteResult)
            .map_err(|e| CapabilityError::RemoteExecution {
                capability: name.to_string(),
                reason: match e {
                    TransportError::Rpc { message, .. } => message,
                    other => other.to_string(),
                },
            })
    }

    async fn close(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to stop MCP server");
            return;
        }
        debug!("MCP server stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dayloop_core::capability::BoundValue;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf, duplex, split};

    type TestSession = McpSession<BufReader<ReadHalf<DuplexStream>>, WriteHalf<DuplexStream>>;

    /// Fake MCP server: answers requests by method with the given handler.
    /// Returns every message it received.
    fn fake_server(
        handler: impl Fn(&serde_json::Value) -> Option<serde_json::Value> + Send + 'static,
    ) -> (BufReader<ReadHalf<DuplexStream>>, WriteHalf<DuplexStream>, tokio::task::JoinHandle<Vec<serde_json::Value>>) {
        let (client, server) = duplex(64 * 1024);
        let (client_read, client_write) = split(client);
        let (server_read, mut server_write) = split(server);

        let task = tokio::spawn(async move {
            let mut seen = Vec::new();
            let mut lines = BufReader::new(server_read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let msg: serde_json::Value = serde_json::from_str(&line).unwrap();
                seen.push(msg.clone());
                if let (Some(id), Some(result)) = (msg.get("id"), handler(&msg)) {
                    let reply = serde_json::json!({"jsonrpc": "2.0", "id": id, "result": result});
                    server_write.write_all(format!("{reply}\n").as_bytes()).await.unwrap();
                }
            }
            seen
        });

        (BufReader::new(client_read), client_write, task)
    }

    fn initialize_reply(msg: &serde_json::Value) -> Option<serde_json::Value> {
        (msg["method"] == "initialize").then(|| {
            serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "todo", "version": "1.6.0"}
            })
        })
    }

    async fn connected(
        handler: impl Fn(&serde_json::Value) -> Option<serde_json::Value> + Send + 'static,
    ) -> (TestSession, tokio::task::JoinHandle<Vec<serde_json::Value>>) {
        let (reader, writer, task) = fake_server(move |msg| initialize_reply(msg).or_else(|| handler(msg)));
        let session = McpSession::handshake(reader, writer, Duration::from_secs(5))
            .await
            .unwrap();
        (session, task)
    }

    #[tokio::test]
    async fn handshake_sends_initialized_notification() {
        let (session, task) = connected(|_| None).await;
        assert_eq!(session.server(), Some("todo 1.6.0"));
        drop(session);

        let seen = task.await.unwrap();
        assert_eq!(seen[0]["method"], "initialize");
        assert_eq!(seen[0]["params"]["clientInfo"]["name"], "dayloop");
        assert_eq!(seen[1]["method"], "notifications/initialized");
        assert!(seen[1].get("id").is_none());
    }

    #[tokio::test]
    async fn list_tools_follows_cursor() {
        let (mut session, _task) = connected(|msg| {
            if msg["method"] != "tools/list" {
                return None;
            }
            Some(match msg["params"]["cursor"].as_str() {
                None => serde_json::json!({
                    "tools": [{"name": "get_current_date", "inputSchema": {"properties": {}}}],
                    "nextCursor": "page-2"
                }),
                Some(_) => serde_json::json!({
                    "tools": [{"name": "list_todos", "inputSchema": {"properties": {}}}]
                }),
            })
        })
        .await;

        let tools = session.list_tools().await.unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["get_current_date", "list_todos"]);
    }

    #[tokio::test]
    async fn malformed_listing_is_discovery_error() {
        let (mut session, _task) = connected(|msg| {
            (msg["method"] == "tools/list").then(|| serde_json::json!({"tools": "nope"}))
        })
        .await;

        assert!(matches!(
            session.list_tools().await,
            Err(CapabilityError::Discovery(_))
        ));
    }

    #[tokio::test]
    async fn call_tool_sends_bound_arguments() {
        let (mut session, task) = connected(|msg| {
            (msg["method"] == "tools/call").then(|| {
                serde_json::json!({
                    "content": [{"type": "text", "text": "Todo created successfully with id: 7"}],
                    "isError": false
                })
            })
        })
        .await;

        let mut input = BoundArguments::new();
        input.push("date", BoundValue::Text("2025-04-12".into()));
        input.push("content", BoundValue::Text("buy groceries".into()));
        let mut args = BoundArguments::new();
        args.push("input", BoundValue::Structured(input));

        let result = session.call_tool("create_todo", &args).await.unwrap();
        assert_eq!(result.0["content"][0]["text"], "Todo created successfully with id: 7");

        session.close().await;
        drop(session);
        let seen = task.await.unwrap();
        let call = seen.iter().find(|m| m["method"] == "tools/call").unwrap();
        assert_eq!(call["params"]["name"], "create_todo");
        assert_eq!(
            call["params"]["arguments"],
            serde_json::json!({"input": {"date": "2025-04-12", "content": "buy groceries"}})
        );
    }

    #[tokio::test]
    async fn closed_server_is_remote_execution_error() {
        let (reader, writer, task) = fake_server(initialize_reply);
        let mut session = McpSession::handshake(reader, writer, Duration::from_secs(5))
            .await
            .unwrap();
        // The fake server never answers tools/call; stop it outright.
        task.abort();
        let _ = task.await;

        match session.call_tool("list_todos", &BoundArguments::new()).await {
            Err(CapabilityError::RemoteExecution { capability, .. }) => {
                assert_eq!(capability, "list_todos")
            }
            other => panic!("expected remote execution error, got {other:?}"),
        }
    }
}
