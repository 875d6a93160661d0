//! Launch an MCP server as a child process and talk to it over stdio.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use dayloop_config::McpConfig;
use dayloop_core::capability::{CapabilitySession, SessionConnector};
use dayloop_core::error::CapabilityError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

use crate::session::McpSession;

pub type StdioSession = McpSession<BufReader<ChildStdout>, ChildStdin>;

impl StdioSession {
    /// Spawn the configured server and complete the MCP handshake.
    pub async fn spawn(config: &McpConfig) -> Result<Self, CapabilityError> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }

        info!(command = %config.command, args = ?config.args, "Spawning MCP server");

        let mut child = cmd.spawn().map_err(|e| {
            CapabilityError::Connect(format!(
                "failed to start '{}': {e}",
                config.command
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CapabilityError::Connect("server stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CapabilityError::Connect("server stdout not captured".into()))?;

        // Server logs go to stderr; keep them out of the terminal but in our logs.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "mcp_server", "{line}");
                }
            });
        }

        let timeout = Duration::from_secs(config.request_timeout_secs);
        match McpSession::handshake(BufReader::new(stdout), stdin, timeout).await {
            Ok(session) => Ok(session.with_child(child)),
            Err(e) => {
                let _ = child.kill().await;
                Err(e)
            }
        }
    }
}

/// Opens a fresh stdio session per run.
pub struct StdioConnector {
    config: McpConfig,
}

impl StdioConnector {
    pub fn new(config: McpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionConnector for StdioConnector {
    async fn connect(&self) -> Result<Box<dyn CapabilitySession>, CapabilityError> {
        let session = StdioSession::spawn(&self.config).await?;
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_connect_error() {
        let config = McpConfig {
            command: "definitely-not-an-mcp-server-binary".into(),
            args: vec![],
            ..McpConfig::default()
        };
        let connector = StdioConnector::new(config);
        match connector.connect().await {
            Err(CapabilityError::Connect(reason)) => {
                assert!(reason.contains("definitely-not-an-mcp-server-binary"))
            }
            Err(other) => panic!("expected connect error, got {other:?}"),
            Ok(_) => panic!("expected connect error"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn server_that_exits_fails_handshake() {
        let config = McpConfig {
            command: "sh".into(),
            args: vec!["-c".into(), "echo 'not an mcp server'".into()],
            request_timeout_secs: 5,
            ..McpConfig::default()
        };
        assert!(matches!(
            StdioSession::spawn(&config).await,
            Err(CapabilityError::Connect(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn scripted_shell_server_round_trip() {
        // Answers initialize, swallows the notification, then answers one
        // tools/list. Ids are fixed because the client numbers from 1.
        let script = r#"
read _init
echo 'FastMCP banner line'
echo '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","serverInfo":{"name":"sh"}}}'
read _notified
read _list
echo '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"get_current_time","description":"Get the current time","inputSchema":{"properties":{}}}]}}'
read _rest
"#;
        let config = McpConfig {
            command: "sh".into(),
            args: vec!["-c".into(), script.into()],
            request_timeout_secs: 5,
            ..McpConfig::default()
        };

        let mut session = StdioSession::spawn(&config).await.unwrap();
        assert_eq!(session.server(), Some("sh"));
        let tools = session.list_tools().await.unwrap();
        assert_eq!(tools[0].name, "get_current_time");
        session.close().await;
        // Closing twice is harmless.
        session.close().await;
    }
}
