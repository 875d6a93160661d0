//! Remote capabilities for Dayloop over the Model Context Protocol.
//!
//! The agent speaks to one MCP server per run, launched as a child process
//! and driven over newline-delimited JSON-RPC on its stdio. This crate owns
//! that conversation and turns the server's tool listing into a
//! [`CapabilityRegistry`] the agent loop can describe and bind against.

pub mod protocol;
pub mod registry;
pub mod schema;
pub mod session;
pub mod stdio;
pub mod transport;

pub use registry::CapabilityRegistry;
pub use schema::resolve_parameters;
pub use session::McpSession;
pub use stdio::{StdioConnector, StdioSession};
pub use transport::{JsonRpcTransport, TransportError};
