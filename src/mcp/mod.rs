//! MCP (Model Context Protocol) Server Implementation
//!
//! JSON-RPC 2.0 server speaking MCP protocol version 2025-06-18 over stdio
//! or streamable HTTP.

#[cfg(test)]
mod tests;

pub mod errors;
pub mod http;
pub mod protocol;
pub mod server;
pub mod tools;

pub use errors::{McpError, McpResult};
pub use protocol::*;
pub use server::{ConnectionState, McpServer, MessageHandler, ToolHandler};
pub use tools::{CurrentAqhiHandler, SERVER_NAME, create_mcp_server};
