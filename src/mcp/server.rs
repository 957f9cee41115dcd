//! MCP Server Implementation
//!
//! This module provides the core MCP server: tool registration, connection
//! state, message routing and the stdio transport.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// MCP Server state and configuration
pub struct McpServer {
    /// Server implementation information
    pub server_info: Implementation,
    /// Server capabilities
    pub capabilities: ServerCapabilities,
    /// Instructions returned to clients on initialize
    pub instructions: Option<String>,
    /// Registered tools keyed by name
    pub tools: Arc<RwLock<BTreeMap<String, RegisteredTool>>>,
    /// Connection state
    pub connection_state: Arc<RwLock<ConnectionState>>,
    started_at: Instant,
}

/// A tool definition together with the handler that executes it
#[derive(Clone)]
pub struct RegisteredTool {
    pub tool: Tool,
    pub handler: Arc<dyn ToolHandler>,
}

/// Connection state tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// Tool handler trait for implementing tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult>;
}

/// Message handler for processing incoming messages
pub struct MessageHandler {
    server: Arc<McpServer>,
}

impl McpServer {
    /// Create a new MCP server
    #[inline]
    pub fn new(name: String, version: String) -> Self {
        let capabilities = ServerCapabilities {
            logging: Some(LoggingCapability {}),
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
        };

        Self {
            server_info: Implementation { name, version },
            capabilities,
            instructions: None,
            tools: Arc::new(RwLock::new(BTreeMap::new())),
            connection_state: Arc::new(RwLock::new(ConnectionState::Uninitialized)),
            started_at: Instant::now(),
        }
    }

    /// Set the instructions sent to clients on initialize
    #[inline]
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Register a tool with the server, replacing any tool of the same name
    #[inline]
    pub async fn register_tool<H>(&self, tool: Tool, handler: H)
    where
        H: ToolHandler + 'static,
    {
        let tool_name = tool.name.clone();
        let registered = RegisteredTool {
            tool,
            handler: Arc::new(handler),
        };

        let previous = self
            .tools
            .write()
            .await
            .insert(tool_name.clone(), registered);
        if previous.is_some() {
            warn!("Replaced previously registered tool: {}", tool_name);
        }

        debug!("Registered tool: {}", tool_name);
    }

    /// Start the server using stdio transport
    #[inline]
    pub async fn serve_stdio(self: Arc<Self>) -> Result<()> {
        info!("Starting MCP server with stdio transport");
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC messages until the reader reaches EOF
    #[inline]
    pub async fn serve<R, W>(self: Arc<Self>, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    if let Some(reply) = self.handle_raw(line).await {
                        send_message(&mut writer, &reply).await?;
                    }
                }
                Err(e) => {
                    error!("Error reading from input: {}", e);
                    break;
                }
            }
        }

        *self.connection_state.write().await = ConnectionState::Closed;

        info!("MCP server stopped");
        Ok(())
    }

    /// Handle one raw JSON-RPC message, returning the reply if one is due
    #[inline]
    pub async fn handle_raw(self: &Arc<Self>, raw: &str) -> Option<JsonRpcMessage> {
        let message = match parse_message(raw) {
            Ok(message) => message,
            Err((e, id)) => {
                e.log();
                return Some(e.to_error_response(id));
            }
        };

        MessageHandler::new(Arc::clone(self))
            .process_message(message)
            .await
    }

    /// Get current connection state
    #[inline]
    pub async fn connection_state(&self) -> ConnectionState {
        self.connection_state.read().await.clone()
    }

    /// Tool definitions sorted by name
    #[inline]
    pub async fn list_tools(&self) -> Vec<Tool> {
        self.tools
            .read()
            .await
            .values()
            .map(|registered| registered.tool.clone())
            .collect()
    }

    #[inline]
    pub async fn health_status(&self) -> ServerHealthStatus {
        ServerHealthStatus {
            connection_state: self.connection_state().await,
            tools_registered: self.tools.read().await.len(),
            uptime: self.started_at.elapsed(),
        }
    }

    #[inline]
    pub async fn server_statistics(&self) -> ServerStatistics {
        ServerStatistics {
            server_info: self.server_info.clone(),
            capabilities: self.capabilities.clone(),
            connection_state: self.connection_state().await,
            registered_tools: self.tools.read().await.keys().cloned().collect(),
        }
    }
}

/// Parse and validate a raw line as a JSON-RPC 2.0 message.
///
/// On failure the request id is returned alongside the error when it could be recovered.
fn parse_message(raw: &str) -> Result<JsonRpcMessage, (McpError, Option<RequestId>)> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        (
            McpError::ParseError {
                message: e.to_string(),
            },
            None,
        )
    })?;

    let id = match value.get("id") {
        Some(raw_id) => match serde_json::from_value::<RequestId>(raw_id.clone()) {
            Ok(id) => Some(id),
            Err(_) => {
                return Err((
                    McpError::InvalidRequest {
                        message: format!("request id must be a string or integer, got {raw_id}"),
                    },
                    None,
                ));
            }
        },
        None => None,
    };

    if value.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err((
            McpError::InvalidRequest {
                message: "expected a JSON-RPC 2.0 object".to_string(),
            },
            id,
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        (
            McpError::InvalidRequest {
                message: e.to_string(),
            },
            id,
        )
    })
}

/// Write one message followed by a newline
async fn send_message<W>(writer: &mut W, message: &JsonRpcMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

impl MessageHandler {
    /// Create a new message handler
    #[inline]
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }

    /// Process an incoming message, returning the reply for requests
    #[inline]
    pub async fn process_message(&self, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification).await;
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                None
            }
        }
    }

    /// Handle a JSON-RPC request
    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        debug!("Handling request: {}", request.method);

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(request.params).await,
            "ping" => Ok(Self::handle_ping()),
            _ => Err(McpError::MethodNotFound {
                method: request.method.clone(),
            }),
        };

        match response {
            Ok(result) => JsonRpcMessage::Response(JsonRpcResponse::new(result, request.id)),
            Err(e) => {
                e.log();
                e.to_error_response(Some(request.id))
            }
        }
    }

    /// Handle a JSON-RPC notification
    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => self.handle_initialized().await,
            "notifications/cancelled" => {
                debug!("Received cancellation notification");
            }
            _ => {
                warn!("Unknown notification method: {}", notification.method);
            }
        }
    }

    /// Handle initialize request
    #[inline]
    pub async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let params: InitializeParams = parse_params(params, "initialize")?;

        let protocol_version = negotiate_protocol_version(&params.protocol_version);
        if protocol_version != params.protocol_version {
            warn!(
                "Client requested unsupported protocol version {}, offering {}",
                params.protocol_version, protocol_version
            );
        }

        *self.server.connection_state.write().await = ConnectionState::Initializing;

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: self.server.capabilities.clone(),
            server_info: self.server.server_info.clone(),
            instructions: self.server.instructions.clone(),
        };

        info!(
            "Client initialized: {} {}",
            params.client_info.name, params.client_info.version
        );
        Ok(serde_json::to_value(result)?)
    }

    /// Handle initialized notification
    async fn handle_initialized(&self) {
        *self.server.connection_state.write().await = ConnectionState::Ready;
        info!("Server ready to handle requests");
    }

    /// Handle list tools request
    #[inline]
    pub async fn handle_list_tools(&self) -> McpResult<Value> {
        let result = ListToolsResult {
            tools: self.server.list_tools().await,
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request
    #[inline]
    pub async fn handle_call_tool(&self, params: Option<Value>) -> McpResult<Value> {
        let params: CallToolParams = parse_params(params, "tools/call")?;

        // Clone the handler out so the registry lock is not held while the tool runs
        let handler = self
            .server
            .tools
            .read()
            .await
            .get(&params.name)
            .map(|registered| Arc::clone(&registered.handler))
            .ok_or_else(|| McpError::ToolNotFound {
                name: params.name.clone(),
            })?;

        debug!("Calling tool: {}", params.name);
        let result = handler.handle(params).await?;
        Ok(serde_json::to_value(result)?)
    }

    /// Handle ping request
    #[inline]
    pub fn handle_ping() -> Value {
        serde_json::json!({})
    }
}

fn parse_params<T>(params: Option<Value>, method: &str) -> McpResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let params = params.ok_or_else(|| McpError::InvalidParameters {
        message: format!("{} request missing parameters", method),
    })?;

    serde_json::from_value(params).map_err(|e| McpError::InvalidParameters {
        message: format!("Invalid {} parameters: {}", method, e),
    })
}
