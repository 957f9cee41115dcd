//! MCP Error Handling
//!
//! Classifies failures raised while serving a message and turns them into
//! JSON-RPC error responses.

use crate::mcp::protocol::*;
use thiserror::Error;
use tracing::{error, warn};

/// Errors that can occur while handling a single MCP message
#[derive(Error, Debug)]
pub enum McpError {
    #[error("JSON-RPC parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl McpError {
    /// Convert MCP error to JSON-RPC error
    #[inline]
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            Self::ParseError { .. } => JsonRpcError::parse_error(),
            Self::InvalidRequest { message } => {
                JsonRpcError::invalid_request(Some(format!("Invalid Request: {}", message)))
            }
            Self::MethodNotFound { method } => {
                JsonRpcError::method_not_found(Some(format!("Method not found: {}", method)))
            }
            Self::InvalidParameters { message } => {
                JsonRpcError::invalid_params(Some(message.clone()))
            }
            Self::ToolNotFound { name } => {
                JsonRpcError::invalid_params(Some(format!("Tool not found: {}", name)))
            }
            Self::InternalError { message } => JsonRpcError::internal_error(Some(message.clone())),
        }
    }

    /// Create error response message
    #[inline]
    pub fn to_error_response(&self, id: Option<RequestId>) -> JsonRpcMessage {
        let error = self.to_jsonrpc_error();
        JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(error, id))
    }

    /// Log the error with appropriate level
    #[inline]
    pub fn log(&self) {
        match self {
            Self::ParseError { .. }
            | Self::InvalidRequest { .. }
            | Self::InvalidParameters { .. }
            | Self::MethodNotFound { .. }
            | Self::ToolNotFound { .. } => {
                warn!("Client error: {}", self);
            }
            Self::InternalError { .. } => {
                error!("Server error: {}", self);
            }
        }
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

impl From<anyhow::Error> for McpError {
    #[inline]
    fn from(error: anyhow::Error) -> Self {
        Self::InternalError {
            message: format!("{:#}", error),
        }
    }
}

impl From<serde_json::Error> for McpError {
    #[inline]
    fn from(error: serde_json::Error) -> Self {
        Self::InternalError {
            message: error.to_string(),
        }
    }
}
