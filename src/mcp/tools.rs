//! MCP Tools Implementation
//!
//! Concrete tools exposed by the environment server and the factory that
//! registers them.

use crate::aqhi::get_current_aqhi;
use crate::config::Config;
use crate::feed::FeedClient;
use crate::mcp::protocol::*;
use crate::mcp::server::{McpServer, ToolHandler};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error};

/// Name the server reports to MCP clients
pub const SERVER_NAME: &str = "HK OpenAI environment Server";

const CURRENT_AQHI_DESCRIPTION: &str = "Current Air Quality Health Index (AQHI) at individual general and roadside Air Quality Monitoring stations in Hong Kong. The AQHIs are reported on a scale of 1 to 10 and 10+ and are grouped into five AQHI health risk categories with health advice provided. ";

/// Current AQHI tool handler
pub struct CurrentAqhiHandler {
    client: FeedClient,
    feed_url: String,
}

impl CurrentAqhiHandler {
    #[inline]
    pub fn new(client: FeedClient, feed_url: String) -> Self {
        Self { client, feed_url }
    }

    /// Handler reading the feed URL and client settings from `config`
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            FeedClient::new(config.feed.clone()),
            config.feed.aqhi_url.clone(),
        )
    }

    /// Create the get_current_aqhi tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "get_current_aqhi".to_string(),
            description: Some(CURRENT_AQHI_DESCRIPTION.to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for CurrentAqhiHandler {
    #[inline]
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        debug!("Fetching current AQHI from {}", self.feed_url);

        match get_current_aqhi(&self.client, &self.feed_url).await {
            Ok(readings) => Ok(CallToolResult::text(serde_json::to_string_pretty(
                &readings,
            )?)),
            Err(e) => {
                error!("Error fetching AQHI data: {:#}", e);
                Ok(CallToolResult::error(format!(
                    "Error fetching AQHI data: {:#}",
                    e
                )))
            }
        }
    }
}

/// Create the environment MCP server with every tool registered
#[inline]
pub async fn create_mcp_server(config: &Config) -> McpServer {
    let server = McpServer::new(
        SERVER_NAME.to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    )
    .with_instructions("Hong Kong environmental data from government open data feeds");

    server
        .register_tool(
            CurrentAqhiHandler::tool_definition(),
            CurrentAqhiHandler::from_config(config),
        )
        .await;

    server
}
