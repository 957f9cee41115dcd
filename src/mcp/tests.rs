//! MCP Protocol Implementation Tests
//!
//! Unit tests for tool definitions, message routing and protocol negotiation.

#[cfg(test)]
mod current_aqhi_tool_tests {
    use crate::mcp::tools::CurrentAqhiHandler;

    #[test]
    fn current_aqhi_tool_definition() {
        let tool = CurrentAqhiHandler::tool_definition();

        assert_eq!(tool.name, "get_current_aqhi");
        assert_eq!(
            tool.description,
            Some("Current Air Quality Health Index (AQHI) at individual general and roadside Air Quality Monitoring stations in Hong Kong. The AQHIs are reported on a scale of 1 to 10 and 10+ and are grouped into five AQHI health risk categories with health advice provided. ".to_string())
        );

        // Takes no arguments
        let schema = tool.input_schema;
        assert_eq!(schema["type"], "object");
        let properties = schema["properties"].as_object().expect("has properties");
        assert!(properties.is_empty());
    }
}

#[cfg(test)]
mod protocol_tests {
    use crate::mcp::protocol::*;
    use serde_json::json;

    #[test]
    fn negotiates_supported_versions() {
        assert_eq!(negotiate_protocol_version("2025-06-18"), "2025-06-18");
        assert_eq!(negotiate_protocol_version("2024-11-05"), "2024-11-05");
        assert_eq!(negotiate_protocol_version("1999-01-01"), MCP_VERSION);
    }

    #[test]
    fn request_and_notification_are_distinguished() {
        let request: JsonRpcMessage =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "ping", "id": 7}))
                .expect("request should deserialize");
        assert!(matches!(request, JsonRpcMessage::Request(ref r) if r.id == RequestId::Number(7)));

        let notification: JsonRpcMessage = serde_json::from_value(
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .expect("notification should deserialize");
        assert!(matches!(notification, JsonRpcMessage::Notification(_)));
    }

    #[test]
    fn error_response_serializes_null_id() {
        let response = JsonRpcErrorResponse::new(JsonRpcError::parse_error(), None);
        let value = serde_json::to_value(&response).expect("should serialize");

        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32700, "message": "Parse error"},
                "id": null
            })
        );
    }

    #[test]
    fn tool_result_helpers() {
        let ok = CallToolResult::text("[]".to_string());
        assert_eq!(ok.is_error, Some(false));

        let failed = CallToolResult::error("boom".to_string());
        let value = serde_json::to_value(&failed).expect("should serialize");
        assert_eq!(
            value,
            json!({"content": [{"type": "text", "text": "boom"}], "isError": true})
        );
    }
}

#[cfg(test)]
mod server_tests {
    use crate::mcp::protocol::*;
    use crate::mcp::server::{ConnectionState, McpServer, ToolHandler};
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
            let arguments = serde_json::to_string(&params.arguments.unwrap_or_default())?;
            Ok(CallToolResult::text(arguments))
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl ToolHandler for FailingHandler {
        async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
            bail!("handler exploded")
        }
    }

    fn tool(name: &str) -> Tool {
        Tool {
            name: name.to_string(),
            description: None,
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    async fn test_server() -> Arc<McpServer> {
        let server = McpServer::new("test-server".to_string(), "1.0.0".to_string());
        server.register_tool(tool("echo"), EchoHandler).await;
        server.register_tool(tool("fail"), FailingHandler).await;
        Arc::new(server)
    }

    async fn reply_value(server: &Arc<McpServer>, raw: &str) -> Value {
        let reply = server.handle_raw(raw).await.expect("request should get a reply");
        serde_json::to_value(reply).expect("reply should serialize")
    }

    #[tokio::test]
    async fn initialize_handshake() {
        let server = test_server().await;

        let reply = reply_value(
            &server,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"test-client","version":"0.1"}}}"#,
        )
        .await;

        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(reply["result"]["serverInfo"]["name"], "test-server");
        assert!(reply["result"]["capabilities"]["tools"].is_object());
        assert_eq!(server.connection_state().await, ConnectionState::Initializing);

        let ack = server
            .handle_raw(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(ack.is_none());
        assert_eq!(server.connection_state().await, ConnectionState::Ready);
    }

    #[tokio::test]
    async fn initialize_without_params_is_invalid() {
        let server = test_server().await;
        let reply = reply_value(&server, r#"{"jsonrpc":"2.0","id":"a","method":"initialize"}"#).await;

        assert_eq!(reply["id"], "a");
        assert_eq!(reply["error"]["code"], error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn lists_tools_sorted_by_name() {
        let server = test_server().await;
        let reply = reply_value(&server, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;

        let names: Vec<&str> = reply["result"]["tools"]
            .as_array()
            .expect("tools array")
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert_eq!(names, vec!["echo", "fail"]);
    }

    #[tokio::test]
    async fn calls_registered_tool() {
        let server = test_server().await;
        let reply = reply_value(
            &server,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"echo","arguments":{"x":1}}}"#,
        )
        .await;

        assert_eq!(reply["result"]["isError"], false);
        assert_eq!(reply["result"]["content"][0]["type"], "text");
        assert_eq!(reply["result"]["content"][0]["text"], r#"{"x":1}"#);
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let server = test_server().await;
        let reply = reply_value(
            &server,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"missing"}}"#,
        )
        .await;

        assert_eq!(reply["error"]["code"], error_codes::INVALID_PARAMS);
        assert_eq!(reply["error"]["message"], "Tool not found: missing");
    }

    #[tokio::test]
    async fn handler_failure_is_internal_error() {
        let server = test_server().await;
        let reply = reply_value(
            &server,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"fail"}}"#,
        )
        .await;

        assert_eq!(reply["error"]["code"], error_codes::INTERNAL_ERROR);
        assert!(
            reply["error"]["message"]
                .as_str()
                .expect("message")
                .contains("handler exploded")
        );
    }

    #[tokio::test]
    async fn unknown_method_and_bad_input() {
        let server = test_server().await;

        let reply = reply_value(&server, r#"{"jsonrpc":"2.0","id":6,"method":"resources/list"}"#).await;
        assert_eq!(reply["error"]["code"], error_codes::METHOD_NOT_FOUND);

        let reply = reply_value(&server, "{not json").await;
        assert_eq!(reply["error"]["code"], error_codes::PARSE_ERROR);
        assert_eq!(reply["id"], Value::Null);

        let reply = reply_value(&server, r#"{"jsonrpc":"1.0","id":8,"method":"ping"}"#).await;
        assert_eq!(reply["error"]["code"], error_codes::INVALID_REQUEST);
        assert_eq!(reply["id"], 8);

        let reply = reply_value(&server, "[1, 2, 3]").await;
        assert_eq!(reply["error"]["code"], error_codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn malformed_request_id_is_invalid_request() {
        let server = test_server().await;

        for id in ["null", "1.5", "18446744073709551615", "true"] {
            let raw = format!(r#"{{"jsonrpc":"2.0","id":{id},"method":"tools/list"}}"#);
            let reply = reply_value(&server, &raw).await;
            assert_eq!(reply["error"]["code"], error_codes::INVALID_REQUEST, "id {id}");
            assert_eq!(reply["id"], Value::Null, "id {id}");
        }
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let server = test_server().await;
        let reply = reply_value(&server, r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#).await;
        assert_eq!(reply["result"], json!({}));
    }

    #[tokio::test]
    async fn serve_over_duplex_stream() {
        let server = test_server().await;
        let (client, server_io) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server_io);

        let serve_task = tokio::spawn(
            Arc::clone(&server).serve(BufReader::new(server_read), server_write),
        );

        let (client_read, mut client_write) = tokio::io::split(client);
        client_write
            .write_all(
                b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
            )
            .await
            .expect("write should succeed");

        let mut lines = BufReader::new(client_read).lines();
        let line = lines
            .next_line()
            .await
            .expect("read should succeed")
            .expect("server should reply");
        let reply: Value = serde_json::from_str(&line).expect("reply is JSON");
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"], json!({}));

        client_write
            .shutdown()
            .await
            .expect("shutdown should succeed");
        serve_task
            .await
            .expect("serve task should not panic")
            .expect("serve should finish cleanly");

        assert_eq!(server.connection_state().await, ConnectionState::Closed);
    }
}
