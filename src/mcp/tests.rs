//! MCP Protocol Implementation Tests
//!
//! Drives the stdio loop end to end over in-memory buffers and checks the
//! framing, classification and error mapping rules.

#[cfg(test)]
mod server_loop_tests {
    use crate::mcp::protocol::error_codes;
    use crate::mcp::{
        Arguments, ConnectionState, Implementation, McpServer, Tool, ToolError, ToolRegistry,
    };
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::io::Cursor;

    type Notes = HashMap<String, String>;

    fn note_tools() -> ToolRegistry<Notes> {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                Tool {
                    name: "save_note".to_string(),
                    description: "Save a note".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "key": {"type": "string"},
                            "body": {"type": "string"}
                        },
                        "required": ["key", "body"]
                    }),
                },
                |notes: &mut Notes, args: &Arguments| {
                    let key = args.required_str("key")?;
                    notes.insert(key.to_string(), args.required_str("body")?.to_string());
                    Ok(format!("saved {}", key))
                },
            )
            .expect("registers save_note");
        registry
            .register(
                Tool {
                    name: "read_note".to_string(),
                    description: "Read a note".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {"key": {"type": "string"}},
                        "required": ["key"]
                    }),
                },
                |notes: &mut Notes, args: &Arguments| {
                    let key = args.required_str("key")?;
                    notes
                        .get(key)
                        .cloned()
                        .ok_or_else(|| ToolError::Upstream(format!("no note {}", key)))
                },
            )
            .expect("registers read_note");
        registry
    }

    fn server() -> McpServer<Notes> {
        McpServer::new(
            Implementation {
                name: "test-server".to_string(),
                version: "1.0.0".to_string(),
            },
            note_tools(),
            Notes::new(),
        )
    }

    /// Feed `lines` through the loop and return every output line parsed
    fn run_lines(server: &mut McpServer<Notes>, lines: &[&str]) -> Vec<Value> {
        let input = lines.join("\n");
        let mut output = Vec::new();
        server
            .run(Cursor::new(input.into_bytes()), &mut output)
            .expect("loop completes");

        String::from_utf8(output)
            .expect("utf-8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("every output line is JSON"))
            .collect()
    }

    #[test]
    fn handshake_is_first_line() {
        let mut server = server();
        let out = run_lines(&mut server, &[]);
        assert_eq!(out, vec![json!({"mcp": "0.1.0"})]);
    }

    #[test]
    fn handshake_can_be_disabled() {
        let mut server = server().with_handshake(None);
        let out = run_lines(&mut server, &[r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["result"], json!({}));
    }

    #[test]
    fn initialize_echoes_protocol_version() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &[
                r#"{"jsonrpc":"2.0","id":"init","method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"c","version":"1"}}}"#,
                r#"{"jsonrpc":"2.0","id":2,"method":"initialize"}"#,
            ],
        );

        assert_eq!(out[1]["id"], "init");
        assert_eq!(out[1]["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(out[1]["result"]["serverInfo"]["name"], "test-server");
        assert_eq!(out[1]["result"]["serverInfo"]["version"], "1.0.0");
        assert_eq!(out[2]["result"]["protocolVersion"], "2025-03-26");
    }

    #[test]
    fn tools_list_returns_descriptors() {
        let mut server = server();
        let out = run_lines(&mut server, &[r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#]);

        let tools = out[1]["result"]["tools"].as_array().expect("tools array");
        assert_eq!(tools.len(), 2);
        for tool in tools {
            assert!(tool["name"].is_string());
            assert!(tool["inputSchema"].is_object());
        }
        assert_eq!(tools[0]["name"], "save_note");
    }

    #[test]
    fn each_request_gets_exactly_one_correlated_response_in_order() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &[
                r#"{"jsonrpc":"2.0","id":10,"method":"ping"}"#,
                r#"{"jsonrpc":"2.0","id":"b","method":"tools/list"}"#,
                r#"{"jsonrpc":"2.0","id":12,"method":"no/such/method"}"#,
                r#"{"jsonrpc":"2.0","id":13,"method":"tools/call","params":{"name":"missing"}}"#,
            ],
        );

        let ids: Vec<Value> = out[1..].iter().map(|m| m["id"].clone()).collect();
        assert_eq!(ids, vec![json!(10), json!("b"), json!(12), json!(13)]);
        for message in &out[1..] {
            assert_eq!(message["jsonrpc"], "2.0");
            let has_result = message.get("result").is_some();
            let has_error = message.get("error").is_some();
            assert!(has_result != has_error, "result and error are exclusive");
        }
    }

    #[test]
    fn notifications_never_produce_output() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &[
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
                r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":1}}"#,
                r#"{"jsonrpc":"2.0","method":"something/unknown"}"#,
                r#"{"jsonrpc":"2.0","id":null,"method":"tools/list"}"#,
            ],
        );

        assert_eq!(out.len(), 1, "only the handshake is written");
        assert_eq!(server.connection_state(), ConnectionState::Closed);
    }

    #[test]
    fn initialized_notification_marks_connection_ready() {
        let mut server = server();
        let message = server.handle_line(br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
        assert!(message.is_none());
        assert_eq!(server.connection_state(), ConnectionState::Ready);
    }

    #[test]
    fn malformed_json_yields_parse_error_and_loop_continues() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &[
                r#"{"jsonrpc":"2.0","id":1,"method":"#,
                r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            ],
        );

        assert_eq!(out.len(), 3);
        assert_eq!(out[1]["error"]["code"], error_codes::PARSE_ERROR);
        assert!(out[1]["id"].is_null());
        assert_eq!(out[2]["id"], 2);
        assert_eq!(out[2]["result"], json!({}));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let mut server = server().with_handshake(None);
        let mut output = Vec::new();
        let mut input = b"{\"id\":1,\"method\":\"\xff\"}\n".to_vec();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);

        server
            .run(Cursor::new(input), &mut output)
            .expect("loop completes");

        let text = String::from_utf8(output).expect("utf-8 output");
        let out: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).expect("json"))
            .collect();
        assert_eq!(out[0]["error"]["code"], error_codes::PARSE_ERROR);
        assert_eq!(out[1]["id"], 2);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &["", "   ", r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#, ""],
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &[r#"{"jsonrpc":"2.0","id":5,"method":"resources/list"}"#],
        );

        assert_eq!(out[1]["error"]["code"], error_codes::METHOD_NOT_FOUND);
        assert_eq!(out[1]["error"]["message"], "Method not found: resources/list");
    }

    #[test]
    fn unknown_tool_is_tool_execution_error_not_method_not_found() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &[r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"does_not_exist","arguments":{}}}"#],
        );

        assert_eq!(out[1]["id"], 6);
        assert_eq!(out[1]["error"]["code"], error_codes::TOOL_EXECUTION_ERROR);
        assert_eq!(
            out[1]["error"]["message"],
            "Tool execution error: Unknown tool name: does_not_exist"
        );
    }

    #[test]
    fn missing_parameter_error_names_the_parameter() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &[r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"save_note","arguments":{"key":"k"}}}"#],
        );

        assert_eq!(out[1]["error"]["code"], error_codes::TOOL_EXECUTION_ERROR);
        let message = out[1]["error"]["message"].as_str().expect("message");
        assert!(message.contains("body"), "message was: {}", message);
    }

    #[test]
    fn missing_tool_name_is_tool_execution_error() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &[
                r#"{"jsonrpc":"2.0","id":8,"method":"tools/call"}"#,
                r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"arguments":"nope"}}"#,
            ],
        );

        assert_eq!(out[1]["error"]["code"], error_codes::TOOL_EXECUTION_ERROR);
        assert_eq!(out[1]["error"]["message"], "Tool execution error: Missing tool name");
        assert_eq!(out[2]["error"]["code"], error_codes::TOOL_EXECUTION_ERROR);
    }

    #[test]
    fn tool_call_wraps_output_and_state_persists_between_calls() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &[
                r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"save_note","arguments":{"key":"k","body":"line one\nline two"}}}"#,
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"read_note","input":{"key":"k"}}}"#,
            ],
        );

        assert_eq!(
            out[1]["result"],
            json!({"content": [{"type": "text", "text": "saved k"}]})
        );
        assert_eq!(out[2]["result"]["content"][0]["text"], "line one\nline two");
        assert_eq!(server.state().len(), 1);
    }

    #[test]
    fn handler_failure_is_reported_and_loop_continues() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &[
                r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"read_note","arguments":{"key":"absent"}}}"#,
                r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            ],
        );

        assert_eq!(out[1]["error"]["code"], error_codes::TOOL_EXECUTION_ERROR);
        assert!(
            out[1]["error"]["message"]
                .as_str()
                .expect("message")
                .contains("no note absent")
        );
        assert_eq!(out[2]["result"], json!({}));
    }

    #[test]
    fn invalid_requests_are_answered() {
        let mut server = server();
        let out = run_lines(
            &mut server,
            &[
                r#"[1,2,3]"#,
                r#"{"jsonrpc":"2.0","id":4}"#,
                r#"{"jsonrpc":"2.0","id":5,"result":{}}"#,
            ],
        );

        assert_eq!(out.len(), 3, "client responses are not answered");
        assert_eq!(out[1]["error"]["code"], error_codes::INVALID_REQUEST);
        assert!(out[1]["id"].is_null());
        assert_eq!(out[2]["error"]["code"], error_codes::INVALID_REQUEST);
        assert_eq!(out[2]["id"], 4);
    }

    #[test]
    fn write_failure_stops_the_loop() {
        struct BrokenPipe;

        impl std::io::Write for BrokenPipe {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut server = server();
        let input = Cursor::new(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#.to_vec());
        let result = server.run(input, BrokenPipe);
        assert!(result.is_err());
    }

    #[test]
    fn read_failure_reports_internal_error() {
        struct FailingReader;

        impl std::io::Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("device gone"))
            }
        }

        let mut server = server().with_handshake(None);
        let mut output = Vec::new();
        let result = server.run(std::io::BufReader::new(FailingReader), &mut output);
        assert!(result.is_err());

        let text = String::from_utf8(output).expect("utf-8");
        let message: Value = serde_json::from_str(text.trim()).expect("json");
        assert_eq!(message["error"]["code"], error_codes::INTERNAL_SERVER_ERROR);
        assert!(message["id"].is_null());
    }
}
