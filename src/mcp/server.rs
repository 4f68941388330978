//! MCP Server Implementation
//!
//! The single-threaded stdio loop: write the handshake, then read one line at
//! a time, classify it, dispatch requests through the tool registry and write
//! exactly one response per request. Notifications never produce output.

use crate::mcp::errors::{McpError, McpResult, ToolError, result_value};
use crate::mcp::protocol::*;
use crate::mcp::tools::ToolRegistry;
use crate::mcp::validation::{Arguments, Incoming, classify};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use tracing::{debug, error, info, warn};

/// Connection state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// MCP Server: owns the tool registry and the state its handlers operate on
pub struct McpServer<S> {
    /// Server implementation information
    pub server_info: Implementation,
    handshake: Option<String>,
    registry: ToolRegistry<S>,
    state: S,
    connection_state: ConnectionState,
}

impl<S> McpServer<S> {
    /// Create a new MCP server
    #[inline]
    pub fn new(server_info: Implementation, registry: ToolRegistry<S>, state: S) -> Self {
        Self {
            server_info,
            handshake: Some(MCP_HANDSHAKE_VERSION.to_string()),
            registry,
            state,
            connection_state: ConnectionState::Uninitialized,
        }
    }

    /// Set the version announced in the startup handshake, or `None` to skip
    /// the handshake line entirely
    #[inline]
    pub fn with_handshake(mut self, version: Option<String>) -> Self {
        self.handshake = version;
        self
    }

    #[inline]
    pub fn state(&self) -> &S {
        &self.state
    }

    #[inline]
    pub fn into_state(self) -> S {
        self.state
    }

    #[inline]
    pub fn registry(&self) -> &ToolRegistry<S> {
        &self.registry
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    /// Start the server on the process's stdin/stdout
    #[inline]
    pub fn serve_stdio(&mut self) -> McpResult<()> {
        info!("Starting MCP server with stdio transport");
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run(stdin.lock(), stdout.lock())
    }

    /// Run the read loop until end of input.
    ///
    /// Returns an error only for unrecoverable I/O failures; every per-line
    /// failure is turned into a response and the loop continues.
    #[inline]
    pub fn run<R, W>(&mut self, mut input: R, mut output: W) -> McpResult<()>
    where
        R: BufRead,
        W: Write,
    {
        if let Some(version) = &self.handshake {
            write_json(&mut output, &Handshake::new(version)).inspect_err(|e| {
                error!("Failed to write handshake: {}", e);
            })?;
        }

        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            match input.read_until(b'\n', &mut buffer) {
                Ok(0) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Ok(_) => {
                    if let Some(message) = self.handle_line(&buffer) {
                        write_json(&mut output, &message).inspect_err(|e| {
                            error!("Failed to write response, shutting down: {}", e);
                        })?;
                    }
                }
                Err(e) => {
                    error!("Error reading input: {}", e);
                    let fatal = McpError::InternalError {
                        message: e.to_string(),
                    };
                    // Best effort; the channel may already be gone.
                    let _ = write_json(&mut output, &fatal.to_error_response(None));
                    self.connection_state = ConnectionState::Closed;
                    return Err(McpError::Io(e));
                }
            }
        }

        self.connection_state = ConnectionState::Closed;
        info!("MCP server stopped");
        Ok(())
    }

    /// Process one raw input line, returning the message to write back if
    /// any. Blank lines are ignored.
    #[inline]
    pub fn handle_line(&mut self, line: &[u8]) -> Option<JsonRpcMessage> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_slice(line) {
            Ok(value) => value,
            Err(e) => {
                let error = McpError::from(e);
                error.log();
                return Some(error.to_error_response(None));
            }
        };

        self.handle_message(classify(value))
    }

    /// Process a classified message
    #[inline]
    pub fn handle_message(&mut self, message: Incoming) -> Option<JsonRpcMessage> {
        match message {
            Incoming::Request(request) => Some(self.handle_request(request)),
            Incoming::Notification(notification) => {
                self.handle_notification(&notification);
                None
            }
            Incoming::ClientResponse => {
                warn!("Received unexpected response message from client");
                None
            }
            Incoming::Invalid { id, reason } => {
                let error = McpError::InvalidRequest { message: reason };
                error.log();
                Some(error.to_error_response(id))
            }
        }
    }

    /// Handle a JSON-RPC request; always yields exactly one message
    fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcMessage {
        debug!("Request {:?}: {}", request.id, request.method);

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params),
            _ => Err(McpError::MethodNotFound {
                method: request.method,
            }),
        };

        match result {
            Ok(result) => JsonRpcMessage::Response(JsonRpcResponse::new(result, request.id)),
            Err(e) => {
                e.log();
                e.to_error_response(Some(request.id))
            }
        }
    }

    /// Handle a JSON-RPC notification
    fn handle_notification(&mut self, notification: &JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => {
                self.connection_state = ConnectionState::Ready;
                info!("Client has initialized, server ready to handle requests");
            }
            "notifications/cancelled" => {
                debug!("Received cancellation notification; requests run to completion");
            }
            other => {
                debug!("Ignoring notification: {}", other);
            }
        }
    }

    fn handle_initialize(&mut self, params: Value) -> McpResult<Value> {
        let params: InitializeParams = serde_json::from_value(params).unwrap_or_default();

        if let Some(client) = &params.client_info {
            info!("Client initializing: {} {}", client.name, client.version);
        }
        self.connection_state = ConnectionState::Initializing;

        let result = InitializeResult {
            protocol_version: params
                .protocol_version
                .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string()),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: self.server_info.clone(),
        };
        result_value(&result)
    }

    fn handle_list_tools(&self) -> McpResult<Value> {
        let result = ListToolsResult {
            tools: self.registry.list_tools(),
        };
        result_value(&result)
    }

    fn handle_call_tool(&mut self, params: Value) -> McpResult<Value> {
        let params: CallToolParams = if params.is_null() {
            CallToolParams::default()
        } else {
            serde_json::from_value(params)
                .map_err(|e| ToolError::invalid("params", e.to_string()))?
        };

        let name = params.name.clone().ok_or(ToolError::MissingToolName)?;
        let arguments = Arguments::new(params.into_arguments());
        info!("Received tool call: {}", name);

        let text = self.registry.call(&mut self.state, &name, &arguments)?;
        result_value(&CallToolResult::text(text))
    }
}

/// Write a serializable value as a single JSON line and flush
fn write_json<W, T>(writer: &mut W, value: &T) -> McpResult<()>
where
    W: Write,
    T: Serialize,
{
    let json = serde_json::to_vec(value).map_err(io::Error::other)?;
    writer.write_all(&json)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
