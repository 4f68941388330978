//! MCP Error Handling
//!
//! Two layers: `McpError` covers failures of the protocol loop itself and
//! maps each one onto a JSON-RPC error object; `ToolError` covers failures
//! raised by tool handlers, all of which surface to the client as a tool
//! execution error carrying only the message text.

use crate::mcp::protocol::*;
use crate::store::StoreError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

/// Failures of the protocol loop
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid Request: {message}")]
    InvalidRequest { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Tool execution error: {0}")]
    ToolExecution(#[from] ToolError),

    #[error("Duplicate tool name: {name}")]
    DuplicateTool { name: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised while validating arguments for, or running, a tool
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Unknown tool name: {name}")]
    UnknownTool { name: String },

    #[error("Missing tool name")]
    MissingToolName,

    #[error("Tool set '{0}' is not enabled")]
    Unavailable(&'static str),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Upstream API error: {0}")]
    Upstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToolError {
    #[inline]
    pub fn missing(name: &str) -> Self {
        Self::MissingParameter {
            name: name.to_string(),
        }
    }

    #[inline]
    pub fn invalid(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

impl McpError {
    /// Convert MCP error to JSON-RPC error
    #[inline]
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        let code = match self {
            Self::ParseError { .. } => error_codes::PARSE_ERROR,
            Self::InvalidRequest { .. } => error_codes::INVALID_REQUEST,
            Self::MethodNotFound { .. } => error_codes::METHOD_NOT_FOUND,
            Self::ToolExecution(_) => error_codes::TOOL_EXECUTION_ERROR,
            Self::DuplicateTool { .. } | Self::InternalError { .. } | Self::Io(_) => {
                error_codes::INTERNAL_SERVER_ERROR
            }
        };
        JsonRpcError::new(code, self.to_string())
    }

    /// Create error response message
    #[inline]
    pub fn to_error_response(&self, id: Option<RequestId>) -> JsonRpcMessage {
        JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(self.to_jsonrpc_error(), id))
    }

    /// Log the error with appropriate level
    #[inline]
    pub fn log(&self) {
        match self {
            Self::ParseError { .. } | Self::InvalidRequest { .. } | Self::MethodNotFound { .. } => {
                warn!("Client error: {}", self);
            }
            Self::ToolExecution(_) => {
                error!("{}", self);
            }
            _ => {
                error!("Server error: {}", self);
            }
        }
    }
}

impl From<serde_json::Error> for McpError {
    #[inline]
    fn from(error: serde_json::Error) -> Self {
        Self::ParseError {
            message: error.to_string(),
        }
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Serialize a method result. A failure here is on the server side, so it is
/// reported as an internal error rather than a parse error.
#[inline]
pub fn result_value<T: Serialize>(result: &T) -> McpResult<Value> {
    serde_json::to_value(result).map_err(|e| McpError::InternalError {
        message: format!("Failed to serialize result: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_errors_map_to_execution_code() {
        let error = McpError::from(ToolError::UnknownTool {
            name: "nope".to_string(),
        });

        let jsonrpc_error = error.to_jsonrpc_error();
        assert_eq!(jsonrpc_error.code, error_codes::TOOL_EXECUTION_ERROR);
        assert_eq!(
            jsonrpc_error.message,
            "Tool execution error: Unknown tool name: nope"
        );
    }

    #[test]
    fn missing_parameter_message_names_parameter() {
        let error = McpError::from(ToolError::missing("platform"));
        assert!(error.to_jsonrpc_error().message.contains("platform"));
    }

    #[test]
    fn method_not_found_error() {
        let error = McpError::MethodNotFound {
            method: "resources/list".to_string(),
        };

        let jsonrpc_error = error.to_jsonrpc_error();
        assert_eq!(jsonrpc_error.code, error_codes::METHOD_NOT_FOUND);
        assert!(jsonrpc_error.message.contains("resources/list"));
    }

    #[test]
    fn error_response_creation() {
        let error = McpError::InternalError {
            message: "stdin closed unexpectedly".to_string(),
        };

        let response = error.to_error_response(Some(RequestId::String("test".to_string())));

        if let JsonRpcMessage::ErrorResponse(err_resp) = response {
            assert_eq!(err_resp.error.code, error_codes::INTERNAL_SERVER_ERROR);
            assert!(err_resp.error.message.contains("stdin closed"));
            assert_eq!(err_resp.id, Some(RequestId::String("test".to_string())));
        } else {
            panic!("Expected error response");
        }
    }

    #[test]
    fn parse_error_code() {
        let parse_failure =
            serde_json::from_str::<serde_json::Value>("{not json").expect_err("invalid json");
        let error = McpError::from(parse_failure);
        assert_eq!(error.to_jsonrpc_error().code, error_codes::PARSE_ERROR);
    }

    #[test]
    fn unserializable_result_is_internal_error() {
        let mut result = std::collections::BTreeMap::new();
        result.insert((1, 2), "tuple keys cannot become JSON object keys");

        let error = result_value(&result).expect_err("should fail to serialize");
        let jsonrpc_error = error.to_jsonrpc_error();
        assert_eq!(jsonrpc_error.code, error_codes::INTERNAL_SERVER_ERROR);
        assert!(jsonrpc_error.message.starts_with("Internal server error"));
    }

    #[test]
    fn serializable_result_passes_through() {
        let value =
            result_value(&CallToolResult::text("ok".to_string())).expect("should serialize");
        assert_eq!(value["content"][0]["text"], "ok");
    }
}
