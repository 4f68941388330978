//! MCP Message Validation
//!
//! Classifies raw JSON documents into requests, notifications and stray
//! client responses, and checks tool arguments against the `required` list of
//! a tool's input schema before the handler runs.

use crate::mcp::errors::ToolError;
use crate::mcp::protocol::*;
use serde_json::{Map, Value};

/// A parsed input line after classification
#[derive(Debug, Clone)]
pub enum Incoming {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    /// A response sent by the client; the server never issues requests so
    /// these are logged and dropped
    ClientResponse,
    /// Valid JSON that is not a usable JSON-RPC message. `id` is recovered
    /// when the document carries a usable one.
    Invalid {
        id: Option<RequestId>,
        reason: String,
    },
}

/// Classify a raw JSON value as a JSON-RPC message
#[inline]
pub fn classify(value: Value) -> Incoming {
    let Value::Object(mut object) = value else {
        return Incoming::Invalid {
            id: None,
            reason: "message must be a JSON object".to_string(),
        };
    };

    let raw_id = object.remove("id").unwrap_or(Value::Null);
    let params = object.remove("params").unwrap_or(Value::Null);
    let method = object.remove("method");

    let id = if raw_id.is_null() {
        None
    } else {
        match RequestId::from_value(&raw_id) {
            Some(id) => Some(id),
            None => {
                return Incoming::Invalid {
                    id: None,
                    reason: "id must be a string or a number".to_string(),
                };
            }
        }
    };

    match (id, method) {
        (Some(id), Some(Value::String(method))) => {
            Incoming::Request(JsonRpcRequest { id, method, params })
        }
        (None, Some(Value::String(method))) => {
            Incoming::Notification(JsonRpcNotification { method, params })
        }
        (Some(_), None) if object.contains_key("result") || object.contains_key("error") => {
            Incoming::ClientResponse
        }
        (id, Some(_)) => Incoming::Invalid {
            id,
            reason: "method must be a string".to_string(),
        },
        (id, None) => Incoming::Invalid {
            id,
            reason: "missing method".to_string(),
        },
    }
}

/// Tool arguments as received in `tools/call`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    #[inline]
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// A mandatory string argument; absent, null and empty all count as
    /// missing
    #[inline]
    pub fn required_str(&self, name: &str) -> Result<&str, ToolError> {
        self.optional_str(name)?
            .ok_or_else(|| ToolError::missing(name))
    }

    /// An optional string argument; an empty string reads as absent
    #[inline]
    pub fn optional_str(&self, name: &str) -> Result<Option<&str>, ToolError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ToolError::invalid(
                name,
                format!("expected a string, got {}", json_type_name(other)),
            )),
        }
    }
}

impl From<Map<String, Value>> for Arguments {
    #[inline]
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Check that every parameter named in the schema's `required` list is
/// present and non-empty
#[inline]
pub fn validate_required(tool: &Tool, arguments: &Arguments) -> Result<(), ToolError> {
    let Some(required) = tool.input_schema.get("required").and_then(Value::as_array) else {
        return Ok(());
    };

    for name in required.iter().filter_map(Value::as_str) {
        let present = match arguments.get(name) {
            None => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(ToolError::missing(name));
        }
    }

    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
