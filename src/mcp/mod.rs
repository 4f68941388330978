//! MCP (Model Context Protocol) Server Implementation
//!
//! This module provides a line-delimited JSON-RPC 2.0 tool server for stdio,
//! with a startup handshake, a name-keyed tool registry and a fixed error
//! taxonomy.

#[cfg(test)]
mod tests;

pub mod errors;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod validation;

pub use errors::{McpError, McpResult, ToolError};
pub use protocol::{
    CallToolResult, Implementation, JsonRpcMessage, ListToolsResult, RequestId, Tool, ToolContent,
    error_codes,
};
pub use server::{ConnectionState, McpServer};
pub use tools::{ToolHandler, ToolRegistry};
pub use validation::Arguments;
