//! MCP Tools Implementation
//!
//! The tool registry: an ordered, name-unique table of tool descriptors bound
//! to handler functions over a server-owned state `S`. Populated once at
//! startup and never changed afterwards.

use crate::mcp::errors::{McpError, McpResult, ToolError};
use crate::mcp::protocol::Tool;
use crate::mcp::validation::{Arguments, validate_required};
use std::collections::HashMap;
use tracing::debug;

/// Tool handler: borrows the server state for the duration of one call and
/// returns the text handed back to the client
pub type ToolHandler<S> = Box<dyn Fn(&mut S, &Arguments) -> Result<String, ToolError>>;

struct RegisteredTool<S> {
    tool: Tool,
    handler: ToolHandler<S>,
}

/// Tool registry for managing tool registration and dispatch
pub struct ToolRegistry<S> {
    tools: Vec<RegisteredTool<S>>,
    index: HashMap<String, usize>,
}

impl<S> ToolRegistry<S> {
    /// Create a new tool registry
    #[inline]
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Names are unique for the lifetime of the registry.
    #[inline]
    pub fn register<F>(&mut self, tool: Tool, handler: F) -> McpResult<()>
    where
        F: Fn(&mut S, &Arguments) -> Result<String, ToolError> + 'static,
    {
        if self.index.contains_key(&tool.name) {
            return Err(McpError::DuplicateTool { name: tool.name });
        }

        debug!("Registered tool: {}", tool.name);
        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            tool,
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// Get all registered tools, in registration order
    #[inline]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.tool.clone()).collect()
    }

    /// Get a specific tool by name
    #[inline]
    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i].tool)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate required arguments and run the named tool against `state`
    #[inline]
    pub fn call(
        &self,
        state: &mut S,
        name: &str,
        arguments: &Arguments,
    ) -> Result<String, ToolError> {
        let registered = self
            .index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })?;

        validate_required(&registered.tool, arguments)?;
        (registered.handler)(state, arguments)
    }
}

impl<S> Default for ToolRegistry<S> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
