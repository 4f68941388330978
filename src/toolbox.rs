//! Server state and tool table for the agent toolbox.
//!
//! The toolbox owns every enabled tool set. Tool handlers borrow it for the
//! duration of a single call.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::config::Config;
use crate::guide::{self, GuideBook};
use crate::mcp::{Arguments, Implementation, McpError, McpResult, McpServer, ToolError, ToolRegistry};
use crate::memory::{self, TaskMemory};
use crate::store::JsonFileStore;
use crate::vision::{self, VisionClient};

/// A group of tools that can be served together
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Toolset {
    /// Operation guides (SOPs) per platform
    Guide,
    /// Titled task memories
    Memory,
    /// Image analysis through a vision API
    Vision,
}

impl Toolset {
    pub const ALL: [Self; 3] = [Self::Guide, Self::Memory, Self::Vision];

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guide => "guide",
            Self::Memory => "memory",
            Self::Vision => "vision",
        }
    }
}

impl fmt::Display for Toolset {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comma-separated names, for logs
#[inline]
pub fn toolset_names(toolsets: &[Toolset]) -> String {
    toolsets
        .iter()
        .map(|toolset| toolset.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

type Handler = fn(&mut Toolbox, &Arguments) -> Result<String, ToolError>;

#[derive(Default)]
pub struct Toolbox {
    guides: Option<GuideBook>,
    memory: Option<TaskMemory>,
    vision: Option<VisionClient>,
}

impl Toolbox {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the stores and clients for each requested tool set
    #[inline]
    pub fn from_config(config: &Config, toolsets: &[Toolset]) -> Result<Self> {
        let mut toolbox = Self::new();

        if toolsets.contains(&Toolset::Guide) {
            info!("Loading guides from {}", config.guide.file.display());
            toolbox.guides = Some(GuideBook::open(Box::new(JsonFileStore::new(
                &config.guide.file,
            ))));
        }

        if toolsets.contains(&Toolset::Memory) {
            info!("Using memory file {}", config.memory.file.display());
            toolbox.memory = Some(TaskMemory::new(Box::new(JsonFileStore::new(
                &config.memory.file,
            ))));
        }

        if toolsets.contains(&Toolset::Vision) {
            let client =
                VisionClient::new(&config.vision).context("Failed to create vision client")?;
            info!("Vision API at {}", client.api_url());
            toolbox.vision = Some(client);
        }

        Ok(toolbox)
    }

    #[inline]
    pub fn with_guides(mut self, guides: GuideBook) -> Self {
        self.guides = Some(guides);
        self
    }

    #[inline]
    pub fn with_memory(mut self, memory: TaskMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    #[inline]
    pub fn with_vision(mut self, vision: VisionClient) -> Self {
        self.vision = Some(vision);
        self
    }

    #[inline]
    pub fn guides(&self) -> Result<&GuideBook, ToolError> {
        self.guides.as_ref().ok_or(ToolError::Unavailable("guide"))
    }

    #[inline]
    pub fn guides_mut(&mut self) -> Result<&mut GuideBook, ToolError> {
        self.guides.as_mut().ok_or(ToolError::Unavailable("guide"))
    }

    #[inline]
    pub fn memory(&self) -> Result<&TaskMemory, ToolError> {
        self.memory.as_ref().ok_or(ToolError::Unavailable("memory"))
    }

    #[inline]
    pub fn memory_mut(&mut self) -> Result<&mut TaskMemory, ToolError> {
        self.memory.as_mut().ok_or(ToolError::Unavailable("memory"))
    }

    #[inline]
    pub fn vision(&self) -> Result<&VisionClient, ToolError> {
        self.vision.as_ref().ok_or(ToolError::Unavailable("vision"))
    }
}

fn handler_for(name: &str) -> Option<Handler> {
    let handler: Handler = match name {
        guide::LIST_TOOL => |tb, args| guide::list_operations(tb.guides()?, args),
        guide::DETAILS_TOOL => |tb, args| guide::operation_details(tb.guides()?, args),
        guide::UPDATE_TOOL => |tb, args| guide::update_guide(tb.guides_mut()?, args),
        memory::SAVE_TOOL => |tb, args| memory::save_task(tb.memory_mut()?, args),
        memory::RECALL_TOOL => |tb, args| memory::recall_task(tb.memory()?, args),
        vision::ANALYZE_TOOL => |tb, args| vision::analyze_image(tb.vision()?, args),
        _ => return None,
    };
    Some(handler)
}

/// Register the tools of every requested tool set, in a fixed order
/// regardless of how the sets were listed
#[inline]
pub fn build_registry(toolsets: &[Toolset]) -> McpResult<ToolRegistry<Toolbox>> {
    let mut registry = ToolRegistry::new();

    for toolset in Toolset::ALL {
        if !toolsets.contains(&toolset) {
            continue;
        }

        let tools = match toolset {
            Toolset::Guide => guide::tool_definitions(),
            Toolset::Memory => memory::tool_definitions(),
            Toolset::Vision => vision::tool_definitions(),
        };

        for tool in tools {
            let handler = handler_for(&tool.name).ok_or_else(|| McpError::InternalError {
                message: format!("No handler for tool {}", tool.name),
            })?;
            registry.register(tool, handler)?;
        }
    }

    Ok(registry)
}

/// Build the stdio server for `toolsets` from `config`
#[inline]
pub fn build_server(config: &Config, toolsets: &[Toolset]) -> Result<McpServer<Toolbox>> {
    let toolbox = Toolbox::from_config(config, toolsets)?;
    let registry = build_registry(toolsets).context("Failed to build tool registry")?;

    let server_info = Implementation {
        name: config.server.name.clone(),
        version: config.server.version.clone(),
    };

    Ok(McpServer::new(server_info, registry, toolbox).with_handshake(config.server.handshake()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::{Map, Value};

    #[test]
    fn registry_follows_fixed_order() {
        let registry =
            build_registry(&[Toolset::Vision, Toolset::Guide]).expect("should build registry");
        let names: Vec<String> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                guide::LIST_TOOL,
                guide::DETAILS_TOOL,
                guide::UPDATE_TOOL,
                vision::ANALYZE_TOOL
            ]
        );
    }

    #[test]
    fn every_tool_has_a_handler() {
        let registry = build_registry(&Toolset::ALL).expect("should build registry");
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn repeated_toolsets_register_once() {
        let registry = build_registry(&[Toolset::Memory, Toolset::Memory])
            .expect("duplicates in the request are harmless");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn disabled_toolset_is_unavailable() {
        let registry = build_registry(&[Toolset::Memory]).expect("should build registry");
        let mut toolbox = Toolbox::new();

        let mut map = Map::new();
        map.insert("title".to_string(), Value::from("T"));
        map.insert("task_description".to_string(), Value::from("D"));

        let err = registry
            .call(&mut toolbox, memory::SAVE_TOOL, &Arguments::new(map))
            .expect_err("memory is not attached");
        assert_eq!(err.to_string(), "Tool set 'memory' is not enabled");
    }

    #[test]
    fn handlers_reach_attached_state() {
        let registry = build_registry(&[Toolset::Memory]).expect("should build registry");
        let mut toolbox = Toolbox::new().with_memory(TaskMemory::new(Box::new(
            MemoryStore::<memory::Memories>::new(),
        )));

        let mut map = Map::new();
        map.insert("title".to_string(), Value::from("Plan"));
        map.insert("task_description".to_string(), Value::from("ship it"));
        registry
            .call(&mut toolbox, memory::SAVE_TOOL, &Arguments::new(map))
            .expect("should save");

        let mut map = Map::new();
        map.insert("title".to_string(), Value::from("Plan"));
        let recalled = registry
            .call(&mut toolbox, memory::RECALL_TOOL, &Arguments::new(map))
            .expect("should recall");
        assert_eq!(recalled, "ship it");
    }

    #[test]
    fn joins_toolset_names_for_logs() {
        assert_eq!(toolset_names(&Toolset::ALL), "guide, memory, vision");
        assert_eq!(toolset_names(&[]), "");
    }

    #[test]
    fn toolset_parses_from_name() {
        assert_eq!(Toolset::Vision.to_string(), "vision");
        assert_eq!(
            Toolset::from_str("guide", false).expect("valid name"),
            Toolset::Guide
        );
    }
}
