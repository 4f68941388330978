//! Titled task memories.
//!
//! The memory file may be shared with sibling agent processes, so it is
//! re-read on every call and rewritten whole on every save.


use crate::mcp::{Arguments, Tool, ToolError};
use crate::store::{SnapshotStore, StoreError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const SAVE_TOOL: &str = "save_task_details";
pub const RECALL_TOOL: &str = "recall_task_details";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Seconds since the Unix epoch
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub content: String,
}

pub type Memories = BTreeMap<String, MemoryEntry>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    AlreadyExists,
}

pub struct TaskMemory {
    store: Box<dyn SnapshotStore<Memories>>,
}

impl TaskMemory {
    #[inline]
    pub fn new(store: Box<dyn SnapshotStore<Memories>>) -> Self {
        Self { store }
    }

    /// Current memories. A corrupt file reads as empty.
    #[inline]
    pub fn load(&self) -> Memories {
        match self.store.load() {
            Ok(memories) => memories.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable memory file: {}", e);
                Memories::new()
            }
        }
    }

    /// Store `content` under `title` unless the title is already taken. A
    /// file that cannot be read is left untouched and the save fails.
    #[inline]
    pub fn save(&mut self, title: &str, content: &str) -> Result<SaveOutcome, StoreError> {
        let mut memories = self.store.load()?.unwrap_or_default();
        if memories.contains_key(title) {
            return Ok(SaveOutcome::AlreadyExists);
        }

        memories.insert(
            title.to_string(),
            MemoryEntry {
                timestamp: now_epoch_secs(),
                content: content.to_string(),
            },
        );
        self.store.save(&memories)?;
        info!("Saved memory '{}' to {}", title, self.store.describe());
        Ok(SaveOutcome::Saved)
    }

    /// Titles in the order they were saved
    #[inline]
    pub fn outline(&self) -> Vec<String> {
        let memories = self.load();
        let mut entries: Vec<(&String, &MemoryEntry)> = memories.iter().collect();
        entries.sort_by(|a, b| a.1.timestamp.total_cmp(&b.1.timestamp).then(a.0.cmp(b.0)));
        entries.into_iter().map(|(title, _)| title.clone()).collect()
    }

    #[inline]
    pub fn recall(&self, title: &str) -> Option<MemoryEntry> {
        self.load().remove(title)
    }
}

fn now_epoch_secs() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

#[inline]
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: SAVE_TOOL.to_string(),
            description: "Saves the verbatim (exact) text of a task or failure to permanent \
                local memory under a specific title."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "The title for the memory, in UpperCamelCase format (e.g., MyTaskDetails)."
                    },
                    "task_description": {
                        "type": "string",
                        "description": "The exact, word-for-word task or content to save."
                    }
                },
                "required": ["title", "task_description"]
            }),
        },
        Tool {
            name: RECALL_TOOL.to_string(),
            description: "Retrieves memories. If no title is given, returns an outline (list) of \
                all memory titles. If a title is given, returns the specific content for that title."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "The UpperCamelCase title of the memory to recall. If omitted, returns the outline."
                    }
                },
                "required": []
            }),
        },
    ]
}

#[inline]
pub fn save_task(memory: &mut TaskMemory, args: &Arguments) -> Result<String, ToolError> {
    let title = args.required_str("title")?;
    let content = args.required_str("task_description")?;

    Ok(match memory.save(title, content)? {
        SaveOutcome::Saved => format!("Successfully saved memory with title: {}", title),
        SaveOutcome::AlreadyExists => {
            info!("Memory '{}' already exists", title);
            format!("Memory title '{}' already exists, skipped.", title)
        }
    })
}

#[inline]
pub fn recall_task(memory: &TaskMemory, args: &Arguments) -> Result<String, ToolError> {
    match args.optional_str("title")? {
        Some(title) => Ok(match memory.recall(title) {
            Some(entry) => entry.content,
            None => format!("Error: Memory with title '{}' not found.", title),
        }),
        None => {
            let titles = memory.outline();
            if titles.is_empty() {
                return Ok(
                    "No memory file found or memory is empty. Nothing to recall.".to_string(),
                );
            }
            let outline: Vec<String> = titles.iter().map(|t| format!("- {}", t)).collect();
            Ok(format!(
                "Successfully recalled memory outline:\n{}",
                outline.join("\n")
            ))
        }
    }
}
