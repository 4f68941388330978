//! Operation guides (SOPs): step-by-step notes keyed by platform and
//! operation name, loaded once at startup and written back on every update.


use crate::mcp::{Arguments, Tool, ToolError};
use crate::store::{SnapshotStore, StoreError};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{error, info};

/// platform → operation → details
pub type Guides = BTreeMap<String, BTreeMap<String, String>>;

pub const LIST_TOOL: &str = "get_platform_guide_list";
pub const DETAILS_TOOL: &str = "get_operation_details";
pub const UPDATE_TOOL: &str = "update_operation_guide";

pub struct GuideBook {
    store: Box<dyn SnapshotStore<Guides>>,
    guides: Guides,
    /// Set when the store could not be read; updates are refused so the
    /// existing file is left intact.
    load_error: Option<String>,
}

impl GuideBook {
    /// Load guides from `store`. An unreadable or corrupt store is logged and
    /// read as empty so the server can still start, but it is never written.
    #[inline]
    pub fn open(store: Box<dyn SnapshotStore<Guides>>) -> Self {
        let (guides, load_error) = match store.load() {
            Ok(guides) => (guides.unwrap_or_default(), None),
            Err(e) => {
                error!("Failed to load guides, updates are disabled: {}", e);
                (Guides::new(), Some(e.to_string()))
            }
        };
        info!(
            "Loaded {} platform guide(s) from {}",
            guides.len(),
            store.describe()
        );
        Self {
            store,
            guides,
            load_error,
        }
    }

    #[inline]
    pub fn operations(&self, platform: &str) -> Vec<&str> {
        self.guides
            .get(platform)
            .map(|ops| ops.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[inline]
    pub fn details(&self, platform: &str, operation: &str) -> Option<&str> {
        self.guides
            .get(platform)
            .and_then(|ops| ops.get(operation))
            .map(String::as_str)
    }

    /// Insert or replace a guide and write the whole book back. The
    /// in-memory book only changes once the write has succeeded.
    #[inline]
    pub fn upsert(
        &mut self,
        platform: &str,
        operation: &str,
        details: &str,
    ) -> Result<(), StoreError> {
        if let Some(reason) = &self.load_error {
            return Err(StoreError::Unloaded {
                location: self.store.describe(),
                reason: reason.clone(),
            });
        }

        let mut updated = self.guides.clone();
        updated
            .entry(platform.to_string())
            .or_default()
            .insert(operation.to_string(), details.to_string());
        self.store.save(&updated)?;
        self.guides = updated;
        info!("Saved guides to {}", self.store.describe());
        Ok(())
    }

    #[inline]
    pub fn guides(&self) -> &Guides {
        &self.guides
    }
}

/// Tool descriptors for the guide tool set, in listing order
#[inline]
pub fn tool_definitions() -> Vec<Tool> {
    let platform = json!({
        "type": "string",
        "description": "Platform name (e.g., 'GitLab', 'ownCloud', 'Plane', 'RocketChat')."
    });

    vec![
        Tool {
            name: LIST_TOOL.to_string(),
            description: "Queries all currently known operation guides (SOPs) for a specific \
                platform. Call this tool before attempting any operation to see if existing \
                experience can be followed."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"platform": platform},
                "required": ["platform"]
            }),
        },
        Tool {
            name: DETAILS_TOOL.to_string(),
            description: "Retrieves the detailed steps for a specific operation (SOP) on a \
                platform. Call 'get_platform_guide_list' first to get the correct operation name."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "platform": platform,
                    "operation": {
                        "type": "string",
                        "description": "The short name of the operation (e.g., 'CreatePullRequest', 'DeployToVercel')."
                    }
                },
                "required": ["platform", "operation"]
            }),
        },
        Tool {
            name: UPDATE_TOOL.to_string(),
            description: "Adds a new operation guide (SOP) for a platform or updates an existing \
                one. Call this tool to save your experience after completing a new operation or \
                improving an existing flow."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "platform": platform,
                    "operation": {
                        "type": "string",
                        "description": "The short name of the operation in CamelCase, e.g., 'CreatePullRequest'."
                    },
                    "details": {
                        "type": "string",
                        "description": "Detailed operation steps and experience summary (SOP)."
                    }
                },
                "required": ["platform", "operation", "details"]
            }),
        },
    ]
}

#[inline]
pub fn list_operations(book: &GuideBook, args: &Arguments) -> Result<String, ToolError> {
    let platform = args.required_str("platform")?;
    info!("Listing guides for platform '{}'", platform);

    let operations = book.operations(platform);
    if operations.is_empty() {
        Ok(format!("No operations (SOPs) found for platform: '{}'.", platform))
    } else {
        Ok(format!(
            "Known operations for '{}': {}",
            platform,
            operations.join(", ")
        ))
    }
}

#[inline]
pub fn operation_details(book: &GuideBook, args: &Arguments) -> Result<String, ToolError> {
    let platform = args.required_str("platform")?;
    let operation = args.required_str("operation")?;
    info!("Fetching guide '{}' for platform '{}'", operation, platform);

    Ok(match book.details(platform, operation) {
        Some(details) => details.to_string(),
        None => format!(
            "Error: Operation '{}' not found for platform '{}'.",
            operation, platform
        ),
    })
}

#[inline]
pub fn update_guide(book: &mut GuideBook, args: &Arguments) -> Result<String, ToolError> {
    let platform = args.required_str("platform")?;
    let operation = args.required_str("operation")?;
    let details = args.required_str("details")?;
    info!("Updating guide '{}' for platform '{}'", operation, platform);

    book.upsert(platform, operation, details)?;
    Ok(format!(
        "Successfully saved new guide '{}' for platform '{}'.",
        operation, platform
    ))
}
