use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolboxError>;

#[derive(Error, Debug)]
pub enum ToolboxError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("MCP error: {0}")]
    Mcp(#[from] mcp::McpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod guide;
pub mod maintenance;
pub mod mcp;
pub mod memory;
pub mod store;
pub mod toolbox;
pub mod vision;
