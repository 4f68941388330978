
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::mcp::protocol::MCP_HANDSHAKE_VERSION;
use crate::toolbox::Toolset;
use crate::vision::retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_RETRY_ATTEMPTS};
use crate::vision::{ApiFlavor, ImageInput};

const APP_DIR: &str = "agent-toolbox";
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_GUIDE_FILE: &str = "application_guide.json";
pub const DEFAULT_MEMORY_FILE: &str = "task_local_memory.json";
pub const DEFAULT_VISION_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/multimodal-generation/generation";
pub const DEFAULT_VISION_MODEL: &str = "qwen-vl-plus";
pub const DEFAULT_API_KEY_ENV: &str = "QWEN_API_KEY";
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub guide: GuideConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    /// File this configuration was loaded from, and where `save` writes
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    /// Write the `{"mcp": ...}` line before reading requests
    pub handshake: bool,
    pub handshake_version: String,
    pub toolsets: Vec<Toolset>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            handshake: true,
            handshake_version: MCP_HANDSHAKE_VERSION.to_string(),
            toolsets: vec![Toolset::Guide, Toolset::Memory, Toolset::Vision],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GuideConfig {
    pub file: PathBuf,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_GUIDE_FILE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MemoryConfig {
    pub file: PathBuf,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_MEMORY_FILE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VisionConfig {
    pub api_url: String,
    pub flavor: ApiFlavor,
    pub model: String,
    /// Explicit key; when unset the key is read from `api_key_env` per call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub image_input: ImageInput,
    pub retry: RetryConfig,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_VISION_URL.to_string(),
            flavor: ApiFlavor::default(),
            model: DEFAULT_VISION_MODEL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECONDS,
            image_input: ImageInput::default(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid server name: {0:?} (cannot be empty)")]
    InvalidServerName(String),
    #[error("Invalid handshake version: {0:?} (cannot be empty)")]
    InvalidHandshakeVersion(String),
    #[error("No tool sets enabled")]
    NoToolsets,
    #[error("Invalid {0} file path (cannot be empty)")]
    EmptyPath(&'static str),
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid API key variable: {0:?} (cannot be empty)")]
    InvalidApiKeyEnv(String),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid retry delay: {0}ms (must be at most 60000)")]
    InvalidRetryDelay(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Per-user configuration directory
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load from `path`, or from the per-user location when `None`
    #[inline]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let default_path =
                    Self::default_path().context("Failed to determine config file path")?;
                Self::load_from(&default_path)
            }
        }
    }

    /// Load and validate a config file. A missing file yields defaults.
    #[inline]
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self {
                source: Some(config_path.to_path_buf()),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.source = Some(config_path.to_path_buf());

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        info!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    /// Write the configuration back to where it was loaded from, returning
    /// the path written
    #[inline]
    pub fn save(&self) -> Result<PathBuf> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_path = self.config_file_path()?;
        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir).with_context(|| {
                format!(
                    "Failed to create config directory: {}",
                    config_dir.display()
                )
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(config_path)
    }

    #[inline]
    pub fn config_file_path(&self) -> Result<PathBuf> {
        match &self.source {
            Some(path) => Ok(path.clone()),
            None => Self::default_path().context("Failed to determine config file path"),
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        if self.guide.file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("guide"));
        }
        if self.memory.file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("memory"));
        }
        self.vision.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidServerName(self.name.clone()));
        }

        if self.handshake && self.handshake_version.trim().is_empty() {
            return Err(ConfigError::InvalidHandshakeVersion(
                self.handshake_version.clone(),
            ));
        }

        if self.toolsets.is_empty() {
            return Err(ConfigError::NoToolsets);
        }

        Ok(())
    }

    /// Handshake version to announce, if enabled
    pub fn handshake(&self) -> Option<String> {
        self.handshake.then(|| self.handshake_version.clone())
    }
}

impl VisionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.api_key.is_none() && self.api_key_env.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(self.api_key_env.clone()));
        }

        if !(1..=600).contains(&self.timeout_secs) {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }

        if !(1..=10).contains(&self.retry.max_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry.max_attempts));
        }

        if self.retry.base_delay_ms > 60_000 {
            return Err(ConfigError::InvalidRetryDelay(self.retry.base_delay_ms));
        }

        Ok(())
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let url =
            Url::parse(&self.api_url).map_err(|_| ConfigError::InvalidUrl(self.api_url.clone()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidProtocol(other.to_string())),
        }
    }
}
