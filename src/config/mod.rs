// Configuration management module
// Handles the TOML configuration file and its human-readable rendering

pub mod display;
pub mod settings;


pub use display::show_config;
pub use settings::{
    Config, ConfigError, GuideConfig, MemoryConfig, RetryConfig, ServerConfig, VisionConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
