// Configuration management module
// Loads the TOML configuration for the server and its data feeds

pub mod settings;

pub use settings::{APP_DIR_NAME, Config, ConfigError, FeedConfig, ServerConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
