//! Crosscheck Configuration System
//!
//! Provides configuration management for crosscheck runs including:
//! - Project configuration (crosscheck.toml)
//! - User configuration (~/.crosscheck/config.toml)
//! - Environment variable overrides (CROSSCHECK_*)
//! - Resolution into effective run settings
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. User config (~/.crosscheck/config.toml)
//! 3. Project config (crosscheck.toml, searched upwards from the working directory)
//! 4. Environment variables (CROSSCHECK_*)
//! 5. CLI flags (applied by the caller)
//!
//! # Example
//!
//! ```no_run
//! use crosscheck_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("chunk size {}", config.settings.chunk_size);
//! ```

pub mod loader;
pub mod project;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader, CONFIG_FILE_NAME};
pub use project::{GeneratorConfig, ProjectConfig, TemplatesConfig, ToolchainConfig};
pub use settings::{split_prefix, Settings};
