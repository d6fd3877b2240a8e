pub mod generate;
pub mod list;

use anyhow::Result;
use crosscheck_config::{ConfigLoader, Settings};
use std::path::Path;

/// Settings from the explicit config file, or the nearest crosscheck.toml
pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let mut loader = ConfigLoader::new();
    let loaded = match config {
        Some(path) => loader.load_from_file(path)?,
        None => loader.load_from_directory(&std::env::current_dir()?)?,
    };
    Ok(loaded.settings)
}
