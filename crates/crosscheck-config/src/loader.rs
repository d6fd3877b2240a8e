//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::project::ProjectConfig;
use crate::settings::{split_prefix, Settings};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Project configuration file name
pub const CONFIG_FILE_NAME: &str = "crosscheck.toml";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. User config (~/.crosscheck/config.toml) - lowest priority
/// 2. Project config (crosscheck.toml) - overrides user config
/// 3. Environment variables (CROSSCHECK_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// User config path; `None` skips the user layer
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Merged file configuration
    pub project: ProjectConfig,

    /// Directory where crosscheck.toml was found
    pub project_root: Option<PathBuf>,

    /// Effective settings after environment overrides
    pub settings: Settings,
}

impl ConfigLoader {
    /// Create a loader reading the user config from the home directory
    pub fn new() -> Self {
        Self {
            global_config_path: Self::global_config_dir()
                .ok()
                .map(|dir| dir.join("config.toml")),
        }
    }

    /// Use a specific user config file, or none at all
    pub fn with_global_config(mut self, path: Option<PathBuf>) -> Self {
        self.global_config_path = path;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find crosscheck.toml and merges it
    /// over the user config if one exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        self.finish(project_root, project_config)
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let mut project_config = ProjectConfig::load_from_file(config_path)?;
        let project_root = config_path.parent().map(|p| p.to_path_buf());
        if let Some(root) = &project_root {
            project_config.anchor(root);
        }
        self.finish(project_root, project_config)
    }

    fn finish(
        &mut self,
        project_root: Option<PathBuf>,
        project_config: ProjectConfig,
    ) -> ConfigResult<Config> {
        let mut merged = self.load_global_config()?;
        merged.merge(&project_config);

        let mut settings = Settings::from_project(&merged);
        apply_env_overrides(&mut settings)?;
        settings.validate()?;

        Ok(Config {
            project: merged,
            project_root,
            settings,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config); defaults when none is found
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let mut project_config = ProjectConfig::load_from_file(&config_path)?;
                project_config.anchor(&current);
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load the user config; missing file means defaults
    fn load_global_config(&self) -> ConfigResult<ProjectConfig> {
        match &self.global_config_path {
            Some(path) if path.exists() => {
                let mut config = ProjectConfig::load_from_file(path)?;
                if let Some(dir) = path.parent() {
                    config.anchor(dir);
                }
                Ok(config)
            }
            _ => Ok(ProjectConfig::default()),
        }
    }

    /// Get the user configuration directory (~/.crosscheck)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".crosscheck"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a crosscheck.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}

/// Apply environment variable overrides
///
/// Recognised: CROSSCHECK_CHUNK_SIZE, CROSSCHECK_WORKERS, CROSSCHECK_TS_NODE,
/// CROSSCHECK_PANDA. Empty values are ignored.
fn apply_env_overrides(settings: &mut Settings) -> ConfigResult<()> {
    if let Some(size) = env_value("CROSSCHECK_CHUNK_SIZE") {
        settings.chunk_size = parse_count("CROSSCHECK_CHUNK_SIZE", &size)?;
    }
    if let Some(workers) = env_value("CROSSCHECK_WORKERS") {
        settings.workers = parse_count("CROSSCHECK_WORKERS", &workers)?;
    }
    if let Some(prefix) = env_value("CROSSCHECK_TS_NODE") {
        settings.ts_node = split_prefix(&prefix);
    }
    if let Some(panda) = env_value("CROSSCHECK_PANDA") {
        settings.panda = Some(PathBuf::from(panda));
    }
    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_count(field: &str, value: &str) -> ConfigResult<usize> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{}' is not a non-negative integer", value),
    })
}
