//! Project Configuration (crosscheck.toml)
//!
//! Handles configuration stored in `crosscheck.toml`. The same schema is used
//! for the user-level file.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Generation and scheduling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorConfig>,

    /// External toolchains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<ToolchainConfig>,

    /// Template overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates: Option<TemplatesConfig>,
}

/// `[generator]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Cases per generated file (default: 200)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,

    /// Concurrent workers (default: 8)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Regular expression selecting test names (default: ".*")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Extension of rendered reference sources (default: "ts")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_ext: Option<String>,

    /// Extension of rendered target sources (default: "ets")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_ext: Option<String>,
}

/// `[toolchain]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Colon-separated reference runtime prefix (default: "npx:ts-node")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts_node: Option<String>,

    /// Pattern the reference runtime version must match; empty disables the check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,

    /// Target toolchain installation root; enables verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panda: Option<PathBuf>,
}

/// `[templates]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TemplatesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check values that are wrong regardless of other layers
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(generator) = &self.generator {
            if generator.chunk_size == Some(0) {
                return Err(ConfigError::invalid(
                    "generator.chunk_size",
                    "chunk size must be at least 1",
                ));
            }
            for (field, ext) in [
                ("generator.reference_ext", &generator.reference_ext),
                ("generator.target_ext", &generator.target_ext),
            ] {
                if let Some(ext) = ext {
                    validate_extension(field, ext)?;
                }
            }
        }

        if let Some(toolchain) = &self.toolchain {
            if let Some(prefix) = &toolchain.ts_node {
                if crate::split_prefix(prefix).is_empty() {
                    return Err(ConfigError::invalid(
                        "toolchain.ts_node",
                        "prefix cannot be empty",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Merge another config into this one, field by field.
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &ProjectConfig) {
        if let Some(theirs) = &other.generator {
            let ours = self.generator.get_or_insert_with(Default::default);
            overlay(&mut ours.chunk_size, &theirs.chunk_size);
            overlay(&mut ours.workers, &theirs.workers);
            overlay(&mut ours.filter, &theirs.filter);
            overlay(&mut ours.reference_ext, &theirs.reference_ext);
            overlay(&mut ours.target_ext, &theirs.target_ext);
        }
        if let Some(theirs) = &other.toolchain {
            let ours = self.toolchain.get_or_insert_with(Default::default);
            overlay(&mut ours.ts_node, &theirs.ts_node);
            overlay(&mut ours.node_version, &theirs.node_version);
            overlay(&mut ours.panda, &theirs.panda);
        }
        if let Some(theirs) = &other.templates {
            let ours = self.templates.get_or_insert_with(Default::default);
            overlay(&mut ours.reference, &theirs.reference);
            overlay(&mut ours.target, &theirs.target);
        }
    }

    /// Make relative paths relative to `root` instead of the working directory
    pub fn anchor(&mut self, root: &Path) {
        let join = |path: &mut Option<PathBuf>| {
            if let Some(p) = path.as_mut() {
                if p.is_relative() {
                    *p = root.join(&*p);
                }
            }
        };
        if let Some(toolchain) = self.toolchain.as_mut() {
            join(&mut toolchain.panda);
        }
        if let Some(templates) = self.templates.as_mut() {
            join(&mut templates.reference);
            join(&mut templates.target);
        }
    }
}

fn overlay<T: Clone>(ours: &mut Option<T>, theirs: &Option<T>) {
    if theirs.is_some() {
        ours.clone_from(theirs);
    }
}

fn validate_extension(field: &str, ext: &str) -> ConfigResult<()> {
    if ext.is_empty() {
        return Err(ConfigError::invalid(field, "extension cannot be empty"));
    }
    if ext.contains(['.', '/', '\\']) {
        return Err(ConfigError::invalid(
            field,
            format!("'{}' must be a bare extension without dots or separators", ext),
        ));
    }
    Ok(())
}
