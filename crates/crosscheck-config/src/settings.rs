//! Effective run settings
//!
//! [`Settings`] is the flat result of layering defaults, configuration files
//! and environment variables. Callers apply command-line flags on top and
//! call [`Settings::validate`] before use.

use crate::project::ProjectConfig;
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use std::path::PathBuf;

pub const DEFAULT_CHUNK_SIZE: usize = 200;
pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_TS_NODE: &str = "npx:ts-node";
pub const DEFAULT_FILTER: &str = ".*";
pub const DEFAULT_NODE_VERSION: &str = r"^21\.4(\.|\s*$)";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub chunk_size: usize,
    pub workers: usize,
    pub filter: String,
    pub reference_ext: String,
    pub target_ext: String,
    /// Reference runtime command prefix, one element per argument
    pub ts_node: Vec<String>,
    /// Version pattern for the reference runtime; `None` skips the check
    pub node_version: Option<String>,
    /// Target toolchain root; `Some` enables verification
    pub panda: Option<PathBuf>,
    pub reference_template: Option<PathBuf>,
    pub target_template: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            filter: DEFAULT_FILTER.to_string(),
            reference_ext: "ts".to_string(),
            target_ext: "ets".to_string(),
            ts_node: split_prefix(DEFAULT_TS_NODE),
            node_version: Some(DEFAULT_NODE_VERSION.to_string()),
            panda: None,
            reference_template: None,
            target_template: None,
        }
    }
}

impl Settings {
    /// Defaults overlaid with a (merged) configuration file
    pub fn from_project(config: &ProjectConfig) -> Self {
        let mut settings = Self::default();

        if let Some(generator) = &config.generator {
            if let Some(size) = generator.chunk_size {
                settings.chunk_size = size;
            }
            if let Some(workers) = generator.workers {
                settings.workers = workers;
            }
            if let Some(filter) = &generator.filter {
                settings.filter = filter.clone();
            }
            if let Some(ext) = &generator.reference_ext {
                settings.reference_ext = ext.clone();
            }
            if let Some(ext) = &generator.target_ext {
                settings.target_ext = ext.clone();
            }
        }

        if let Some(toolchain) = &config.toolchain {
            if let Some(prefix) = &toolchain.ts_node {
                settings.ts_node = split_prefix(prefix);
            }
            if let Some(pattern) = &toolchain.node_version {
                settings.set_node_version(pattern);
            }
            if toolchain.panda.is_some() {
                settings.panda = toolchain.panda.clone();
            }
        }

        if let Some(templates) = &config.templates {
            settings.reference_template = templates.reference.clone();
            settings.target_template = templates.target.clone();
        }

        settings
    }

    /// Set the version pattern; an empty pattern disables the check
    pub fn set_node_version(&mut self, pattern: &str) {
        self.node_version = if pattern.is_empty() {
            None
        } else {
            Some(pattern.to_string())
        };
    }

    /// Whether target sources are compiled and executed
    pub fn verify(&self) -> bool {
        self.panda.is_some()
    }

    /// Check the final values, clamping the worker count to at least one
    pub fn validate(&mut self) -> ConfigResult<()> {
        if self.chunk_size == 0 {
            return Err(ConfigError::invalid(
                "chunk_size",
                "chunk size must be at least 1",
            ));
        }
        self.workers = self.workers.max(1);

        if self.ts_node.is_empty() {
            return Err(ConfigError::invalid("ts_node", "prefix cannot be empty"));
        }

        Regex::new(&self.filter)
            .map_err(|e| ConfigError::invalid("filter", format!("invalid regex: {}", e)))?;
        if let Some(pattern) = &self.node_version {
            Regex::new(pattern).map_err(|e| {
                ConfigError::invalid("node_version", format!("invalid regex: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Split a colon-separated command prefix, dropping empty parts
pub fn split_prefix(prefix: &str) -> Vec<String> {
    prefix
        .split(':')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{GeneratorConfig, ToolchainConfig};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("npx:ts-node", vec!["npx", "ts-node"])]
    #[case("node_modules/.bin/ts-node", vec!["node_modules/.bin/ts-node"])]
    #[case("a::b:", vec!["a", "b"])]
    #[case("", vec![])]
    fn test_split_prefix(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_prefix(input), expected);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.chunk_size, 200);
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.ts_node, vec!["npx", "ts-node"]);
        assert_eq!(settings.filter, ".*");
        assert!(!settings.verify());
    }

    #[test]
    fn test_from_project_overlays_defaults() {
        let config = ProjectConfig {
            generator: Some(GeneratorConfig {
                workers: Some(3),
                ..Default::default()
            }),
            toolchain: Some(ToolchainConfig {
                node_version: Some(String::new()),
                panda: Some(PathBuf::from("/opt/panda")),
                ..Default::default()
            }),
            templates: None,
        };
        let settings = Settings::from_project(&config);
        assert_eq!(settings.workers, 3);
        assert_eq!(settings.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(settings.node_version, None);
        assert!(settings.verify());
    }

    #[test]
    fn test_validate_clamps_workers() {
        let mut settings = Settings {
            workers: 0,
            ..Default::default()
        };
        settings.validate().unwrap();
        assert_eq!(settings.workers, 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut zero = Settings {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let mut bad_filter = Settings {
            filter: "(".to_string(),
            ..Default::default()
        };
        match bad_filter.validate().unwrap_err() {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "filter"),
            other => panic!("unexpected error: {other}"),
        }

        let mut no_prefix = Settings {
            ts_node: Vec::new(),
            ..Default::default()
        };
        assert!(no_prefix.validate().is_err());
    }
}
