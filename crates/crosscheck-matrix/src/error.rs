/// Generator error types
use crate::supplier::SupplierError;
use std::path::PathBuf;
use thiserror::Error;

pub type GenResult<T> = Result<T, GenError>;

/// Broad classification used to pick a process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed specification or options; nothing was run
    Configuration,
    /// Required toolchain missing or unusable; nothing was run
    Environment,
    /// Failure while rendering or executing a chunk
    Execution,
}

#[derive(Debug, Error)]
pub enum GenError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse specification {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Node {path} declares both 'method' and 'expr'")]
    AmbiguousLeaf { path: String },

    #[error("Node {path} has invalid 'mandatory' value {value} (expected -1 or a non-negative count)")]
    InvalidMandatory { path: String, value: i64 },

    #[error("Node {path} has non-scalar value for variable '{var}'")]
    InvalidVar { path: String, var: String },

    #[error("Failed to expand '{name}' at {path}: {source}")]
    Supplier {
        name: String,
        path: String,
        #[source]
        source: SupplierError,
    },

    #[error("Invalid name filter '{pattern}': {error}")]
    InvalidFilter { pattern: String, error: String },

    #[error("Environment check failed: {0}")]
    Environment(String),

    #[error("Template error: {0}")]
    Render(String),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("Failed to run '{command}': {error}")]
    Spawn { command: String, error: String },
}

impl GenError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a specification parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create an environment precondition error
    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment(message.into())
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. }
            | Self::AmbiguousLeaf { .. }
            | Self::InvalidMandatory { .. }
            | Self::InvalidVar { .. }
            | Self::Supplier { .. }
            | Self::InvalidFilter { .. } => ErrorKind::Configuration,
            Self::Environment(_) | Self::ThreadPool(_) => ErrorKind::Environment,
            Self::Io { .. } | Self::Render(_) | Self::Spawn { .. } => ErrorKind::Execution,
        }
    }
}

impl From<minijinja::Error> for GenError {
    fn from(error: minijinja::Error) -> Self {
        Self::Render(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = GenError::AmbiguousLeaf {
            path: "a.yaml:/sub[0]".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(
            GenError::environment("node missing").kind(),
            ErrorKind::Environment
        );
        assert_eq!(GenError::Render("x".into()).kind(), ErrorKind::Execution);
    }

    #[test]
    fn test_messages_carry_path() {
        let err = GenError::InvalidMandatory {
            path: "spec.yaml:/sub[1]".to_string(),
            value: -3,
        };
        let msg = err.to_string();
        assert!(msg.contains("spec.yaml:/sub[1]"));
        assert!(msg.contains("-3"));
    }
}
