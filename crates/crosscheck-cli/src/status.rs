//! Process exit statuses

use crosscheck_config::ConfigError;
use crosscheck_matrix::{ErrorKind, GenError};
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Every chunk passed (or was generated)
    Ok = 0,
    /// At least one chunk failed
    TestsFailed = 1,
    /// Bad flags, configuration or templates
    InvalidOptions = 2,
    /// Toolchain or filesystem not usable
    Environment = 3,
    /// Malformed specification document
    InvalidSpec = 4,
}

impl Status {
    /// Pick the status for an error that aborted the run
    pub fn from_error(err: &anyhow::Error) -> Self {
        if err.downcast_ref::<ConfigError>().is_some() {
            return Self::InvalidOptions;
        }
        if let Some(gen) = err.downcast_ref::<GenError>() {
            return match gen {
                GenError::InvalidFilter { .. } | GenError::Render(_) => Self::InvalidOptions,
                _ => match gen.kind() {
                    ErrorKind::Configuration => Self::InvalidSpec,
                    ErrorKind::Environment | ErrorKind::Execution => Self::Environment,
                },
            };
        }
        if err.downcast_ref::<std::io::Error>().is_some() {
            return Self::Environment;
        }
        Self::InvalidOptions
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        ExitCode::from(status as u8)
    }
}
