//! Unified error types for hooksmith with fail-open philosophy.
//!
//! Hooks observe the assistant's work; they must never block it. Only
//! malformed primary input is a blocking error. Everything else is an
//! operational failure that is reported and mapped to the non-blocking
//! exit code.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for hooksmith operations.
#[derive(Error, Debug)]
pub enum HookError {
    /// The primary input (stdin JSON, hook arguments) could not be used.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// I/O errors from log, handoff or sidecar files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON, YAML or TOML serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Handoff bookkeeping errors.
    #[error("handoff error: {message}")]
    Handoff { message: String },
}

/// A specialized Result type for hooksmith operations.
pub type Result<T> = std::result::Result<T, HookError>;

impl HookError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a handoff error.
    pub fn handoff(message: impl Into<String>) -> Self {
        Self::Handoff {
            message: message.into(),
        }
    }

    /// Whether this error should block the caller.
    ///
    /// Only unusable primary input blocks.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    /// Exit code to report for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_blocking() {
            exit_codes::BLOCKING
        } else {
            exit_codes::NON_BLOCKING
        }
    }
}

impl From<io::Error> for HookError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for HookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for HookError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and carry on with a safe value.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }
}

/// Exit codes for hooksmith.
///
/// The assistant treats 0 as success, 1 as a blocking failure and 2 as a
/// non-blocking failure that is surfaced but does not halt the operation.
pub mod exit_codes {
    /// Everything went fine.
    pub const SUCCESS: i32 = 0;

    /// Malformed primary input, or a quality gate that failed.
    pub const BLOCKING: i32 = 1;

    /// Operational failure (filesystem, configuration, panic). Never blocks.
    pub const NON_BLOCKING: i32 = 2;
}
