//! Error types for the CaptureKit configuration crate

use capturekit_common::{ErrorSeverity, Severity};
use thiserror::Error;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings could not be extracted from the layered sources
    #[error("Failed to load settings: {source}")]
    Settings {
        #[source]
        source: Box<figment::Error>,
    },

    /// The capture document is JSON but does not have the expected shape
    #[error("Invalid capture configuration: {source}")]
    Shape {
        #[source]
        source: serde_json::Error,
    },

    /// No usable capture document at the configured path
    #[error("No capture configuration at '{path}'")]
    NotConfigured { path: String },

    /// The capture document has no categories section
    #[error("Missing categories section in capture configuration")]
    MissingCategories,

    /// The categories section exists but is empty
    #[error("Category list is empty in capture configuration")]
    EmptyCategories,

    /// A path in the configuration could not be used
    #[error("Invalid path for {what}: '{path}'")]
    InvalidPath { what: String, path: String },

    /// Backup path would overwrite the configuration itself
    #[error("Backup path for '{path}' collides with the configuration path")]
    BackupCollision { path: String },
}

impl ConfigError {
    /// Create an invalid-path error
    pub fn invalid_path(what: impl Into<String>, path: impl Into<String>) -> Self {
        Self::InvalidPath {
            what: what.into(),
            path: path.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::Settings {
            source: Box::new(error),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Shape { source: error }
    }
}

impl Severity for ConfigError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ConfigError::Settings { .. }
            | ConfigError::Shape { .. }
            | ConfigError::NotConfigured { .. }
            | ConfigError::MissingCategories
            | ConfigError::EmptyCategories
            | ConfigError::InvalidPath { .. }
            | ConfigError::BackupCollision { .. } => ErrorSeverity::Error,
        }
    }
}
