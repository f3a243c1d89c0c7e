//! Error types for the capture engine

use capturekit_common::{ErrorSeverity, Severity};
use capturekit_config::ConfigError;
use thiserror::Error;

/// Result type alias for capture sessions
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Storage provider failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Path escapes the storage root: {0}")]
    OutsideRoot(String),

    #[error("Failed to create '{0}'")]
    CreateFailed(String),
}

impl StorageError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Severity for StorageError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Critical
    }
}

/// Expression evaluation failures. The offending text is left as written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("Syntax error in '{expression}': {message}")]
    Syntax { expression: String, message: String },

    #[error("Unknown method '{method}' on {target}")]
    UnknownMethod { method: String, target: String },

    #[error("Invalid argument for '{function}': {message}")]
    InvalidArgument { function: String, message: String },

    #[error("Result of '{function}' exceeds {limit} bytes")]
    TooLong { function: String, limit: usize },
}

impl ExpressionError {
    pub fn syntax(expression: &str, message: impl Into<String>) -> Self {
        Self::Syntax {
            expression: expression.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(function: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

impl Severity for ExpressionError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }
}

/// Variable resolution failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// More substitutions than allowed, usually a self-referencing variable
    #[error("Resolution of '{input}' did not finish within {limit} substitutions")]
    StepLimitExceeded { input: String, limit: usize },
}

impl Severity for ResolveError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }
}

/// Reasons a capture session stops before writing to any sink
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("No category selected")]
    NoCategorySelected,

    #[error("Field #{index} of category '{category}' has no name")]
    MissingFieldName { category: String, index: usize },

    #[error("Missing, incorrect, or unsupported prompt type '{prompt}' for field '{field}'")]
    UnsupportedPrompt { field: String, prompt: String },

    #[error("No input received for required field '{field}'")]
    RequiredFieldBlank { field: String },

    #[error("List for required field '{field}' is unavailable at '{path}'")]
    ListUnavailable { field: String, path: String },
}

impl CaptureError {
    /// True when the session was abandoned by the user or by a problem in
    /// the capture document found mid-capture, as opposed to a fault
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            CaptureError::NoCategorySelected
                | CaptureError::MissingFieldName { .. }
                | CaptureError::UnsupportedPrompt { .. }
                | CaptureError::RequiredFieldBlank { .. }
                | CaptureError::ListUnavailable { .. }
                | CaptureError::Config(ConfigError::MissingCategories)
                | CaptureError::Config(ConfigError::EmptyCategories)
        )
    }
}

impl Severity for CaptureError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            CaptureError::Config(e) => e.severity(),
            CaptureError::Resolve(e) => e.severity(),
            CaptureError::Storage(e) => e.severity(),
            CaptureError::NoCategorySelected
            | CaptureError::MissingFieldName { .. }
            | CaptureError::UnsupportedPrompt { .. }
            | CaptureError::RequiredFieldBlank { .. }
            | CaptureError::ListUnavailable { .. } => ErrorSeverity::Error,
        }
    }
}
