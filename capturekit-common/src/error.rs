//! Severity classification shared by all CaptureKit error types
//!
//! Each crate owns its own error enum. Implementing [`Severity`] lets callers
//! (the CLI in particular) pick log levels and exit codes without matching on
//! every variant of every crate.

/// Severity levels for error classification
///
/// - **Warning**: something looked wrong but the capture can proceed.
/// - **Error**: the current operation failed; the rest of the session may
///   still run (a sink target is skipped, a session aborts cleanly).
/// - **Critical**: the environment is broken (storage unusable) and nothing
///   further should be attempted.
///
/// # Examples
///
/// ```rust
/// use capturekit_common::ErrorSeverity;
///
/// let skipped_target = ErrorSeverity::Error;
/// assert!(skipped_target < ErrorSeverity::Critical);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Potential issue but operation can proceed
    Warning,

    /// Operation failed but the session can continue or end cleanly
    Error,

    /// Nothing further should be attempted
    Critical,
}

impl ErrorSeverity {
    /// Short lowercase label used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            ErrorSeverity::Warning => "warning",
            ErrorSeverity::Error => "error",
            ErrorSeverity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Trait for error types that have severity levels
///
/// # Example
///
/// ```rust
/// use capturekit_common::{ErrorSeverity, Severity};
///
/// #[derive(Debug)]
/// enum SinkError {
///     Unwritable,
///     HeaderMismatch,
/// }
///
/// impl Severity for SinkError {
///     fn severity(&self) -> ErrorSeverity {
///         match self {
///             SinkError::Unwritable => ErrorSeverity::Critical,
///             SinkError::HeaderMismatch => ErrorSeverity::Warning,
///         }
///     }
/// }
///
/// assert_eq!(SinkError::Unwritable.severity(), ErrorSeverity::Critical);
/// ```
pub trait Severity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;

    /// Whether this error should stop the whole capture session
    fn is_fatal(&self) -> bool {
        self.severity() >= ErrorSeverity::Error
    }
}
