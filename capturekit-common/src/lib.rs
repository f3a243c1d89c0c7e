//! # CaptureKit Common
//!
//! Foundational pieces shared by every CaptureKit crate:
//!
//! - [`error`] - severity classification for domain error types
//! - [`logging`] - helpers for rendering structured context in diagnostics

pub mod error;
pub mod logging;

pub use error::{ErrorSeverity, Severity};
pub use logging::Pretty;
