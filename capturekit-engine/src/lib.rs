//! CaptureKit capture engine
//!
//! Prompts the user through the fields of a configured category and writes
//! the answers to a CSV file and to markdown notes.
//!
//! The engine talks to the outside world through two traits:
//! - [`PromptProvider`] asks the questions ([`ScriptedPrompts`] for tests and
//!   non-interactive runs)
//! - [`Storage`] reads and writes files ([`FsStorage`], [`MemoryStorage`])
//!
//! Configuration strings may reference variables as `var(name)` and embed
//! simple expressions such as `date.now('HH:mm')`; see [`Resolver`].
//!
//! ```no_run
//! use capturekit_config::CaptureSettings;
//! use capturekit_engine::{CaptureSession, FsStorage, ScriptedPrompts, SessionReport};
//! use std::sync::Arc;
//!
//! # async fn run() -> capturekit_engine::Result<()> {
//! let prompts = Arc::new(ScriptedPrompts::new(vec!["Exercise", "Ran 5k"]));
//! let storage = Arc::new(FsStorage::new("."));
//! let session = CaptureSession::new(CaptureSettings::default(), prompts, storage);
//! if let SessionReport::Completed { writeable_line, .. } = session.run().await? {
//!     println!("{writeable_line}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod capture;
pub mod context;
pub mod dates;
pub mod error;
pub mod expression;
pub mod field;
pub mod format;
pub mod paths;
pub mod prompt;
pub mod resolver;
pub mod session;
pub mod sinks;
pub mod storage;

pub use bootstrap::{LoadOutcome, SortReport};
pub use capture::{CaptureState, FieldCapture, SelectedCategory};
pub use context::VariableRegistry;
pub use dates::{Clock, FixedClock, SystemClock};
pub use error::{CaptureError, ExpressionError, ResolveError, Result, StorageError};
pub use expression::{BuiltinEvaluator, ExpressionEvaluator, NoExpressions};
pub use prompt::{AskedPrompt, PromptProvider, ScriptedPrompts};
pub use resolver::Resolver;
pub use session::{CaptureSession, SessionReport};
pub use sinks::{NoteOutcome, Placement, SinkOutcome};
pub use storage::{FileHandle, FsStorage, MemoryStorage, Storage};
