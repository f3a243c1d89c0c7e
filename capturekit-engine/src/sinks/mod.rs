//! Output sinks for a completed capture
//!
//! Sinks never abort a session: by the time they run every prompt has been
//! answered, so failures are logged and reported as outcomes instead.

pub mod csv;
pub mod notes;

pub use csv::TabularSink;
pub use notes::DocumentSink;

use serde::Serialize;

/// Result of the tabular sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SinkOutcome {
    /// A row was appended; `created` when the file (with its header) is new
    Written { path: String, created: bool },
    /// The category has no tabular output configured
    Skipped { reason: String },
    Failed { path: String, reason: String },
}

impl SinkOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, SinkOutcome::Written { .. })
    }
}

/// Where a line went in a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Below the header anchor
    Top,
    Bottom,
}

/// Result of one note target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NoteOutcome {
    Written {
        path: String,
        created: bool,
        placement: Placement,
    },
    Skipped {
        /// Position of the target in the category's `notes` list
        index: usize,
        path: Option<String>,
        reason: String,
    },
}

impl NoteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, NoteOutcome::Written { .. })
    }
}
