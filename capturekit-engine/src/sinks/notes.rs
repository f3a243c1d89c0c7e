//! Document sink: one markdown line per note target
//!
//! A target is a file path, or a folder in which the note is named after the
//! category (`<icon> <name>.md`). Lines are appended at the bottom, or placed
//! under a header at the top of the note. Every target is handled on its own;
//! a failure skips that target only.

use super::{NoteOutcome, Placement};
use crate::{
    capture::SelectedCategory,
    context::keys,
    paths::{ensure_folder, normalize_file_or_folder},
    resolver::Resolver,
    storage::{FileHandle, Storage},
    CaptureError, ResolveError, StorageError,
};
use capturekit_config::NoteTarget;
use serde_json::Value;
use tracing::{debug, error, info, warn};

const DEFAULT_SEPARATOR: &str = " - ";
const TODO_MARKER: &str = "- [ ] ";

/// Writes the joined writeable fields into every note of a category
pub struct DocumentSink<'a> {
    storage: &'a dyn Storage,
    resolver: &'a Resolver,
}

/// Why a single target was not written
enum TargetError {
    /// The target fails validation
    Rejected { path: Option<String>, reason: String },
    Failed(CaptureError),
}

impl From<CaptureError> for TargetError {
    fn from(error: CaptureError) -> Self {
        TargetError::Failed(error)
    }
}

impl From<ResolveError> for TargetError {
    fn from(error: ResolveError) -> Self {
        TargetError::Failed(error.into())
    }
}

impl From<StorageError> for TargetError {
    fn from(error: StorageError) -> Self {
        TargetError::Failed(error.into())
    }
}

fn rejected(path: Option<String>, reason: &str) -> TargetError {
    TargetError::Rejected {
        path,
        reason: reason.to_string(),
    }
}

/// A target that passed validation
struct PreparedTarget {
    path: String,
    placement: Placement,
    header: String,
}

impl<'a> DocumentSink<'a> {
    pub fn new(storage: &'a dyn Storage, resolver: &'a Resolver) -> Self {
        Self { storage, resolver }
    }

    /// Write to every note target of the selected category, in order
    pub async fn write_all(
        &self,
        selected: &SelectedCategory,
        writeable_fields: &[String],
    ) -> Vec<NoteOutcome> {
        let Some(targets) = selected.category.notes.as_deref() else {
            warn!(category = %selected.key, "Missing notes section for category");
            return Vec::new();
        };
        info!(category = %selected.key, targets = targets.len(), "Writing to notes");

        let mut outcomes = Vec::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            let outcome = match self.write_one(selected, target, writeable_fields).await {
                Ok(outcome) => outcome,
                Err(TargetError::Rejected { path, reason }) => skipped(index, path, reason),
                Err(TargetError::Failed(e)) => {
                    error!(index, path = ?target.path, error = %e, "Failed to write note");
                    skipped(index, target.path.clone(), e.to_string())
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn write_one(
        &self,
        selected: &SelectedCategory,
        target: &NoteTarget,
        writeable_fields: &[String],
    ) -> Result<NoteOutcome, TargetError> {
        let PreparedTarget {
            path,
            placement,
            header,
        } = self.prepare(selected, target)?;

        let (file, created) = match self.storage.exists(&path).await? {
            Some(file) => (file, false),
            None => {
                debug!(path = %path, "Note not found; creating it");
                ensure_folder(self.storage, &path).await?;
                (self.storage.create(&path, "").await?, true)
            }
        };

        let line = self.line(target, writeable_fields)?;
        self.place(&file, placement, &header, &line).await?;
        info!(path = %path, ?placement, "Capture added to note");

        Ok(NoteOutcome::Written {
            path,
            created,
            placement,
        })
    }

    /// Resolve the path and check placement and header before anything is
    /// created
    fn prepare(
        &self,
        selected: &SelectedCategory,
        target: &NoteTarget,
    ) -> Result<PreparedTarget, TargetError> {
        let raw_path = target.path.clone().unwrap_or_default();
        let resolved = self.resolver.resolve(&raw_path)?;
        let Some(mut path) = normalize_file_or_folder(&resolved) else {
            error!(path = %raw_path, "Missing or invalid path for note");
            return Err(rejected(target.path.clone(), "invalid note path"));
        };
        if path.ends_with('/') {
            let icon = self.resolver.resolve(&selected.icon)?;
            let name = self.resolver.resolve(&selected.name)?;
            if !icon.is_empty() {
                path.push_str(&icon);
                path.push(' ');
            }
            path.push_str(&name);
            path.push_str(".md");
        }

        let placement = match target.top_or_bottom.as_deref() {
            Some("top") => Placement::Top,
            Some("bottom") => Placement::Bottom,
            other => {
                error!(top_or_bottom = ?other, path = %path, "Invalid topOrBottom value for note");
                return Err(rejected(Some(path), "invalid topOrBottom value"));
            }
        };

        let header = match (&target.header, placement) {
            (Some(Value::String(header)), _) => self.resolver.resolve(header)?,
            (_, Placement::Bottom) => String::new(),
            (header, Placement::Top) => {
                error!(?header, path = %path, "Required header not found for top-appended note");
                return Err(rejected(Some(path), "missing header for top placement"));
            }
        };

        Ok(PreparedTarget {
            path,
            placement,
            header,
        })
    }

    /// `[todo marker][date][ time]<separator><fields joined by separator>`
    fn line(&self, target: &NoteTarget, writeable_fields: &[String]) -> Result<String, CaptureError> {
        let separator = match &target.separator {
            Some(Value::String(separator)) => format!(" {separator} "),
            _ => DEFAULT_SEPARATOR.to_string(),
        };
        let registry = self.resolver.registry();

        let mut stamp = Vec::new();
        if self.resolver.flag(target.write_date.as_ref())? != Some(false) {
            let date = registry.get_text(keys::DATE).unwrap_or_default();
            if self.resolver.is_set(target.link_date.as_ref())? {
                stamp.push(format!("[[{date}]]"));
            } else {
                stamp.push(date);
            }
        }
        if self.resolver.flag(target.write_time.as_ref())? != Some(false) {
            stamp.push(registry.get_text(keys::TIME).unwrap_or_default());
        }

        let mut line = String::new();
        if self.resolver.is_set(target.as_todo.as_ref())? {
            line.push_str(TODO_MARKER);
        }
        if !stamp.is_empty() {
            line.push_str(&stamp.join(" "));
            line.push_str(&separator);
        }
        line.push_str(&writeable_fields.join(&separator));
        Ok(line)
    }

    async fn place(
        &self,
        file: &FileHandle,
        placement: Placement,
        header: &str,
        line: &str,
    ) -> Result<(), CaptureError> {
        let content = self.storage.read(file).await?;
        let updated = match placement {
            Placement::Top => {
                let anchor = format!("\n{header}\n\n");
                let rest = content.replacen(&anchor, "", 1);
                format!("{anchor}{line}\n{rest}")
            }
            Placement::Bottom => format!("{content}\n{line}"),
        };
        self.storage.write(file, &updated).await?;
        Ok(())
    }
}

fn skipped(index: usize, path: Option<String>, reason: String) -> NoteOutcome {
    debug!(index, ?path, %reason, "Skipping note");
    NoteOutcome::Skipped {
        index,
        path,
        reason,
    }
}
