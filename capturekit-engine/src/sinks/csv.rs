//! Tabular sink: one CSV row per capture

use super::SinkOutcome;
use crate::{
    format::encode_cell,
    paths::{ensure_folder, normalize, PathMode},
    resolver::Resolver,
    storage::Storage,
    CaptureError,
};
use capturekit_common::Pretty;
use capturekit_config::Category;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Appends field pairs to the category's `csvPath`
pub struct TabularSink<'a> {
    storage: &'a dyn Storage,
    resolver: &'a Resolver,
}

impl<'a> TabularSink<'a> {
    pub fn new(storage: &'a dyn Storage, resolver: &'a Resolver) -> Self {
        Self { storage, resolver }
    }

    /// Append one row built from the current field pairs. The file is
    /// created with a header row of the field pair keys when missing.
    pub async fn append(
        &self,
        category: &Category,
        field_pairs: &IndexMap<String, Value>,
    ) -> SinkOutcome {
        let Some(raw_path) = category.csv_path.as_deref() else {
            debug!("No CSV path configured for category");
            return SinkOutcome::Skipped {
                reason: "no csvPath configured".to_string(),
            };
        };

        match self.try_append(raw_path, field_pairs).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(path = raw_path, error = %e, "Failed to export capture to CSV");
                SinkOutcome::Failed {
                    path: raw_path.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_append(
        &self,
        raw_path: &str,
        field_pairs: &IndexMap<String, Value>,
    ) -> Result<SinkOutcome, CaptureError> {
        let resolved = self.resolver.resolve(raw_path)?;
        if resolved.trim().is_empty() {
            info!(path = raw_path, "Skipping CSV export");
            return Ok(SinkOutcome::Skipped {
                reason: "csvPath resolved to nothing".to_string(),
            });
        }
        let Some(path) = normalize(&resolved, PathMode::File) else {
            error!(path = %resolved, "Missing or invalid path for CSV file");
            return Ok(SinkOutcome::Failed {
                path: resolved,
                reason: "invalid file path".to_string(),
            });
        };
        info!(path = %path, "Exporting to CSV");

        let header = field_pairs
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let (file, created) = match self.storage.exists(&path).await? {
            Some(file) => (file, false),
            None => {
                debug!(path = %path, "CSV file not found; trying to create");
                ensure_folder(self.storage, &path).await?;
                let file = self.storage.create(&path, &format!("{header}\n")).await?;
                debug!(path = %path, "CSV file created");
                (file, true)
            }
        };

        let mut content = self.storage.read(&file).await?;
        let existing_header = content.lines().next().unwrap_or_default();
        if !existing_header.is_empty() && existing_header != header {
            warn!(
                path = %path,
                expected = %header,
                found = existing_header,
                "CSV header does not match the captured fields"
            );
        }

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        let row = field_pairs
            .values()
            .map(encode_cell)
            .collect::<Vec<_>>()
            .join(",");
        content.push_str(&row);
        content.push('\n');
        self.storage.write(&file, &content).await?;

        info!(path = %path, "Capture added to CSV{}", Pretty(field_pairs));
        Ok(SinkOutcome::Written { path, created })
    }
}
