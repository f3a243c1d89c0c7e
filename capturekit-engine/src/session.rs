//! Capture orchestrator
//!
//! A session loads the capture document, seeds the variable registry, stamps
//! the date and time, drives the field capture and finally hands the result
//! to the tabular and document sinks. An `Err` from [`CaptureSession::run`]
//! means nothing was written to any sink.

use crate::{
    bootstrap::{load_config, LoadOutcome},
    capture::{CaptureState, FieldCapture},
    context::{keys, VariableRegistry},
    dates::{format_moment, Clock, SystemClock},
    expression::{BuiltinEvaluator, ExpressionEvaluator},
    prompt::PromptProvider,
    resolver::Resolver,
    sinks::{DocumentSink, NoteOutcome, SinkOutcome, TabularSink},
    storage::Storage,
    CaptureError,
};
use capturekit_config::{
    settings::{DEFAULT_DATE_FORMAT, DEFAULT_TIME_FORMAT},
    CaptureConfig, CaptureSettings, ConfigError,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Field pairs column holding the session date
pub const DATE_COLUMN: &str = "Date";
/// Field pairs column holding the session time
pub const TIME_COLUMN: &str = "Time";

/// How a session ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionReport {
    /// There was no usable capture document
    NotConfigured { path: String, sample_created: bool },
    /// Variables were seeded but capture was skipped by the settings
    Skipped,
    Completed {
        category: String,
        field_pairs: IndexMap<String, Value>,
        writeable_fields: Vec<String>,
        writeable_line: String,
        tabular: SinkOutcome,
        notes: Vec<NoteOutcome>,
    },
}

/// One capture run against a storage root
pub struct CaptureSession {
    settings: CaptureSettings,
    prompts: Arc<dyn PromptProvider>,
    storage: Arc<dyn Storage>,
    registry: VariableRegistry,
    clock: Arc<dyn Clock>,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("settings", &self.settings)
            .field("variables", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl CaptureSession {
    pub fn new(
        settings: CaptureSettings,
        prompts: Arc<dyn PromptProvider>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            settings,
            prompts,
            storage,
            registry: VariableRegistry::new(),
            clock: Arc::new(SystemClock),
            evaluator: None,
        }
    }

    /// Share the host's variables. Values already present win over the
    /// document's `variables`, and everything the session sets is visible
    /// through `registry` as soon as it is set.
    pub fn with_registry(mut self, registry: VariableRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the built-in expression grammar
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    fn resolver(&self) -> Resolver {
        let evaluator = self
            .evaluator
            .clone()
            .unwrap_or_else(|| Arc::new(BuiltinEvaluator::new(self.clock.clone())));
        Resolver::new(self.registry.clone(), evaluator)
            .with_max_steps(self.settings.max_resolution_steps)
    }

    /// Run the session to completion
    pub async fn run(&self) -> Result<SessionReport, CaptureError> {
        info!("Starting capture");
        let resolver = self.resolver();
        let storage = self.storage.as_ref();
        let prompts = self.prompts.as_ref();

        let (mut config, path) =
            match load_config(&self.settings, &resolver, storage, prompts).await? {
                LoadOutcome::Loaded { config, path } => (config, path),
                LoadOutcome::SampleCreated { path } => {
                    info!(path = %path, "Sample configuration created; stopping");
                    return Ok(SessionReport::NotConfigured {
                        path,
                        sample_created: true,
                    });
                }
                LoadOutcome::NotConfigured { path } => {
                    info!(path = %path, "No configuration; stopping");
                    return Ok(SessionReport::NotConfigured {
                        path,
                        sample_created: false,
                    });
                }
            };

        self.seed_variables(&config)?;
        info!(path = %path, "Loaded settings from config");

        if self.settings.skip_capture {
            info!("Skipping capture");
            return Ok(SessionReport::Skipped);
        }

        let mut state = CaptureState::from_registry(&self.registry);
        self.stamp(&resolver, &mut state)?;

        let capture = FieldCapture::new(prompts, storage, &resolver)
            .strict_yes_no(self.settings.strict_yes_no);
        let selected = match capture.run(&mut config, &mut state).await {
            Ok(selected) => selected,
            Err(e) => {
                error!(error = %e, "User prompt failed");
                info!("Stopping");
                return Err(e);
            }
        };

        let separator = resolver.resolve(&self.settings.exported_separator)?;
        let separator = if separator.is_empty() {
            separator
        } else {
            format!(" {separator} ")
        };
        let writeable_line = state.writeable_fields.join(&separator);
        self.registry.set(keys::WRITEABLE_LINE, writeable_line.clone());

        let tabular = TabularSink::new(storage, &resolver)
            .append(&selected.category, &state.field_pairs)
            .await;
        let notes = DocumentSink::new(storage, &resolver)
            .write_all(&selected, &state.writeable_fields)
            .await;
        info!("Stopping");

        Ok(SessionReport::Completed {
            category: selected.key,
            field_pairs: state.field_pairs,
            writeable_fields: state.writeable_fields,
            writeable_line,
            tabular,
            notes,
        })
    }

    /// Document variables fill the gaps left by the host, then `config`
    /// holds the whole document
    fn seed_variables(&self, config: &CaptureConfig) -> Result<(), CaptureError> {
        for (key, value) in &config.variables {
            if !self.registry.set_if_absent(key.clone(), value.clone()) {
                debug!(variable = %key, "Keeping host value over config variable");
            }
        }
        let document = serde_json::to_value(config).map_err(ConfigError::from)?;
        self.registry.set(keys::CONFIG, document);
        Ok(())
    }

    /// Stamp `date` and `time` into the registry and the field pairs
    fn stamp(&self, resolver: &Resolver, state: &mut CaptureState) -> Result<(), CaptureError> {
        let now = self.clock.now();
        let date_format = non_empty(resolver.resolve(&self.settings.date_format)?, DEFAULT_DATE_FORMAT);
        let time_format = non_empty(resolver.resolve(&self.settings.time_format)?, DEFAULT_TIME_FORMAT);

        let date = format_moment(&now, &date_format);
        let time = format_moment(&now, &time_format);
        debug!(%date, %time, "Stamped session");

        self.registry.set(keys::DATE, date.clone());
        self.registry.set(keys::TIME, time.clone());
        state
            .field_pairs
            .insert(DATE_COLUMN.to_string(), Value::String(date));
        state
            .field_pairs
            .insert(TIME_COLUMN.to_string(), Value::String(time));
        state.sync(&self.registry);
        Ok(())
    }
}

fn non_empty(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dates::FixedClock, prompt::ScriptedPrompts, storage::MemoryStorage};
    use serde_json::json;

    fn session(document: Value, answers: Vec<Value>) -> (CaptureSession, MemoryStorage) {
        let storage = MemoryStorage::new().with_file("capture/config.json", document.to_string());
        let clock = FixedClock::parse("2024-03-09T07:05:03+00:00").unwrap();
        let session = CaptureSession::new(
            CaptureSettings::default(),
            Arc::new(ScriptedPrompts::new(answers)),
            Arc::new(storage.clone()),
        )
        .with_clock(Arc::new(clock));
        (session, storage)
    }

    #[tokio::test]
    async fn test_host_variables_win() {
        let (session, _) = session(
            json!({"variables": {"who": "config", "mood": "ok"}, "categories": {}}),
            Vec::new(),
        );
        session.registry().set("who", "host");
        let mut settings = CaptureSettings::default();
        settings.skip_capture = true;
        let session = CaptureSession {
            settings,
            ..session
        };

        assert_eq!(session.run().await.unwrap(), SessionReport::Skipped);
        let registry = session.registry();
        assert_eq!(registry.get_text("who").as_deref(), Some("host"));
        assert_eq!(registry.get_text("mood").as_deref(), Some("ok"));
        assert!(registry.get("config").is_some());
        assert!(registry.get("date").is_none(), "skip stops before stamping");
    }

    #[tokio::test]
    async fn test_stamps_lead_field_pairs() {
        let (session, _) = session(
            json!({"categories": {"Mood": {"fields": [{"name": "Score", "prompt": "inputPrompt"}]}}}),
            vec![json!("Mood"), json!("7"), json!("")],
        );

        let SessionReport::Completed {
            field_pairs,
            writeable_line,
            tabular,
            notes,
            ..
        } = session.run().await.unwrap()
        else {
            panic!("expected a completed session");
        };

        let keys: Vec<&String> = field_pairs.keys().collect();
        assert_eq!(keys, vec!["Date", "Time", "Score", "Comment"]);
        assert_eq!(field_pairs["Date"], json!("2024-03-09"));
        assert_eq!(field_pairs["Time"], json!("07:05:03"));
        assert_eq!(writeable_line, "");
        assert!(matches!(tabular, SinkOutcome::Skipped { .. }));
        assert!(notes.is_empty());
        assert_eq!(session.registry().get_text("writeableLine").as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_date_format_from_variables() {
        let (session, _) = session(
            json!({"variables": {"stampFormat": "DD.MM.YYYY"}, "categories": {"Mood": {"disableCommentField": true}}}),
            vec![json!("Mood")],
        );
        let session = CaptureSession {
            settings: CaptureSettings {
                date_format: "var(stampFormat)".into(),
                time_format: "var(unset)".into(),
                ..Default::default()
            },
            ..session
        };

        session.run().await.unwrap();
        assert_eq!(session.registry().get_text("date").as_deref(), Some("09.03.2024"));
        assert_eq!(session.registry().get_text("time").as_deref(), Some("07:05:03"));
    }
}
