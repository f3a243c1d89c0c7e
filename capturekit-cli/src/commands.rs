//! Command handlers. Each returns the process exit code.

use crate::{cli::CaptureArgs, prompts::TerminalPrompts};
use anyhow::{Context, Result};
use capturekit_common::Severity;
use capturekit_config::{CaptureConfig, CaptureSettings};
use capturekit_engine::{
    bootstrap, BuiltinEvaluator, CaptureError, CaptureSession, FsStorage, NoteOutcome,
    PromptProvider, Resolver, ScriptedPrompts, SessionReport, SinkOutcome, SystemClock,
    VariableRegistry,
};
use colored::Colorize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
/// The user cancelled, or the configuration broke down during capture
pub const EXIT_ABORTED: i32 = 2;

/// Everything a command needs
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub root: PathBuf,
    pub settings: CaptureSettings,
}

impl CommandContext {
    pub fn new(root: impl Into<PathBuf>, settings: CaptureSettings) -> Self {
        Self {
            root: root.into(),
            settings,
        }
    }

    fn storage(&self) -> Arc<FsStorage> {
        Arc::new(FsStorage::new(&self.root))
    }

    /// Configuration path resolved against an empty registry
    fn config_path(&self) -> Result<String, CaptureError> {
        let resolver = Resolver::new(
            VariableRegistry::new(),
            Arc::new(BuiltinEvaluator::new(Arc::new(SystemClock))),
        )
        .with_max_steps(self.settings.max_resolution_steps);
        bootstrap::config_path(&self.settings, &resolver)
    }
}

/// Report an engine error and pick the exit code
fn report_error(e: &CaptureError) -> i32 {
    if e.is_abort() {
        eprintln!("{} {}", "Capture aborted:".yellow().bold(), e);
        EXIT_ABORTED
    } else {
        error!(severity = %e.severity(), "{e}");
        eprintln!("{} {}", "Error:".red().bold(), e);
        EXIT_ERROR
    }
}

fn load_answers(path: &Path) -> Result<ScriptedPrompts> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answers from {}", path.display()))?;
    let answers: Vec<Value> = serde_json::from_str(&text)
        .with_context(|| format!("Answers in {} must be a JSON array", path.display()))?;
    debug!(count = answers.len(), "Loaded scripted answers");
    Ok(ScriptedPrompts::new(answers))
}

/// `capturekit capture`
pub async fn run_capture(ctx: &CommandContext, args: &CaptureArgs) -> Result<i32> {
    let prompts: Arc<dyn PromptProvider> = match &args.answers {
        Some(path) => Arc::new(load_answers(path)?),
        None => Arc::new(TerminalPrompts::new()),
    };

    let registry = VariableRegistry::new();
    for (key, value) in &args.vars {
        registry.set(key.clone(), value.clone());
    }

    let session = CaptureSession::new(ctx.settings.clone(), prompts, ctx.storage())
        .with_registry(registry.clone());
    let result = session.run().await;

    if args.print_vars {
        let variables = serde_json::to_string_pretty(&registry.snapshot())?;
        println!("{variables}");
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => return Ok(report_error(&e)),
    };

    match report {
        SessionReport::NotConfigured {
            path,
            sample_created: true,
        } => {
            println!("{} sample configuration written to {}", "✔".green(), path);
            println!("Edit it, then run capturekit again.");
        }
        SessionReport::NotConfigured { path, .. } => {
            println!("No capture configuration at {path}; nothing captured.");
        }
        SessionReport::Skipped => {
            debug!("Capture skipped");
        }
        SessionReport::Completed {
            category,
            writeable_line,
            tabular,
            notes,
            ..
        } => {
            println!("{} {}", "✔ Captured".green().bold(), category.bold());
            if !writeable_line.is_empty() {
                println!("  {writeable_line}");
            }
            print_tabular(&tabular);
            for note in &notes {
                print_note(note);
            }
        }
    }
    Ok(EXIT_OK)
}

fn print_tabular(outcome: &SinkOutcome) {
    match outcome {
        SinkOutcome::Written { path, created } => {
            let verb = if *created { "created" } else { "appended" };
            println!("  csv   {path} ({verb})");
        }
        SinkOutcome::Skipped { .. } => {}
        SinkOutcome::Failed { path, reason } => {
            println!("  csv   {} {}", path, format!("failed: {reason}").red());
        }
    }
}

fn print_note(outcome: &NoteOutcome) {
    match outcome {
        NoteOutcome::Written { path, .. } => println!("  note  {path}"),
        NoteOutcome::Skipped { index, path, reason } => {
            let target = path.clone().unwrap_or_else(|| format!("#{index}"));
            println!("  note  {} {}", target, format!("skipped: {reason}").yellow());
        }
    }
}

/// `capturekit init`
pub async fn run_init(ctx: &CommandContext, force: bool) -> Result<i32> {
    let path = match ctx.config_path() {
        Ok(path) => path,
        Err(e) => return Ok(report_error(&e)),
    };
    match bootstrap::write_sample(ctx.storage().as_ref(), &path, force).await {
        Ok(true) => {
            println!("{} sample configuration written to {}", "✔".green(), path);
            Ok(EXIT_OK)
        }
        Ok(false) => {
            eprintln!(
                "{} {} already exists; use --force to replace it",
                "Error:".red().bold(),
                path
            );
            Ok(EXIT_ERROR)
        }
        Err(e) => Ok(report_error(&e)),
    }
}

/// `capturekit sort`
pub async fn run_sort(ctx: &CommandContext) -> Result<i32> {
    let path = match ctx.config_path() {
        Ok(path) => path,
        Err(e) => return Ok(report_error(&e)),
    };
    match bootstrap::sort_config(ctx.storage().as_ref(), &path, ctx.settings.sort_ascending).await
    {
        Ok(report) => {
            println!(
                "{} sorted {} categories in {} (backup: {})",
                "✔".green(),
                report.categories,
                report.path,
                report.backup
            );
            Ok(EXIT_OK)
        }
        Err(e) => Ok(report_error(&e)),
    }
}

/// `capturekit check`
pub async fn run_check(ctx: &CommandContext) -> Result<i32> {
    let path = match ctx.config_path() {
        Ok(path) => path,
        Err(e) => return Ok(report_error(&e)),
    };
    let config = match bootstrap::read_config(ctx.storage().as_ref(), &path).await {
        Ok(config) => config,
        Err(e) => return Ok(report_error(&e)),
    };

    println!("{} {}", "Configuration".bold(), path);
    print_categories(&config);
    if config.category_count() == 0 {
        eprintln!("{} no categories to capture", "Warning:".yellow().bold());
    }
    Ok(EXIT_OK)
}

fn print_categories(config: &CaptureConfig) {
    println!("  variables: {}", config.variables.len());
    let Some(categories) = &config.categories else {
        println!("  categories: missing");
        return;
    };
    println!("  categories: {}", categories.len());
    for (key, category) in categories {
        let fields = category.fields.as_ref().map_or(0, Vec::len);
        let icon = category.icon.as_deref().unwrap_or_default();
        let label = if icon.is_empty() {
            key.clone()
        } else {
            format!("{icon} {key}")
        };
        let notes = category.notes.as_ref().map_or(0, Vec::len);
        let csv = category.csv_path.as_deref().unwrap_or("-");
        println!("    {label}: {fields} fields, {notes} notes, csv {csv}");
    }
}
