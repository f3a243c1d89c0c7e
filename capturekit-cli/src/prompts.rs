//! Terminal prompts built on dialoguer
//!
//! dialoguer blocks on stdin, so every prompt runs on the blocking pool.
//! Escape, a closed terminal or any I/O error counts as no answer.

use async_trait::async_trait;
use capturekit_engine::PromptProvider;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, Editor, FuzzySelect, Input};
use tracing::warn;

/// Prompts on the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompts;

impl TerminalPrompts {
    pub fn new() -> Self {
        Self
    }
}

async fn blocking<T, F>(prompt: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> Option<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(prompt).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!(error = %e, "Prompt task failed");
            None
        }
    }
}

#[async_trait]
impl PromptProvider for TerminalPrompts {
    async fn text(&self, label: &str) -> Option<String> {
        let label = label.to_string();
        blocking(move || {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(label)
                .allow_empty(true)
                .interact_text()
                .ok()
        })
        .await
    }

    async fn wide_text(&self, label: &str) -> Option<String> {
        let label = label.to_string();
        blocking(move || {
            eprintln!("{} {}", "✎".cyan(), label.bold());
            Editor::new()
                .edit("")
                .ok()
                .flatten()
                .map(|text| text.trim_end_matches(['\n', '\r']).to_string())
        })
        .await
    }

    async fn yes_no(&self, title: &str, body: &str) -> Option<bool> {
        let prompt = if body.is_empty() {
            title.to_string()
        } else {
            format!("{title}\n  {body}")
        };
        blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .interact_opt()
                .ok()
                .flatten()
        })
        .await
    }

    async fn select(&self, display: &[String], actual: &[String]) -> Option<String> {
        if display.is_empty() {
            return None;
        }
        let items = display.to_vec();
        let index = blocking(move || {
            FuzzySelect::with_theme(&ColorfulTheme::default())
                .items(&items)
                .default(0)
                .interact_opt()
                .ok()
                .flatten()
        })
        .await?;
        actual.get(index).cloned()
    }

    async fn info(&self, title: &str, body: &str) {
        eprintln!("{} {}", title.yellow().bold(), body);
    }
}
