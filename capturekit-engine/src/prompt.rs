//! Prompt providers
//!
//! Every prompt can come back empty: the user pressed escape, closed the
//! dialog, or (for scripted prompts) the answers ran out. The engine decides
//! per field whether an empty answer aborts the session.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Interactive surface used by the capture engine
#[async_trait]
pub trait PromptProvider: Send + Sync {
    /// Single-line text
    async fn text(&self, label: &str) -> Option<String>;

    /// Multi-line text
    async fn wide_text(&self, label: &str) -> Option<String>;

    /// `None` when no boolean answer was given
    async fn yes_no(&self, title: &str, body: &str) -> Option<bool>;

    /// Pick one of `display`; the matching entry of `actual` is returned
    async fn select(&self, display: &[String], actual: &[String]) -> Option<String>;

    /// Show a message that needs no answer
    async fn info(&self, title: &str, body: &str);
}

/// A prompt the engine asked, as recorded by [`ScriptedPrompts`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskedPrompt {
    Text(String),
    WideText(String),
    YesNo(String),
    Select(Vec<String>),
    Info(String),
}

#[derive(Debug, Default)]
struct Script {
    answers: VecDeque<Value>,
    asked: Vec<AskedPrompt>,
}

/// Answers prompts from a queue of JSON values.
///
/// - text prompts take a string (numbers are stringified); `null` is no answer
/// - yes/no prompts take a boolean; anything else is no answer
/// - selections take the actual value, a displayed label, or an index
///
/// An exhausted queue answers nothing. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompts {
    script: Arc<Mutex<Script>>,
}

impl ScriptedPrompts {
    pub fn new<I, V>(answers: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let script = Script {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        };
        Self {
            script: Arc::new(Mutex::new(script)),
        }
    }

    /// Prompts asked so far, in order
    pub fn asked(&self) -> Vec<AskedPrompt> {
        self.lock().asked.clone()
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.lock().answers.len()
    }

    fn next(&self, asked: AskedPrompt) -> Option<Value> {
        let mut script = self.lock();
        script.asked.push(asked);
        script.answers.pop_front()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn as_text(answer: Option<Value>) -> Option<String> {
    match answer? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[async_trait]
impl PromptProvider for ScriptedPrompts {
    async fn text(&self, label: &str) -> Option<String> {
        as_text(self.next(AskedPrompt::Text(label.to_string())))
    }

    async fn wide_text(&self, label: &str) -> Option<String> {
        as_text(self.next(AskedPrompt::WideText(label.to_string())))
    }

    async fn yes_no(&self, title: &str, _body: &str) -> Option<bool> {
        match self.next(AskedPrompt::YesNo(title.to_string()))? {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    async fn select(&self, display: &[String], actual: &[String]) -> Option<String> {
        match self.next(AskedPrompt::Select(display.to_vec()))? {
            Value::Number(n) => {
                let index = usize::try_from(n.as_u64()?).ok()?;
                actual.get(index).cloned()
            }
            Value::String(s) => {
                if actual.contains(&s) {
                    Some(s)
                } else {
                    let index = display.iter().position(|d| *d == s)?;
                    actual.get(index).cloned()
                }
            }
            _ => None,
        }
    }

    async fn info(&self, title: &str, _body: &str) {
        self.lock().asked.push(AskedPrompt::Info(title.to_string()));
    }
}
