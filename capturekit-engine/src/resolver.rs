//! Variable and expression resolution
//!
//! `var(name)` references are replaced with registry values, leftmost first,
//! rescanning after every substitution so that values which themselves hold
//! references are expanded depth-first. Once no reference is left, embedded
//! call chains such as `date.now('HH:mm')` are handed to the expression
//! evaluator. A substituted expression result may contain new references, so
//! resolution starts over until a full round changes nothing.
//!
//! Every substitution counts against a step limit; a self-referencing variable
//! ends in [`ResolveError::StepLimitExceeded`] instead of running forever.

use crate::{
    context::VariableRegistry, expression::ExpressionEvaluator, ExpressionError, ResolveError,
};
use capturekit_config::{settings::DEFAULT_MAX_RESOLUTION_STEPS, Flag};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, trace, warn};

static VAR_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"var\((.+?)\)").expect("variable pattern is valid"));

static EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[A-Za-z0-9_]+\.?)+\(.*?\)(?:\.(?:[A-Za-z0-9_]+\.?)+\(.*?\))*")
        .expect("expression pattern is valid")
});

/// Expands `var(...)` references and expressions against a registry
#[derive(Clone)]
pub struct Resolver {
    registry: VariableRegistry,
    evaluator: Arc<dyn ExpressionEvaluator>,
    max_steps: usize,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("variables", &self.registry.len())
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(registry: VariableRegistry, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self {
            registry,
            evaluator,
            max_steps: DEFAULT_MAX_RESOLUTION_STEPS,
        }
    }

    /// Substitutions allowed per call to [`Resolver::resolve`]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    /// Expand every reference and expression in `input`
    pub fn resolve(&self, input: &str) -> Result<String, ResolveError> {
        let mut text = input.to_string();
        let mut steps = 0;

        'rounds: loop {
            while let Some((range, name)) = find_reference(&text) {
                steps = self.step(steps, input)?;
                let value = self.registry.get_text(&name).unwrap_or_else(|| {
                    warn!(variable = %name, "Variable does not exist");
                    String::new()
                });
                text.replace_range(range, &value);
            }

            let mut from = 0;
            while let Some(found) = EXPRESSION.find_at(&text, from) {
                let start = found.start();
                if let Some((end, value)) = self.evaluate_from(&text, start, found.end()) {
                    steps = self.step(steps, input)?;
                    text.replace_range(start..end, &value);
                    continue 'rounds;
                }
                from = next_boundary(&text, start);
            }

            return Ok(text);
        }
    }

    /// Evaluate the expression starting at `start`. The pattern match ends at
    /// the first `)`, which may sit inside a quoted argument, so on a syntax
    /// error the candidate is widened to each following `)` in turn.
    fn evaluate_from(&self, text: &str, start: usize, mut end: usize) -> Option<(usize, String)> {
        loop {
            let candidate = &text[start..end];
            match self.evaluator.evaluate(candidate) {
                Ok(Some(value)) => {
                    trace!(expression = candidate, %value, "Evaluated expression");
                    return Some((end, value));
                }
                Ok(None) => {
                    trace!(expression = candidate, "Leaving unrecognised expression");
                    return None;
                }
                Err(ExpressionError::Syntax { .. }) if text[end..].contains(')') => {
                    end += text[end..].find(')').map_or(0, |i| i + 1);
                }
                Err(e) => {
                    debug!(expression = candidate, error = %e, "Leaving expression");
                    return None;
                }
            }
        }
    }

    /// Resolve an optional string
    pub fn resolve_opt(&self, input: Option<&str>) -> Result<Option<String>, ResolveError> {
        input.map(|s| self.resolve(s)).transpose()
    }

    /// Resolve strings, leave every other JSON value as it is
    pub fn resolve_value(&self, value: &Value) -> Result<Value, ResolveError> {
        match value {
            Value::String(s) => Ok(Value::String(self.resolve(s)?)),
            other => Ok(other.clone()),
        }
    }

    /// `Some(true)` for `true`/`"true"`, `Some(false)` for `false`/`"false"`,
    /// `None` for anything else. Text flags are resolved first.
    pub fn flag(&self, flag: Option<&Flag>) -> Result<Option<bool>, ResolveError> {
        let resolved = match flag {
            None => return Ok(None),
            Some(Flag::Bool(b)) => return Ok(Some(*b)),
            Some(Flag::Text(text)) => self.resolve(text)?,
        };
        Ok(match resolved.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        })
    }

    /// True only for flags that resolve to `true`
    pub fn is_set(&self, flag: Option<&Flag>) -> Result<bool, ResolveError> {
        Ok(self.flag(flag)? == Some(true))
    }

    fn step(&self, steps: usize, input: &str) -> Result<usize, ResolveError> {
        let next = steps + 1;
        if next > self.max_steps {
            return Err(ResolveError::StepLimitExceeded {
                input: input.to_string(),
                limit: self.max_steps,
            });
        }
        Ok(next)
    }
}

fn find_reference(text: &str) -> Option<(Range<usize>, String)> {
    let captures = VAR_REFERENCE.captures(text)?;
    let whole = captures.get(0)?;
    let name = captures.get(1)?;
    Some((whole.range(), name.as_str().to_string()))
}

fn next_boundary(text: &str, at: usize) -> usize {
    text[at..]
        .chars()
        .next()
        .map_or(text.len(), |c| at + c.len_utf8())
}
