//! Shared variable registry
//!
//! The registry is the one piece of mutable state a capture session shares
//! with its host. Handles are cheap clones of the same map, so a value set by
//! the engine is visible to every other holder straight away, including after
//! a session ends early. Keys are only ever added or overwritten.

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry keys written by the engine
pub mod keys {
    pub const DATE: &str = "date";
    pub const TIME: &str = "time";
    pub const CATEGORY: &str = "category";
    pub const NAME: &str = "name";
    pub const ICON: &str = "icon";
    pub const FIELD_PAIRS: &str = "fieldPairs";
    pub const WRITEABLE_FIELDS: &str = "writeableFields";
    pub const WRITEABLE_LINE: &str = "writeableLine";
    pub const CONFIG: &str = "config";
}

/// Handle to a shared, insertion-ordered variable map
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    inner: Arc<RwLock<IndexMap<String, Value>>>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with host variables
    pub fn from_map(values: IndexMap<String, Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(values)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read(|map| map.get(key).cloned())
    }

    /// The value as substitution text, see [`value_to_text`]
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.read(|map| map.get(key).map(value_to_text))
    }

    /// Insert or overwrite a value
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        self.write(|map| {
            map.insert(key, value);
        });
    }

    /// Insert only when the key is not present yet. Returns whether the
    /// value was inserted.
    pub fn set_if_absent(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        self.write(|map| {
            if map.contains_key(&key) {
                false
            } else {
                map.insert(key, value);
                true
            }
        })
    }

    /// Copy of the whole map
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.read(|map| map.clone())
    }

    pub fn len(&self) -> usize {
        self.read(|map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read<R>(&self, f: impl FnOnce(&IndexMap<String, Value>) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut IndexMap<String, Value>) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Text substituted for a registry value: strings as-is, `null` as empty,
/// arrays comma-joined, objects as compact JSON
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}
