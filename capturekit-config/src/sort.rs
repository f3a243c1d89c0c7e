//! One-shot category sorting

use crate::{CaptureConfig, ConfigError, ConfigResult};
use serde_json::Value;

/// Variable that requests a sort when set to `true`
pub const SORT_VARIABLE: &str = "sortCategories";

/// Order categories by key. Returns the number of categories.
pub fn sort_categories(config: &mut CaptureConfig, ascending: bool) -> ConfigResult<usize> {
    let categories = config
        .categories
        .as_mut()
        .ok_or(ConfigError::MissingCategories)?;
    if ascending {
        categories.sort_keys();
    } else {
        categories.sort_by(|a, _, b, _| b.cmp(a));
    }
    Ok(categories.len())
}

/// Backup location for a configuration file: `dir/name.json` becomes
/// `dir/name.backup.json`
pub fn backup_path(path: &str) -> ConfigResult<String> {
    match path.strip_suffix(".json") {
        Some(stem) if !stem.is_empty() && !stem.ends_with('/') => Ok(format!("{stem}.backup.json")),
        _ => Err(ConfigError::BackupCollision {
            path: path.to_string(),
        }),
    }
}

/// True when the configuration asks to be sorted. The request is cleared so
/// the rewritten file does not sort again.
pub fn take_sort_request(config: &mut CaptureConfig) -> bool {
    match config.variables.get_mut(SORT_VARIABLE) {
        Some(flag) if *flag == Value::Bool(true) => {
            *flag = Value::Bool(false);
            true
        }
        _ => false,
    }
}
