//! Logging utilities for CaptureKit

use serde::Serialize;
use std::fmt::Debug;

/// Wrapper for pretty-printing types in logs as YAML
///
/// Use this in tracing statements to dump structured context such as the
/// current field pairs or a category definition:
///
/// ```ignore
/// use capturekit_common::Pretty;
/// use tracing::debug;
///
/// debug!("Added capture for field {}", Pretty(&field_pairs));
/// ```
///
/// Outputs YAML with a leading newline. `Debug` is the fallback if YAML
/// serialization fails.
pub struct Pretty<T>(pub T);

impl<T: Serialize + Debug> std::fmt::Display for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_yaml_ng::to_string(&self.0) {
            Ok(yaml) => write!(f, "\n{}", yaml),
            Err(_) => write!(f, "\n{:#?}", self.0),
        }
    }
}

impl<T: Serialize + Debug> std::fmt::Debug for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pretty_renders_yaml() {
        let value = json!({"Activity": "Swim", "Rating": "8"});
        let rendered = Pretty(&value).to_string();
        assert!(rendered.starts_with('\n'));
        assert!(rendered.contains("Activity: Swim"));
        assert!(rendered.contains("Rating:"));
    }
}
