//! Sample capture configuration offered to new users

use crate::ConfigResult;
use serde_json::{json, Value};

/// The sample document as JSON
pub fn sample_config_value() -> Value {
    json!({
        "variables": {
            "debug": false,
            "dateFormat": "YYYY-MM-DD",
            "timeFormat": "HH:mm:ss",
            "sortCategories": false
        },
        "categories": {
            "Exercise": {
                "icon": "🏊‍♀️",
                "fields": [
                    {
                        "name": "Activity",
                        "prompt": "suggester",
                        "listPath": "Journal/Exercise Activities.md",
                        "format": "italics",
                        "hasIcons": true,
                        "write": true
                    },
                    {
                        "name": "Rating",
                        "prompt": "inputPrompt",
                        "format": "bold",
                        "dataView": "rating",
                        "suffix": "/10",
                        "write": true
                    }
                ],
                "csvPath": "Journal/Exercise.csv",
                "notes": [
                    {
                        "path": "Journal/",
                        "topOrBottom": "bottom",
                        "writeTime": true
                    }
                ]
            }
        }
    })
}

/// The sample document as pretty JSON, ready to write to disk
pub fn sample_config_text() -> ConfigResult<String> {
    Ok(serde_json::to_string_pretty(&sample_config_value())?)
}
