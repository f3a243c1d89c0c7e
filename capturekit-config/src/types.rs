//! Capture configuration document
//!
//! The document is JSON:
//!
//! ```json
//! {
//!   "variables": { "dateFormat": "YYYY-MM-DD" },
//!   "categories": {
//!     "Exercise": {
//!       "icon": "🏊",
//!       "fields": [ { "name": "Activity", "prompt": "suggester", "listPath": "Lists/Activities.md" } ],
//!       "csvPath": "Data/Exercise.csv",
//!       "notes": [ { "path": "Journal/", "topOrBottom": "bottom" } ]
//!     }
//!   }
//! }
//! ```
//!
//! Almost every string in here may contain `var(name)` references, so the
//! types keep attributes loosely typed (`Option<String>`, [`Flag`]) and leave
//! interpretation to the engine after resolution. A scalar attribute of the
//! wrong JSON type is dropped with a warning; only the surrounding structure
//! (categories, fields, notes) must have the right shape.

use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// A boolean-like attribute: a JSON boolean or a string such as `"true"` or
/// `"var(isRequired)"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        Flag::Bool(value)
    }
}

/// Markdown decorations applied to a captured value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    pub bold: bool,
    pub italics: bool,
    pub strikethrough: bool,
    pub highlight: bool,
}

impl FormatOptions {
    /// Build options from decoration names such as `"bold"` or `"italics"`.
    /// Unknown names are ignored.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut options = Self::default();
        for name in names {
            match name.trim().to_lowercase().as_str() {
                "bold" => options.bold = true,
                "italic" | "italics" => options.italics = true,
                "strike" | "strikethrough" => options.strikethrough = true,
                "highlight" => options.highlight = true,
                _ => {}
            }
        }
        options
    }
}

/// How a field's `format` attribute may be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatSpec {
    /// `{"bold": true, "italics": true}`
    Options(FormatOptions),
    /// `["bold", "italics"]`
    Names(Vec<String>),
    /// `"bold"` or `"bold, italics"`
    Name(String),
}

impl FormatSpec {
    /// Decorations this spec asks for. String names should already be
    /// variable-resolved.
    pub fn options(&self) -> FormatOptions {
        match self {
            FormatSpec::Options(options) => *options,
            FormatSpec::Names(names) => FormatOptions::from_names(names.iter().map(String::as_str)),
            FormatSpec::Name(name) => {
                FormatOptions::from_names(name.split([',', ' ']).filter(|s| !s.is_empty()))
            }
        }
    }
}

/// Deserialize an optional attribute, dropping values of the wrong type
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Some(value) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            warn!(%value, error = %e, "Ignoring configuration attribute of unexpected type");
            Ok(None)
        }
    }
}

/// One prompted data point of a category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Prompt discriminator: `inputPrompt`, `wideInputPrompt`, `yesNoPrompt`, `suggester`
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub required: Option<Flag>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub write: Option<Flag>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatSpec>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub list_path: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub has_icons: Option<Flag>,
    /// Attributes the engine does not interpret (kept for other consumers)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A markdown document that receives one line per capture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTarget {
    /// File path, or folder path (the file name is derived from icon and name)
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Must be exactly `"top"` or `"bottom"`
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub top_or_bottom: Option<String>,
    /// Required string when prepending; any JSON is accepted so that a
    /// non-string can be reported rather than failing the whole document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub as_todo: Option<Flag>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub write_date: Option<Flag>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub link_date: Option<Flag>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub write_time: Option<Flag>,
}

/// A selectable capture category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Declared either as an array or as an object whose values are fields
    #[serde(
        default,
        deserialize_with = "deserialize_fields",
        skip_serializing_if = "Option::is_none"
    )]
    pub fields: Option<Vec<Field>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub csv_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<NoteTarget>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub disable_comment_field: Option<Flag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_field_prefix: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_field_suffix: Option<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub comment_field_format: Option<FormatSpec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Category {
    /// Fields in declaration order, inserting an empty collection if the
    /// category declared none
    pub fn fields_mut(&mut self) -> &mut Vec<Field> {
        self.fields.get_or_insert_with(Vec::new)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldCollection {
    List(Vec<Field>),
    Map(IndexMap<String, Field>),
}

fn deserialize_fields<'de, D>(deserializer: D) -> Result<Option<Vec<Field>>, D::Error>
where
    D: Deserializer<'de>,
{
    let collection = Option::<FieldCollection>::deserialize(deserializer)?;
    Ok(collection.map(|collection| match collection {
        FieldCollection::List(fields) => fields,
        FieldCollection::Map(fields) => fields.into_values().collect(),
    }))
}

/// The whole capture configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Seed values for the variable registry
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    /// Categories keyed by (possibly variable-bearing) display key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<IndexMap<String, Category>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CaptureConfig {
    /// Parse a capture document.
    ///
    /// Returns `Ok(None)` when the text is not a JSON object at all (empty
    /// file, garbage, a bare array), which callers treat as "not configured".
    /// A JSON object with the wrong shape is an error.
    pub fn parse(text: &str) -> crate::ConfigResult<Option<Self>> {
        let value = match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => value,
            _ => return Ok(None),
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Pretty JSON with two-space indentation
    pub fn to_pretty_json(&self) -> crate::ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of categories, zero when the section is missing
    pub fn category_count(&self) -> usize {
        self.categories.as_ref().map_or(0, IndexMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flag_parsing() {
        let flags: Vec<Flag> = serde_json::from_value(json!([true, "true", false, "var(x)"])).unwrap();
        assert_eq!(flags[0], Flag::Bool(true));
        assert_eq!(flags[1], Flag::Text("true".into()));
        assert_eq!(flags[2], Flag::Bool(false));
        assert_eq!(flags[3], Flag::Text("var(x)".into()));
    }

    #[test]
    fn test_wrong_scalar_types_stay_local() {
        let config = CaptureConfig::parse(
            r#"{"categories": {"Log": {
                "icon": 7,
                "csvPath": "Log.csv",
                "fields": [
                    {"name": "Mood", "prompt": "inputPrompt", "required": 1, "prefix": 5, "write": true},
                    {"name": 3, "prompt": "inputPrompt", "format": 2}
                ],
                "notes": [{"path": "Log.md", "topOrBottom": "bottom", "asTodo": [true]}]
            }}}"#,
        )
        .unwrap()
        .unwrap();

        let log = &config.categories.as_ref().unwrap()["Log"];
        assert_eq!(log.icon, None);
        assert_eq!(log.csv_path.as_deref(), Some("Log.csv"));
        let fields = log.fields.as_ref().unwrap();
        assert_eq!(fields[0].name.as_deref(), Some("Mood"));
        assert_eq!(fields[0].required, None);
        assert_eq!(fields[0].prefix, None);
        assert_eq!(fields[0].write, Some(Flag::Bool(true)));
        assert_eq!(fields[1].name, None);
        assert_eq!(fields[1].format, None);
        let note = &log.notes.as_ref().unwrap()[0];
        assert_eq!(note.as_todo, None);
        assert_eq!(note.path.as_deref(), Some("Log.md"));
    }

    #[test]
    fn test_format_spec_variants() {
        let object: FormatSpec = serde_json::from_value(json!({"bold": true})).unwrap();
        assert_eq!(
            object.options(),
            FormatOptions {
                bold: true,
                ..Default::default()
            }
        );

        let name: FormatSpec = serde_json::from_value(json!("italics")).unwrap();
        assert!(name.options().italics);

        let names: FormatSpec = serde_json::from_value(json!(["bold", "highlight"])).unwrap();
        let options = names.options();
        assert!(options.bold && options.highlight && !options.italics);

        let joined = FormatSpec::Name("bold, strikethrough".to_string());
        let options = joined.options();
        assert!(options.bold && options.strikethrough);
    }

    #[test]
    fn test_fields_as_array_or_object() {
        let as_array: Category = serde_json::from_value(json!({
            "fields": [{"name": "A"}, {"name": "B"}]
        }))
        .unwrap();
        let as_object: Category = serde_json::from_value(json!({
            "fields": {"first": {"name": "A"}, "second": {"name": "B"}}
        }))
        .unwrap();

        let names = |c: &Category| -> Vec<String> {
            c.fields
                .as_ref()
                .unwrap()
                .iter()
                .map(|f| f.name.clone().unwrap())
                .collect()
        };
        assert_eq!(names(&as_array), vec!["A", "B"]);
        assert_eq!(names(&as_object), vec!["A", "B"]);
    }

    #[test]
    fn test_missing_fields_populated_on_demand() {
        let mut category = Category::default();
        assert!(category.fields.is_none());
        assert!(category.fields_mut().is_empty());
        assert_eq!(category.fields, Some(Vec::new()));
    }

    #[test]
    fn test_parse_not_an_object() {
        assert!(CaptureConfig::parse("").unwrap().is_none());
        assert!(CaptureConfig::parse("[1, 2]").unwrap().is_none());
        assert!(CaptureConfig::parse("not json").unwrap().is_none());
    }

    #[test]
    fn test_parse_wrong_shape_is_error() {
        let result = CaptureConfig::parse(r#"{"categories": {"A": {"notes": "oops"}}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_keeps_category_order_and_unknown_keys() {
        let config = CaptureConfig::parse(
            r#"{
                "variables": {"debug": false},
                "categories": {
                    "Zebra": {"fields": [{"name": "Rating", "prompt": "inputPrompt", "dataView": "rating"}]},
                    "Apple": {}
                }
            }"#,
        )
        .unwrap()
        .unwrap();

        let categories = config.categories.as_ref().unwrap();
        let keys: Vec<&String> = categories.keys().collect();
        assert_eq!(keys, vec!["Zebra", "Apple"]);

        let field = &categories["Zebra"].fields.as_ref().unwrap()[0];
        assert_eq!(field.extra.get("dataView"), Some(&json!("rating")));
        assert_eq!(config.category_count(), 2);
    }

    #[test]
    fn test_note_target_camel_case() {
        let note: NoteTarget = serde_json::from_value(json!({
            "path": "Journal/",
            "topOrBottom": "top",
            "header": "## Log",
            "asTodo": true,
            "linkDate": "true",
            "writeTime": false
        }))
        .unwrap();
        assert_eq!(note.top_or_bottom.as_deref(), Some("top"));
        assert_eq!(note.as_todo, Some(Flag::Bool(true)));
        assert_eq!(note.link_date, Some(Flag::Text("true".into())));
        assert_eq!(note.write_time, Some(Flag::Bool(false)));
        assert!(note.write_date.is_none());
    }
}
