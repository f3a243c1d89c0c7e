//! Markdown decorations and CSV cell encoding

use capturekit_config::FormatOptions;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static UNQUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]*(?:\.[0-9]+)?|true|false)$").expect("unquoted cell pattern is valid")
});

/// Apply markdown decorations, trimming the value first.
///
/// Decorations stack in a fixed order, each wrapping the previous result:
/// bold (`**`), italics (`_`), strikethrough (`~~`), highlight (`==`).
/// Empty values and absent options are returned unchanged.
///
/// ```
/// use capturekit_config::FormatOptions;
/// use capturekit_engine::format::format_value;
///
/// let options = FormatOptions { bold: true, italics: true, ..Default::default() };
/// assert_eq!(format_value(" Swim ", Some(&options)), "_**Swim**_");
/// ```
pub fn format_value(value: &str, options: Option<&FormatOptions>) -> String {
    let Some(options) = options else {
        return value.to_string();
    };
    if value.is_empty() {
        return String::new();
    }

    let mut out = value.trim().to_string();
    if options.bold {
        out = format!("**{out}**");
    }
    if options.italics {
        out = format!("_{out}_");
    }
    if options.strikethrough {
        out = format!("~~{out}~~");
    }
    if options.highlight {
        out = format!("=={out}==");
    }
    out
}

/// False for integers, decimals and the literals `true`/`false`, which are
/// written to CSV bare; true for every other string
pub fn should_quote(value: &str) -> bool {
    !UNQUOTED.is_match(value)
}

/// Encode one CSV cell.
///
/// `null` is empty, booleans and numbers are bare, strings are quoted per
/// [`should_quote`] with embedded quotes doubled, arrays and objects are
/// quoted compact JSON.
pub fn encode_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_if_needed(s),
        Value::Array(_) | Value::Object(_) => quote(&value.to_string()),
    }
}

fn quote_if_needed(text: &str) -> String {
    if should_quote(text) {
        quote(text)
    } else {
        text.to_string()
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}
