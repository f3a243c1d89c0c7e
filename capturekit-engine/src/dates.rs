//! Moment-style date patterns and the session clock

use chrono::{DateTime, Datelike, FixedOffset, Local, Timelike};

/// Source of "now" for date stamps and date expressions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Local wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock stopped at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Parse an RFC 3339 timestamp such as `2024-03-09T07:05:03+00:00`
    pub fn parse(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(rfc3339).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

// Longest tokens first so `MMMM` wins over `MM`
const TOKENS: [&str; 25] = [
    "YYYY", "MMMM", "dddd", "MMM", "ddd", "YY", "MM", "Do", "DD", "HH", "hh", "mm", "ss", "ZZ",
    "M", "D", "d", "H", "h", "m", "s", "A", "a", "Z", "X",
];

/// Render a moment-style pattern, e.g. `YYYY-MM-DD` or `ddd, MMM Do [at] HH:mm`.
/// Text in square brackets is copied literally; characters that are not part
/// of a token are copied as they are.
pub fn format_moment(at: &DateTime<FixedOffset>, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(end) = rest.find(']') {
                out.push_str(&rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
        }
        match TOKENS.iter().find(|token| rest.starts_with(*token)) {
            Some(token) => {
                render_token(at, token, &mut out);
                rest = &rest[token.len()..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

fn render_token(at: &DateTime<FixedOffset>, token: &str, out: &mut String) {
    let text = match token {
        "YYYY" => format!("{:04}", at.year()),
        "YY" => format!("{:02}", at.year().rem_euclid(100)),
        "MMMM" => at.format("%B").to_string(),
        "MMM" => at.format("%b").to_string(),
        "MM" => format!("{:02}", at.month()),
        "M" => at.month().to_string(),
        "Do" => ordinal(at.day()),
        "DD" => format!("{:02}", at.day()),
        "D" => at.day().to_string(),
        "dddd" => at.format("%A").to_string(),
        "ddd" => at.format("%a").to_string(),
        "d" => at.weekday().num_days_from_sunday().to_string(),
        "HH" => format!("{:02}", at.hour()),
        "H" => at.hour().to_string(),
        "hh" => format!("{:02}", at.hour12().1),
        "h" => at.hour12().1.to_string(),
        "mm" => format!("{:02}", at.minute()),
        "m" => at.minute().to_string(),
        "ss" => format!("{:02}", at.second()),
        "s" => at.second().to_string(),
        "A" => (if at.hour12().0 { "PM" } else { "AM" }).to_string(),
        "a" => (if at.hour12().0 { "pm" } else { "am" }).to_string(),
        "ZZ" => at.format("%z").to_string(),
        "Z" => at.format("%:z").to_string(),
        "X" => at.timestamp().to_string(),
        _ => token.to_string(),
    };
    out.push_str(&text);
}

fn ordinal(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix}")
}
