//! # SQL Guard
//!
//! Cleans a model-generated statement and gates it on a leading `SELECT`.
//!
//! This is a single keyword gate, not a SQL validator: anything that starts with
//! `SELECT` is executed verbatim, including statements with side effects hidden
//! behind functions or a second statement the driver happens to accept. Point the
//! executor at a read-only connection or role when that matters.

use crate::errors::GuardError;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A markdown fence around the whole reply: a run of three or more backticks or
/// tildes, an optional language tag, the body, and an optional closing run.
fn fence_re() -> &'static Regex {
    static FENCE_RE: OnceLock<Regex> = OnceLock::new();
    FENCE_RE.get_or_init(|| {
        Regex::new(
            r"(?s)\A(?P<open>`{3,}|~{3,})[ \t]*(?:(?P<tag>[A-Za-z][\w+.-]*)[ \t]*\r?\n|(?i:postgresql|postgres|sqlite|mysql|plsql|tsql|psql|sql)[ \t]+|\r?\n)?(?P<body>.*?)\s*(?P<close>`{3,}|~{3,})?\s*\z",
        )
        .expect("valid fence regex")
    })
}

/// A statement that passed [`clean_and_validate`]. Only the guard can build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSql(String);

impl ValidatedSql {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ValidatedSql {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Cleans `raw` and accepts it only if it begins with the `SELECT` keyword.
pub fn clean_and_validate(raw: &str) -> Result<ValidatedSql, GuardError> {
    let cleaned = clean_sql(raw);
    if cleaned.is_empty() {
        return Err(GuardError::Empty);
    }
    if !starts_with_select(&cleaned) {
        return Err(GuardError::NotSelectOnly { statement: cleaned });
    }
    Ok(ValidatedSql(cleaned))
}

/// Trims the text and removes a surrounding markdown fence and its language tag.
///
/// Fences of three or more backticks or tildes are recognised, with CRLF or LF
/// line ends. A missing closing fence is tolerated. Text without an opening fence
/// is only trimmed, so a statement that is already clean comes back unchanged.
pub fn clean_sql(raw: &str) -> String {
    let text = raw.trim();
    let Some(caps) = fence_re().captures(text) else {
        return text.to_string();
    };
    let (Some(open), Some(body)) = (caps.name("open"), caps.name("body")) else {
        return text.to_string();
    };

    // A bare `SELECT` on the opening line is the statement, not a tag.
    let start = match caps.name("tag") {
        Some(tag) if starts_with_select(tag.as_str()) => tag.start(),
        _ => body.start(),
    };
    // A closing run of the other marker belongs to the body.
    let end = match caps.name("close") {
        Some(close) if close.as_str()[..1] != open.as_str()[..1] => close.end(),
        _ => body.end(),
    };

    text[start..end].trim().to_string()
}

fn starts_with_select(text: &str) -> bool {
    let text = text.trim_start();
    let Some(head) = text.get(..6) else {
        return false;
    };
    if !head.eq_ignore_ascii_case("select") {
        return false;
    }
    !text[6..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}
