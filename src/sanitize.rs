//! Heuristic injection classifier for outbound payloads
//!
//! Inspects string payloads for HTML/script-injection patterns before
//! dispatch. Classifies only — input is never rewritten. This is a
//! defense-in-depth layer in front of the authoritative server-side
//! validator, not a canonicalizing sanitizer.

use crate::types::{Body, FormData, FormValue};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

/// Fixed dangerous-pattern signatures, checked in order
///
/// Each entry is `(name, pattern)`; the name is surfaced in the verdict
/// so callers can report what tripped.
static SIGNATURES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("script tag", r"(?i)<\s*/?\s*script\b"),
        ("javascript uri", r"(?i)javascript\s*:"),
        ("inline event handler", r"(?i)\bon[a-z]+\s*="),
        ("eval call", r"(?i)\beval\s*\("),
        ("timer call", r"(?i)\bset(?:timeout|interval)\s*\("),
        ("alert call", r"(?i)\balert\s*\("),
        ("fetch call", r"(?i)\bfetch\s*\("),
        ("document write", r"(?i)\bdocument\s*\.\s*write(?:ln)?\s*\("),
        (
            "location access",
            r"(?i)\b(?:window|document)\s*\.\s*location\b|\blocation\s*\.\s*(?:href|replace|assign)\b",
        ),
        (
            "storage access",
            r"(?i)\b(?:local|session)Storage\b|\bdocument\s*\.\s*cookie\b",
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| {
        // Patterns are fixed literals; a failure here is a programming error.
        (name, Regex::new(pattern).unwrap_or_else(|e| panic!("invalid signature '{name}': {e}")))
    })
    .collect()
});

/// Outcome of inspecting a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether any dangerous pattern or embedded markup was found
    pub flagged: bool,

    /// Name of the first matching signature, if any
    pub pattern: Option<&'static str>,
}

impl Verdict {
    fn clean() -> Self {
        Self {
            flagged: false,
            pattern: None,
        }
    }

    fn flagged(pattern: &'static str) -> Self {
        Self {
            flagged: true,
            pattern: Some(pattern),
        }
    }
}

/// Inspect a single string for embedded markup or dangerous patterns
///
/// Parses the string as an HTML fragment and flags it when the fragment
/// contains any element node (embedded HTML where plain text was
/// expected), then matches the raw string and the fragment's extracted
/// text against the signature list. Short-circuits on the first match.
pub fn inspect(text: &str) -> Verdict {
    let fragment = Html::parse_fragment(text);

    // parse_fragment wraps content in a synthetic <html> root; any further
    // element node means the input carried markup.
    let has_elements = fragment
        .root_element()
        .descendants()
        .skip(1)
        .any(|node| node.value().is_element());
    if has_elements {
        return Verdict::flagged("embedded markup");
    }

    let extracted: String = fragment.root_element().text().collect();
    for (name, signature) in SIGNATURES.iter() {
        if signature.is_match(text) || signature.is_match(&extracted) {
            return Verdict::flagged(name);
        }
    }

    Verdict::clean()
}

/// Inspect a structured JSON payload, walking arrays and object fields
///
/// Any flagged string leaf flags the whole payload; non-string leaves
/// (numbers, booleans, null) pass unflagged.
pub fn inspect_value(value: &serde_json::Value) -> Verdict {
    match value {
        serde_json::Value::String(text) => inspect(text),
        serde_json::Value::Array(items) => {
            for item in items {
                let verdict = inspect_value(item);
                if verdict.flagged {
                    return verdict;
                }
            }
            Verdict::clean()
        }
        serde_json::Value::Object(fields) => {
            for field in fields.values() {
                let verdict = inspect_value(field);
                if verdict.flagged {
                    return verdict;
                }
            }
            Verdict::clean()
        }
        _ => Verdict::clean(),
    }
}

/// Inspect a multi-part form by its declared value entries
///
/// Text parts and file names are inspected; binary content is not.
pub fn inspect_form(form: &FormData) -> Verdict {
    for (_, value) in form.parts() {
        let verdict = match value {
            FormValue::Text(text) => inspect(text),
            FormValue::Bytes { filename, .. } => inspect(filename),
        };
        if verdict.flagged {
            return verdict;
        }
    }
    Verdict::clean()
}

/// Inspect any request body
pub fn inspect_body(body: &Body) -> Verdict {
    match body {
        Body::Json(value) => inspect_value(value),
        Body::Form(form) => inspect_form(form),
    }
}
