//! Dot-path extraction over JSON documents
//!
//! Paths are dot-separated: object keys, array indices, and a trailing `#`
//! for the length of an array. A literal dot inside a key is written `\.`.
//!
//! | Path | Document | Result |
//! |------|----------|--------|
//! | `name` | `{"name": "John"}` | `John` |
//! | `user.email` | `{"user": {"email": "j@x.com"}}` | `j@x.com` |
//! | `users.1.id` | `{"users": [{"id": 1}, {"id": 2}]}` | `2` |
//! | `users.#` | `{"users": [1, 2, 3]}` | `3` |
//!
//! `#` is only meaningful as the last segment. Queries that map over an array,
//! such as `users.#.id`, are not supported and resolve to not-found.

use crate::extract::ExtractError;
use serde_json::Value;
use std::borrow::Cow;

/// Extracts a value from a JSON body
///
/// Strings are returned without quotes, numbers and booleans as written,
/// `null` as an empty string, and objects or arrays as compact JSON. A path
/// that does not resolve is an error, distinct from a value that exists but
/// is empty.
///
/// # Example
///
/// ```
/// use sumi_harvest::extract::extract_json;
///
/// let body = br#"{"name": "John Doe"}"#;
/// assert_eq!(extract_json(body, "name").unwrap(), "John Doe");
/// assert!(extract_json(body, "address").is_err());
/// assert!(extract_json(body, "").is_err());
/// ```
pub fn extract_json(body: &[u8], path: &str) -> Result<String, ExtractError> {
    if path.is_empty() {
        return Err(ExtractError::EmptyPath);
    }

    let root = parse_body(body)?;
    select_path(&root, path)
}

/// Parses a body as a JSON document
pub(crate) fn parse_body(body: &[u8]) -> Result<Value, ExtractError> {
    serde_json::from_slice(body).map_err(|e| ExtractError::InvalidJson(e.to_string()))
}

/// Evaluates a path against an already parsed document
pub(crate) fn select_path(root: &Value, path: &str) -> Result<String, ExtractError> {
    if path.is_empty() {
        return Err(ExtractError::EmptyPath);
    }

    lookup(root, path)
        .map(|value| render(&value))
        .ok_or_else(|| ExtractError::PathNotFound(path.to_string()))
}

fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    segments
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<Cow<'a, Value>> {
    let segments = split_path(path);
    let last = segments.len() - 1;
    let mut current = root;

    for (i, segment) in segments.iter().enumerate() {
        current = match current {
            Value::Object(map) => map.get(segment.as_str())?,
            Value::Array(items) => {
                if segment == "#" && i == last {
                    return Some(Cow::Owned(Value::from(items.len())));
                }
                items.get(segment.parse::<usize>().ok()?)?
            }
            _ => return None,
        };
    }

    Some(Cow::Borrowed(current))
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
