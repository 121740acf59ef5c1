//! CSS selector extraction over HTML documents

use crate::extract::ExtractError;
use scraper::{Html, Selector};

/// Extracts a value from an HTML body
///
/// With an attribute, returns that attribute of the first matching element;
/// otherwise returns the trimmed text of the first matching element. A
/// selector that matches nothing, or a missing attribute, yields an empty
/// string rather than an error.
///
/// # Example
///
/// ```
/// use sumi_harvest::extract::extract_html;
///
/// let html = b"<div><p>Hello World</p></div>";
/// assert_eq!(extract_html(html, "p", None).unwrap(), "Hello World");
/// assert_eq!(extract_html(html, "h1", None).unwrap(), "");
/// ```
pub fn extract_html(
    body: &[u8],
    selector: &str,
    attribute: Option<&str>,
) -> Result<String, ExtractError> {
    let document = parse_document(body);
    select_value(&document, selector, attribute)
}

/// Parses a body as an HTML document, replacing invalid UTF-8
pub(crate) fn parse_document(body: &[u8]) -> Html {
    Html::parse_document(&String::from_utf8_lossy(body))
}

/// Evaluates a selector against an already parsed document
pub(crate) fn select_value(
    document: &Html,
    selector: &str,
    attribute: Option<&str>,
) -> Result<String, ExtractError> {
    // An empty selector selects nothing
    if selector.trim().is_empty() {
        return Ok(String::new());
    }

    let parsed = Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })?;

    let Some(element) = document.select(&parsed).next() else {
        return Ok(String::new());
    };

    let value = match attribute.filter(|name| !name.is_empty()) {
        Some(name) => element.value().attr(name).unwrap_or_default().trim().to_string(),
        None => element.text().collect::<String>().trim().to_string(),
    };

    Ok(value)
}
