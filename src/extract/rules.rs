use crate::config::{Category, CategoryType, FieldSelector};
use crate::extract::{html, json, ExtractError};
use crate::harvest::FetchedContent;
use crate::output::FieldSink;
use scraper::Html;
use serde_json::Value;

/// Field counts for one processed item
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub extracted: usize,
    pub errors: usize,
}

/// Bodies parsed on first use and reused for every field of the item
#[derive(Default)]
struct ParsedBody {
    html: Option<Html>,
    json: Option<Result<Value, ExtractError>>,
}

/// Applies every matching category to a fetched item
///
/// Categories apply when the URL suffix matches their declared type; the
/// category path is not consulted. Each successfully extracted value is handed
/// to `sink`. A failed field is logged and skipped without affecting the rest
/// of the item.
pub fn process_content(
    categories: &[Category],
    content: &FetchedContent,
    sink: &dyn FieldSink,
) -> ProcessOutcome {
    let mut outcome = ProcessOutcome::default();
    let mut parsed = ParsedBody::default();

    for category in categories {
        if !category.kind.matches_url(&content.url) {
            continue;
        }
        tracing::debug!("[process] Category {} applies to {}", category.name, content.url);

        for field in &category.data_fields {
            let result = match (&field.selector, category.kind) {
                (FieldSelector::Css { selector, attribute }, CategoryType::Html) => {
                    let document = parsed
                        .html
                        .get_or_insert_with(|| html::parse_document(&content.body));
                    html::select_value(document, selector, attribute.as_deref())
                }
                (FieldSelector::JsonPath(path), CategoryType::Json) => parsed
                    .json
                    .get_or_insert_with(|| json::parse_body(&content.body))
                    .as_ref()
                    .map_err(|e| e.clone())
                    .and_then(|root| json::select_path(root, path)),
                _ => Err(ExtractError::SelectorMismatch {
                    field: field.field_name.clone(),
                    expected: category.kind,
                }),
            };

            match result {
                Ok(value) => {
                    sink.on_field_extracted(&content.url, &category.id, &field.field_name, &value);
                    outcome.extracted += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "[process] Error extracting {}/{} from {}: {}",
                        category.id,
                        field.field_name,
                        content.url,
                        e
                    );
                    outcome.errors += 1;
                }
            }
        }
    }

    outcome
}
