use serde::Deserialize;
use std::fmt;

/// Base URL used for generated work items when none is configured
pub const DEFAULT_BASE_URL: &str = "http://example.com";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Main configuration structure for Sumi-Harvest
///
/// Field names follow the camelCase layout of the JSON configuration files.
/// The older `numLinks`-style names are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Number of work items to generate
    #[serde(alias = "numLinks")]
    pub link_count: usize,

    /// Number of concurrent fetch workers
    #[serde(alias = "numFetchWorkers")]
    pub fetch_worker_count: usize,

    /// Number of concurrent process workers
    #[serde(alias = "numProcessWorkers")]
    pub process_worker_count: usize,

    /// Maximum number of fetch attempts per URL
    pub max_retries: u32,

    /// Sustained request rate shared by all fetch workers
    #[serde(alias = "rateLimit")]
    pub rate_limit_per_second: f64,

    /// Token bucket capacity
    pub burst_limit: u32,

    /// Scheme and host prepended to every generated work item
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Extraction rules, applied in order
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// A group of fields extracted from one kind of page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,

    pub name: String,

    /// Declared path pattern. Not used for matching; see [`CategoryType::matches_url`].
    #[serde(default)]
    pub path: String,

    #[serde(rename = "type")]
    pub kind: CategoryType,

    #[serde(default)]
    pub data_fields: Vec<DataField>,
}

/// Content type a category applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Html,
    Json,
}

impl CategoryType {
    /// URL suffix associated with this content type
    pub fn suffix(self) -> &'static str {
        match self {
            CategoryType::Html => ".html",
            CategoryType::Json => ".json",
        }
    }

    /// Whether a fetched URL is handled by categories of this type.
    ///
    /// Only the URL suffix is compared. Two categories of the same type with
    /// different paths both apply to every URL carrying that suffix.
    pub fn matches_url(self, url: &str) -> bool {
        url.ends_with(self.suffix())
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryType::Html => write!(f, "html"),
            CategoryType::Json => write!(f, "json"),
        }
    }
}

/// A single named value to extract from a page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDataField")]
pub struct DataField {
    pub field_name: String,
    pub selector: FieldSelector,
}

/// How a field's value is located in the page body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelector {
    /// CSS selector, optionally reading an attribute instead of the text
    Css {
        selector: String,
        attribute: Option<String>,
    },

    /// Dot-separated path into a JSON document
    JsonPath(String),
}

impl FieldSelector {
    /// The category type this selector can be evaluated against
    pub fn kind(&self) -> CategoryType {
        match self {
            FieldSelector::Css { .. } => CategoryType::Html,
            FieldSelector::JsonPath(_) => CategoryType::Json,
        }
    }
}

/// Data field as it appears on disk, before the selector kind is resolved
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDataField {
    field_name: String,
    #[serde(default)]
    css_selector: Option<String>,
    #[serde(default)]
    attribute: Option<String>,
    #[serde(default)]
    json_path: Option<String>,
}

impl TryFrom<RawDataField> for DataField {
    type Error = String;

    fn try_from(raw: RawDataField) -> Result<Self, Self::Error> {
        // Empty strings are treated the same as missing keys
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        let selector = match (non_empty(raw.css_selector), non_empty(raw.json_path)) {
            (Some(selector), None) => FieldSelector::Css {
                selector,
                attribute: non_empty(raw.attribute),
            },
            (None, Some(path)) => {
                if raw.attribute.as_deref().is_some_and(|a| !a.is_empty()) {
                    return Err(format!(
                        "field '{}' sets an attribute without a cssSelector",
                        raw.field_name
                    ));
                }
                FieldSelector::JsonPath(path)
            }
            (Some(_), Some(_)) => {
                return Err(format!(
                    "field '{}' must set exactly one of cssSelector or jsonPath, got both",
                    raw.field_name
                ))
            }
            (None, None) => {
                return Err(format!(
                    "field '{}' must set exactly one of cssSelector or jsonPath, got neither",
                    raw.field_name
                ))
            }
        };

        Ok(DataField {
            field_name: raw.field_name,
            selector,
        })
    }
}
