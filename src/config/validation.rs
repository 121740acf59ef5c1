use crate::config::types::{Category, CategoryType, Config, DataField, FieldSelector};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Upper bound on attempts per URL; backoff doubles per attempt
const MAX_RETRIES_LIMIT: u32 = 10;

/// Validates the entire configuration
///
/// Everything that could otherwise fail per request is checked here, so a
/// configuration that passes validation cannot abort a run part-way through.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_pipeline(config)?;
    validate_rate_limit(config.rate_limit_per_second, config.burst_limit)?;
    validate_base_url(&config.base_url)?;
    validate_categories(&config.categories)?;
    Ok(())
}

/// Validates pool sizes and retry budget
///
/// A `link_count` of zero is allowed and runs an empty pipeline.
fn validate_pipeline(config: &Config) -> Result<(), ConfigError> {
    if config.fetch_worker_count < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_worker_count must be >= 1, got {}",
            config.fetch_worker_count
        )));
    }

    if config.process_worker_count < 1 {
        return Err(ConfigError::Validation(format!(
            "process_worker_count must be >= 1, got {}",
            config.process_worker_count
        )));
    }

    if config.max_retries < 1 || config.max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and {}, got {}",
            MAX_RETRIES_LIMIT, config.max_retries
        )));
    }

    Ok(())
}

/// Validates token bucket parameters
pub(crate) fn validate_rate_limit(rate_per_second: f64, burst: u32) -> Result<(), ConfigError> {
    if !rate_per_second.is_finite() || rate_per_second <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate_limit_per_second must be a positive number, got {}",
            rate_per_second
        )));
    }

    if burst < 1 {
        return Err(ConfigError::Validation(
            "burst_limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the base URL for generated work items
fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            base_url
        )));
    }

    Ok(())
}

/// Validates categories and their data fields
fn validate_categories(categories: &[Category]) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for category in categories {
        if category.id.is_empty() {
            return Err(ConfigError::Validation(format!(
                "category '{}' has an empty id",
                category.name
            )));
        }

        if !seen_ids.insert(category.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category id '{}'",
                category.id
            )));
        }

        for field in &category.data_fields {
            validate_data_field(category, field)?;
        }
    }

    Ok(())
}

/// Validates a single data field against its category
fn validate_data_field(category: &Category, field: &DataField) -> Result<(), ConfigError> {
    if field.field_name.is_empty() {
        return Err(ConfigError::Validation(format!(
            "category '{}' has a data field with an empty fieldName",
            category.id
        )));
    }

    if field.selector.kind() != category.kind {
        return Err(ConfigError::Validation(format!(
            "field '{}' in {} category '{}' must use {}",
            field.field_name,
            category.kind,
            category.id,
            match category.kind {
                CategoryType::Html => "cssSelector",
                CategoryType::Json => "jsonPath",
            }
        )));
    }

    if let FieldSelector::Css { selector, .. } = &field.selector {
        Selector::parse(selector).map_err(|e| {
            ConfigError::InvalidSelector(format!(
                "field '{}' in category '{}': '{}': {}",
                field.field_name, category.id, selector, e
            ))
        })?;
    }

    Ok(())
}
