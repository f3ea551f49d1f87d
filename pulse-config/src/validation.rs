// pulse-config/src/validation.rs
//! Custom validation functions for configuration.

use std::collections::BTreeMap;

use validator::ValidationError;

/// Validate a `#RRGGBB` display color.
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^#[0-9a-fA-F]{6}$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(color) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_color"))
    }
}

/// Validate every color of a category palette.
pub fn validate_palette(palette: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    if palette.keys().any(|category| category.trim().is_empty()) {
        return Err(ValidationError::new("empty_category"));
    }
    palette.values().try_for_each(|color| validate_color(color))
}

/// Validate that a CSV column name is non-blank.
pub fn validate_column_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(ValidationError::new("empty_column_name"))
    } else {
        Ok(())
    }
}

/// Validate strftime-style timestamp formats: at least one, each with a
/// conversion specifier.
pub fn validate_timestamp_formats(formats: &[String]) -> Result<(), ValidationError> {
    if formats.is_empty() || formats.iter().any(|f| !f.contains('%')) {
        return Err(ValidationError::new("invalid_timestamp_format"));
    }
    Ok(())
}

/// Validate that the CSV delimiter is a single printable ASCII byte.
pub fn validate_delimiter(delimiter: &char) -> Result<(), ValidationError> {
    if delimiter.is_ascii() && (*delimiter == '\t' || !delimiter.is_ascii_control()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_delimiter"))
    }
}

/// Validate log level.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
