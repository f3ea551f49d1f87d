//! Error types for configuration loading and validation

use std::path::PathBuf;

use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Unified configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Explicitly requested file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// One or more fields failed validation.
    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    /// Figment could not merge or extract the layered sources.
    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] Box<figment::Error>),

    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Parsing(Box::new(err))
    }
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

/// Renders nested validation errors as `section.field: message` lines.
fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut output = String::new();
    collect_errors(errors, "", &mut output);
    output
}

fn collect_errors(errors: &ValidationErrors, prefix: &str, output: &mut String) {
    use std::fmt::Write;

    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = match &error.message {
                        Some(msg) => msg.to_string(),
                        None => error.code.to_string(),
                    };
                    let _ = writeln!(output, "  - {path}: {message}");
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_errors(inner, &path, output),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_errors(inner, &format!("{path}[{index}]"), output);
                }
            }
        }
    }
}
