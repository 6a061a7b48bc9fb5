//! Error types for templates.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur during template operations.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Malformed template at line {line}, column {column} (offset {offset}): {message}")]
    MalformedTemplate {
        line: usize,
        column: usize,
        offset: usize,
        message: String,
    },

    #[error("Variable not provided: {0}")]
    MissingVariable(String),

    #[error("Invalid identifier: {0:?} (expected uppercase letters, digits and underscores)")]
    InvalidIdentifier(String),

    #[error("Invalid variable value for {variable}: {message}")]
    InvalidVariable { variable: String, message: String },

    #[error("Invalid manifest {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("Unsupported values file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Output already exists at path: {0}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl TemplateError {
    /// Whether the error comes from the template text itself.
    pub fn is_template_error(&self) -> bool {
        matches!(self, Self::MalformedTemplate { .. } | Self::NotFound(_))
    }

    /// Whether the error means the provided variables were insufficient or invalid.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::MissingVariable(_) | Self::InvalidIdentifier(_) | Self::InvalidVariable { .. }
        )
    }
}
