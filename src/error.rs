//! Error types for the model layer

use thiserror::Error;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Model layer errors
///
/// Soft validation failures are not errors; they are returned as
/// [`ValidateError`](crate::validators::ValidateError) data.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Cannot convert to {kind}: {message}")]
    Conversion { kind: &'static str, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn conversion(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Conversion {
            kind,
            message: message.into(),
        }
    }
}
