//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while validating or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A repository identifier was not in `owner/name` form.
    #[error("Invalid repository identifier '{value}': expected owner/name")]
    InvalidRepo { value: String },

    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML content.
    #[error("Failed to parse user map in '{path}': {source}")]
    TomlError {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
