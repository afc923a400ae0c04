//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating `scrapegate.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("scope tag must be non-empty ASCII alphanumeric: {0:?}")]
    InvalidTag(String),

    #[error("scope tag declared twice: {0}")]
    DuplicateTag(String),

    #[error("scope {0} needs exactly one of `token` or `token_env`")]
    TokenSource(String),

    #[error("scope {tag}: environment variable {var} is not set")]
    MissingEnv { tag: String, var: String },

    #[error("scope {0}: token is empty")]
    EmptyToken(String),

    #[error("invalid metric name: {0:?}")]
    InvalidMetricName(String),

    #[error("metric {metric}: invalid label name {label:?}")]
    InvalidLabelName { metric: String, label: String },

    #[error("static metric {0} is declared with different kind or help text")]
    ConflictingStaticMetric(String),

    #[error("static metric {0} declares the same label set twice")]
    DuplicateSeries(String),
}
