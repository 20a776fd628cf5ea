//! Error types for dnskeeper.

use thiserror::Error;

/// Result type alias for dnskeeper.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// Provider-specific error.
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    /// The provider has no API for the requested operation.
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: &'static str,
    },

    /// IP detection error.
    #[error("IP detection failed: {0}")]
    IpDetection(String),

    /// Hostname resolution error.
    #[error("Failed to resolve {hostname}: {message}")]
    Resolve { hostname: String, message: String },

    /// Notification sink error.
    #[error("Notification error ({sink}): {message}")]
    Notify { sink: String, message: String },

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(String),

    /// The supervisor lost contact with its loops.
    #[error("Supervisor error: {0}")]
    Supervisor(String),

    /// Too many domain loops failed.
    #[error("Domain loops failed {failures} times, giving up")]
    CrashBudgetExhausted { failures: usize },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DdnsError {
    pub(crate) fn provider(provider: &str, message: impl Into<String>) -> Self {
        DdnsError::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn notify(sink: &str, message: impl Into<String>) -> Self {
        DdnsError::Notify {
            sink: sink.to_string(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::Network(e.to_string())
    }
}

impl From<toml::de::Error> for DdnsError {
    fn from(e: toml::de::Error) -> Self {
        DdnsError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for DdnsError {
    fn from(e: toml::ser::Error) -> Self {
        DdnsError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for DdnsError {
    fn from(e: serde_json::Error) -> Self {
        DdnsError::Serialization(e.to_string())
    }
}

impl From<handlebars::TemplateError> for DdnsError {
    fn from(e: handlebars::TemplateError) -> Self {
        DdnsError::Template(e.to_string())
    }
}

impl From<handlebars::RenderError> for DdnsError {
    fn from(e: handlebars::RenderError) -> Self {
        DdnsError::Template(e.to_string())
    }
}
