//! Error types for receiver integrations.

use thiserror::Error;

use crate::{http_client::HttpClientPoolError, receivers::template::TemplateServiceError};

/// Errors that can occur while building receivers or delivering
/// notifications.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// An error related to invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error while rendering a notification template.
    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateServiceError),

    /// The delivery attempt failed after exhausting retries.
    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    /// An internal error that should not occur under normal circumstances.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// An error originating from the HTTP client pool.
    #[error("HTTP client error")]
    HttpClientError(#[from] HttpClientPoolError),

    /// An error from the underlying `reqwest` or `reqwest_middleware`
    /// libraries.
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest_middleware::Error),
}
