//! This module defines the data structures for receiver configurations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{
    config::HttpRetryConfig,
    loader::{Loadable, LoaderError},
    models::notification::NotificationMessage,
};

/// Configuration for a generic webhook receiver.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct WebhookConfig {
    /// The URL of the webhook endpoint.
    pub url: Url,
    /// The HTTP method to use for the webhook (e.g., "POST", "PUT").
    pub method: Option<String>,
    /// An optional secret for signing webhook request bodies.
    pub secret: Option<String>,
    /// Optional custom headers to include in the webhook request.
    pub headers: Option<HashMap<String, String>>,
    /// The message content for the notification.
    pub message: NotificationMessage,
    /// The retry policy configuration for HTTP requests.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// Configuration for a stdout receiver.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub struct StdoutConfig {
    /// The optional message content for the notification.
    /// If not provided, the full notification payload is serialized to JSON.
    pub message: Option<NotificationMessage>,
}

/// The type of receiver configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverTypeConfig {
    /// A generic webhook receiver.
    Webhook(WebhookConfig),
    /// A stdout receiver.
    Stdout(StdoutConfig),
}

/// Error types for receiver configuration validation.
#[derive(Debug, Clone, Error)]
pub enum ReceiverTypeConfigError {
    /// Error for an empty title in the webhook message.
    #[error("Webhook title cannot be empty.")]
    EmptyTitle,

    /// Error for an empty signing secret.
    #[error("Webhook secret, when provided, cannot be empty.")]
    EmptySecret,
}

impl ReceiverTypeConfig {
    /// Validates the receiver configuration.
    pub fn validate(&self) -> Result<(), ReceiverTypeConfigError> {
        match self {
            ReceiverTypeConfig::Webhook(config) => {
                if config.message.title.is_empty() {
                    return Err(ReceiverTypeConfigError::EmptyTitle);
                }
                if config.secret.as_deref() == Some("") {
                    return Err(ReceiverTypeConfigError::EmptySecret);
                }
                Ok(())
            }
            // Standard output receiver requires no validation.
            ReceiverTypeConfig::Stdout(_) => Ok(()),
        }
    }
}

/// Represents a single receiver configuration from the YAML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReceiverConfig {
    /// The unique name of the receiver.
    pub name: String,

    /// The specific configuration for the receiver type.
    #[serde(flatten)]
    pub config: ReceiverTypeConfig,
}

/// Errors that can occur during receiver config processing.
#[derive(Debug, Error)]
pub enum ReceiverConfigError {
    /// An error occurred during the loading process.
    #[error("Failed to load receiver configuration.")]
    Loader(#[from] LoaderError),

    /// An error occurred during validation.
    #[error("Failed to validate receiver configuration.")]
    Validation(#[from] ReceiverTypeConfigError),
}

impl Loadable for ReceiverConfig {
    type Error = ReceiverConfigError;

    const KEY: &'static str = "receivers";

    fn validate(&mut self) -> Result<(), Self::Error> {
        self.config.validate().map_err(ReceiverConfigError::Validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification_message() -> NotificationMessage {
        NotificationMessage { title: "Test Title".to_string(), body: "Test Body".to_string() }
    }

    #[test]
    fn test_validate_webhook_ok() {
        let config = ReceiverTypeConfig::Webhook(WebhookConfig {
            url: Url::parse("http://localhost/webhook").unwrap(),
            message: notification_message(),
            method: None,
            secret: None,
            headers: None,
            retry_policy: HttpRetryConfig::default(),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_webhook_empty_title() {
        let config = ReceiverTypeConfig::Webhook(WebhookConfig {
            url: Url::parse("http://localhost/webhook").unwrap(),
            message: NotificationMessage { title: String::new(), body: "b".to_string() },
            method: None,
            secret: None,
            headers: None,
            retry_policy: HttpRetryConfig::default(),
        });
        assert!(matches!(config.validate(), Err(ReceiverTypeConfigError::EmptyTitle)));
    }

    #[test]
    fn test_validate_webhook_empty_secret() {
        let config = ReceiverTypeConfig::Webhook(WebhookConfig {
            url: Url::parse("http://localhost/webhook").unwrap(),
            message: notification_message(),
            method: None,
            secret: Some(String::new()),
            headers: None,
            retry_policy: HttpRetryConfig::default(),
        });
        assert!(matches!(config.validate(), Err(ReceiverTypeConfigError::EmptySecret)));
    }

    #[test]
    fn test_validate_stdout_ok() {
        let config = ReceiverTypeConfig::Stdout(StdoutConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_webhook_receiver_from_yaml() {
        let yaml = r#"
name: ops
webhook:
  url: "http://localhost:9093/alerts"
  method: "POST"
  message:
    title: "Alert"
    body: "{{ group_key }}"
"#;
        let receiver: ReceiverConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(receiver.name, "ops");
        assert!(matches!(receiver.config, ReceiverTypeConfig::Webhook(_)));
    }
}
