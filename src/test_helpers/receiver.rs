use url::Url;

use crate::{
    config::HttpRetryConfig,
    models::{
        notification::NotificationMessage,
        receiver::{ReceiverConfig, ReceiverTypeConfig, StdoutConfig, WebhookConfig},
    },
};

/// A builder for creating `ReceiverConfig` instances for testing.
pub struct ReceiverBuilder {
    name: String,
    config: ReceiverTypeConfig,
}

impl ReceiverBuilder {
    /// Creates a new `ReceiverBuilder` with the given name, defaulting to a
    /// localhost webhook.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            config: ReceiverTypeConfig::Webhook(WebhookConfig {
                url: Url::parse("http://localhost").unwrap(),
                method: None,
                secret: None,
                headers: None,
                message: default_message(),
                retry_policy: HttpRetryConfig::default(),
            }),
        }
    }

    /// Sets the receiver to use webhook configuration.
    pub fn webhook_config(mut self, url: &str) -> Self {
        self.config = ReceiverTypeConfig::Webhook(WebhookConfig {
            url: Url::parse(url).unwrap(),
            method: None,
            secret: None,
            headers: None,
            message: default_message(),
            retry_policy: HttpRetryConfig::default(),
        });
        self
    }

    /// Sets the signing secret on a webhook configuration. No-op for other
    /// receiver types.
    pub fn secret(mut self, secret: &str) -> Self {
        if let ReceiverTypeConfig::Webhook(config) = &mut self.config {
            config.secret = Some(secret.to_string());
        }
        self
    }

    /// Sets the retry policy on a webhook configuration. No-op for other
    /// receiver types.
    pub fn retry_policy(mut self, policy: HttpRetryConfig) -> Self {
        if let ReceiverTypeConfig::Webhook(config) = &mut self.config {
            config.retry_policy = policy;
        }
        self
    }

    /// Sets the message templates on a webhook configuration. No-op for
    /// other receiver types.
    pub fn message(mut self, title: &str, body: &str) -> Self {
        if let ReceiverTypeConfig::Webhook(config) = &mut self.config {
            config.message =
                NotificationMessage { title: title.to_string(), body: body.to_string() };
        }
        self
    }

    /// Sets the receiver to use stdout configuration.
    pub fn stdout_config(mut self, message: Option<NotificationMessage>) -> Self {
        self.config = ReceiverTypeConfig::Stdout(StdoutConfig { message });
        self
    }

    /// Builds the `ReceiverConfig`.
    pub fn build(self) -> ReceiverConfig {
        ReceiverConfig { name: self.name, config: self.config }
    }
}

fn default_message() -> NotificationMessage {
    NotificationMessage {
        title: "Alert: {{ alerts | length }} event(s)".to_string(),
        body: "Group {{ group_key }} has {{ alerts | length }} alert(s).".to_string(),
    }
}
