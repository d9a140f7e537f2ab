//! # Receiver registry
//!
//! This module turns validated receiver configurations into live delivery
//! channels and routes notifications to them by name.
//!
//! - **`ReceiverRegistry`**: holds one [`Integration`] per configured
//!   receiver, built at startup from `receivers.yaml`.
//! - **`Integration` trait**: the uniform delivery interface implemented by
//!   the webhook and stdout channels.
//!
//! The send stage of the notification pipeline looks up the target receiver
//! here after the dedup stage has decided a send is warranted.

use std::{collections::HashMap, sync::Arc};

pub mod error;
mod payload;
mod stdout;
pub mod template;
mod traits;
mod webhook;

use error::ReceiverError;
pub use payload::{Notification, NotificationAlert};
pub use stdout::StdoutIntegration;
pub use traits::Integration;
pub use webhook::WebhookIntegration;

use crate::{
    http_client::HttpClientPool,
    models::receiver::{ReceiverConfig, ReceiverTypeConfig},
    receivers::template::TemplateService,
};

/// A registry of live receiver integrations keyed by receiver name.
pub struct ReceiverRegistry {
    receivers: HashMap<String, Box<dyn Integration>>,
}

impl ReceiverRegistry {
    /// Builds integrations for every configured receiver.
    ///
    /// Receiver names must be unique; webhook receivers obtain an HTTP
    /// client from the shared pool according to their retry policy.
    pub async fn new(
        configs: &[ReceiverConfig],
        client_pool: Arc<HttpClientPool>,
    ) -> Result<Self, ReceiverError> {
        let template_service = Arc::new(TemplateService::new());
        let mut receivers: HashMap<String, Box<dyn Integration>> = HashMap::new();

        for config in configs {
            if receivers.contains_key(&config.name) {
                return Err(ReceiverError::ConfigError(format!(
                    "Duplicate receiver name: '{}'",
                    config.name
                )));
            }
            let integration: Box<dyn Integration> = match &config.config {
                ReceiverTypeConfig::Stdout(c) =>
                    Box::new(StdoutIntegration::new(c.clone(), template_service.clone())),
                ReceiverTypeConfig::Webhook(c) => {
                    let http_client = client_pool.get_or_create(&c.retry_policy).await?;
                    Box::new(WebhookIntegration::new(
                        c.clone(),
                        http_client,
                        template_service.clone(),
                    ))
                }
            };
            receivers.insert(config.name.clone(), integration);
        }

        Ok(Self { receivers })
    }

    /// Creates a registry directly from integrations, bypassing config.
    #[cfg(test)]
    pub fn with_integrations(receivers: HashMap<String, Box<dyn Integration>>) -> Self {
        Self { receivers }
    }

    /// Delivers a notification through the named receiver.
    pub async fn notify(
        &self,
        receiver: &str,
        notification: &Notification,
    ) -> Result<(), ReceiverError> {
        let integration = self.receivers.get(receiver).ok_or_else(|| {
            ReceiverError::ConfigError(format!("Receiver '{receiver}' not found"))
        })?;
        integration.notify(notification).await
    }

    /// The names of all registered receivers.
    pub fn receiver_names(&self) -> Vec<String> {
        self.receivers.keys().cloned().collect()
    }

    /// The number of registered receivers.
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    /// Returns true if no receivers are registered.
    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}
