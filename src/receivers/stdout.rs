use std::sync::Arc;

use crate::{
    models::receiver::StdoutConfig,
    receivers::{
        Notification, error::ReceiverError, template::TemplateService, traits::Integration,
    },
};

/// A receiver that prints notifications to standard output. Useful for local
/// runs and smoke tests.
pub struct StdoutIntegration {
    config: StdoutConfig,
    template_service: Arc<TemplateService>,
}

impl StdoutIntegration {
    /// Creates a new `StdoutIntegration` with the given configuration and
    /// template service.
    pub fn new(config: StdoutConfig, template_service: Arc<TemplateService>) -> Self {
        Self { config, template_service }
    }
}

#[async_trait::async_trait]
impl Integration for StdoutIntegration {
    async fn notify(&self, notification: &Notification) -> Result<(), ReceiverError> {
        let context = notification.context()?;

        if let Some(message) = &self.config.message {
            let rendered_title = self.template_service.render(&message.title, context.clone())?;
            let rendered_body = self.template_service.render(&message.body, context)?;
            println!(
                "=== Notification: {} ===\n{}\n{}\n",
                notification.receiver, rendered_title, rendered_body
            );
        } else {
            println!("=== Notification: {} ===\n{}\n", notification.receiver, context);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        models::{LabelSet, notification::NotificationMessage},
        test_helpers::AlertBuilder,
    };

    #[tokio::test]
    async fn test_notify_renders_message() {
        let config = StdoutConfig {
            message: Some(NotificationMessage {
                title: "{{ receiver }}".to_string(),
                body: "{{ status }}".to_string(),
            }),
        };
        let integration = StdoutIntegration::new(config, Arc::new(TemplateService::new()));
        let alerts = vec![AlertBuilder::new().label("alertname", "X").build()];
        let notification =
            Notification::from_alerts("console", 1, LabelSet::default(), &alerts, Utc::now());

        assert!(integration.notify(&notification).await.is_ok());
    }

    #[tokio::test]
    async fn test_notify_without_message_dumps_context() {
        let integration =
            StdoutIntegration::new(StdoutConfig::default(), Arc::new(TemplateService::new()));
        let alerts = vec![AlertBuilder::new().label("alertname", "X").build()];
        let notification =
            Notification::from_alerts("console", 1, LabelSet::default(), &alerts, Utc::now());

        assert!(integration.notify(&notification).await.is_ok());
    }

    #[tokio::test]
    async fn test_notify_fails_on_bad_template() {
        let config = StdoutConfig {
            message: Some(NotificationMessage {
                title: "{{ nonexistent_variable }}".to_string(),
                body: String::new(),
            }),
        };
        let integration = StdoutIntegration::new(config, Arc::new(TemplateService::new()));
        let alerts = vec![AlertBuilder::new().label("alertname", "X").build()];
        let notification =
            Notification::from_alerts("console", 1, LabelSet::default(), &alerts, Utc::now());

        assert!(matches!(
            integration.notify(&notification).await,
            Err(ReceiverError::TemplateError(_))
        ));
    }
}
