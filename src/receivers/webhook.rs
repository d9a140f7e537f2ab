//! Generic webhook receiver with optional request signing.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{
    Method,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use reqwest_middleware::ClientWithMiddleware;
use sha2::Sha256;
use url::Url;

use crate::{
    models::{notification::NotificationMessage, receiver::WebhookConfig},
    receivers::{
        Notification, error::ReceiverError, template::TemplateService, traits::Integration,
    },
};

type HmacSha256 = Hmac<Sha256>;

/// Delivers notifications to an HTTP endpoint as JSON.
///
/// The request body is the full notification payload plus the rendered
/// `title` and `body` strings. When a secret is configured, the body is
/// signed with HMAC-SHA256 and the hex signature travels in the
/// `x-herald-signature` header alongside `x-herald-timestamp`.
pub struct WebhookIntegration {
    url: Url,
    method: Option<String>,
    secret: Option<String>,
    headers: HashMap<String, String>,
    message: NotificationMessage,
    http_client: Arc<ClientWithMiddleware>,
    template_service: Arc<TemplateService>,
}

impl WebhookIntegration {
    /// Creates a new `WebhookIntegration` from its configuration, a pooled
    /// HTTP client and the shared template service.
    pub fn new(
        config: WebhookConfig,
        http_client: Arc<ClientWithMiddleware>,
        template_service: Arc<TemplateService>,
    ) -> Self {
        let mut headers = config.headers.unwrap_or_default();
        if !headers.contains_key("Content-Type") {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        Self {
            url: config.url,
            method: config.method,
            secret: config.secret,
            headers,
            message: config.message,
            http_client,
            template_service,
        }
    }

    /// Signs a serialized payload, returning the hex signature and the
    /// timestamp that was folded into it.
    fn sign_payload(&self, secret: &str, body: &str) -> Result<(String, String), ReceiverError> {
        // Explicitly reject empty secret, because `HmacSha256::new_from_slice`
        // currently allows empty secrets
        if secret.is_empty() {
            return Err(ReceiverError::ConfigError("Invalid secret: cannot be empty.".to_string()));
        }

        let timestamp = Utc::now().timestamp_millis();

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ReceiverError::ConfigError(format!("Invalid secret: {e}")))?;

        let message = format!("{body}{timestamp}");
        mac.update(message.as_bytes());

        let signature = hex::encode(mac.finalize().into_bytes());

        Ok((signature, timestamp.to_string()))
    }

    /// Sends a JSON payload to the configured endpoint.
    async fn post_json(&self, payload: &serde_json::Value) -> Result<(), ReceiverError> {
        let method = match &self.method {
            Some(m) => Method::from_bytes(m.as_bytes()).unwrap_or(Method::POST),
            None => Method::POST,
        };

        let body = serde_json::to_string(payload).map_err(|e| {
            ReceiverError::InternalError(format!("Failed to serialize payload: {e}"))
        })?;

        let mut headers = HeaderMap::new();
        for (key, value) in &self.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| ReceiverError::ConfigError(format!("Invalid header name: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ReceiverError::ConfigError(format!("Invalid header value: {e}")))?;
            headers.insert(header_name, header_value);
        }

        if let Some(secret) = &self.secret {
            let (signature, timestamp) = self.sign_payload(secret, &body)?;
            headers.insert(
                HeaderName::from_static("x-herald-signature"),
                HeaderValue::from_str(&signature).map_err(|e| {
                    ReceiverError::NotifyFailed(format!("Invalid signature value: {e}"))
                })?,
            );
            headers.insert(
                HeaderName::from_static("x-herald-timestamp"),
                HeaderValue::from_str(&timestamp).map_err(|e| {
                    ReceiverError::NotifyFailed(format!("Invalid timestamp value: {e}"))
                })?,
            );
        }

        let response = self
            .http_client
            .request(method, self.url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReceiverError::NotifyFailed(format!(
                "Webhook request failed with status: {status}"
            )));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Integration for WebhookIntegration {
    async fn notify(&self, notification: &Notification) -> Result<(), ReceiverError> {
        let context = notification.context()?;

        let rendered_title = self.template_service.render(&self.message.title, context.clone())?;
        let rendered_body = self.template_service.render(&self.message.body, context.clone())?;

        // The endpoint receives the structured notification alongside the
        // rendered message parts.
        let mut payload = context;
        payload["title"] = serde_json::Value::String(rendered_title);
        payload["body"] = serde_json::Value::String(rendered_body);

        self.post_json(&payload).await
    }
}
