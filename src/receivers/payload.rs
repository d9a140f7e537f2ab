//! The notification payload handed to receiver integrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    models::{Alert, AlertStatus, LabelSet},
    receivers::error::ReceiverError,
};

/// A single alert as it appears inside a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAlert {
    /// Whether this alert was firing or resolved at send time.
    pub status: AlertStatus,
    /// Identifying labels.
    pub labels: LabelSet,
    /// Non-identifying metadata.
    pub annotations: LabelSet,
    /// When the condition started holding.
    pub starts_at: DateTime<Utc>,
    /// When the condition stopped holding, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    /// Link back to the producing rule, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_url: Option<Url>,
    /// Hex-encoded series fingerprint.
    pub fingerprint: String,
}

/// A grouped notification about one or more alerts, in the widely used
/// alerting webhook shape. Doubles as the template rendering context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// The receiver this notification is addressed to.
    pub receiver: String,
    /// Firing if any member alert is still firing, resolved otherwise.
    pub status: AlertStatus,
    /// Hex-encoded group key.
    pub group_key: String,
    /// The grouping labels shared by all member alerts.
    pub group_labels: LabelSet,
    /// Labels common to every member alert.
    pub common_labels: LabelSet,
    /// The member alerts, each with its own status.
    pub alerts: Vec<NotificationAlert>,
}

impl Notification {
    /// Builds a notification from an alert batch.
    pub fn from_alerts(
        receiver: impl Into<String>,
        group_key: u64,
        group_labels: LabelSet,
        alerts: &[Alert],
        now: DateTime<Utc>,
    ) -> Self {
        let common_labels = alerts
            .iter()
            .map(|a| a.labels.clone())
            .reduce(|acc, labels| acc.intersection(&labels))
            .unwrap_or_default();

        let any_firing = alerts.iter().any(|a| !a.is_resolved_at(now));
        let status = if any_firing { AlertStatus::Firing } else { AlertStatus::Resolved };

        let alerts = alerts
            .iter()
            .map(|alert| NotificationAlert {
                status: alert.status_at(now),
                labels: alert.labels.clone(),
                annotations: alert.annotations.clone(),
                starts_at: alert.starts_at,
                ends_at: alert.ends_at,
                generator_url: alert.generator_url.clone(),
                fingerprint: format!("{:016x}", alert.fingerprint()),
            })
            .collect();

        Self {
            receiver: receiver.into(),
            status,
            group_key: format!("{group_key:016x}"),
            group_labels,
            common_labels,
            alerts,
        }
    }

    /// Serializes the notification into a template rendering context.
    pub fn context(&self) -> Result<serde_json::Value, ReceiverError> {
        serde_json::to_value(self).map_err(|e| {
            ReceiverError::InternalError(format!("Failed to serialize notification: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::AlertBuilder;

    #[test]
    fn status_is_firing_when_any_alert_fires() {
        let now = Utc::now();
        let alerts = vec![
            AlertBuilder::new().label("alertname", "X").label("instance", "a").build(),
            AlertBuilder::new()
                .label("alertname", "X")
                .label("instance", "b")
                .ends_at(now)
                .build(),
        ];
        let notification =
            Notification::from_alerts("ops", 7, LabelSet::default(), &alerts, now);
        assert_eq!(notification.status, AlertStatus::Firing);
        assert_eq!(notification.alerts[0].status, AlertStatus::Firing);
        assert_eq!(notification.alerts[1].status, AlertStatus::Resolved);
    }

    #[test]
    fn status_is_resolved_when_all_alerts_resolved() {
        let now = Utc::now();
        let alerts = vec![AlertBuilder::new().label("alertname", "X").ends_at(now).build()];
        let notification =
            Notification::from_alerts("ops", 7, LabelSet::default(), &alerts, now);
        assert_eq!(notification.status, AlertStatus::Resolved);
    }

    #[test]
    fn common_labels_are_the_shared_subset() {
        let now = Utc::now();
        let alerts = vec![
            AlertBuilder::new().label("alertname", "X").label("instance", "a").build(),
            AlertBuilder::new().label("alertname", "X").label("instance", "b").build(),
        ];
        let notification =
            Notification::from_alerts("ops", 7, LabelSet::default(), &alerts, now);
        assert_eq!(notification.common_labels, LabelSet::from([("alertname", "X")]));
    }

    #[test]
    fn context_exposes_webhook_shape() {
        let now = Utc::now();
        let alerts = vec![AlertBuilder::new().label("alertname", "X").build()];
        let notification = Notification::from_alerts(
            "ops",
            0xabcd,
            LabelSet::from([("alertname", "X")]),
            &alerts,
            now,
        );
        let context = notification.context().unwrap();
        assert_eq!(context["receiver"], "ops");
        assert_eq!(context["status"], "firing");
        assert_eq!(context["group_key"], "000000000000abcd");
        assert_eq!(context["alerts"].as_array().unwrap().len(), 1);
    }
}
