use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::config::helpers::{deserialize_duration_from_seconds, serialize_duration_to_seconds};

fn default_group_by() -> Vec<String> {
    vec!["alertname".to_string()]
}

fn default_group_window() -> Duration {
    Duration::from_secs(30)
}

fn default_repeat_interval() -> Duration {
    // 4 hours
    Duration::from_secs(4 * 60 * 60)
}

fn default_pipeline_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_group_retention() -> Duration {
    Duration::from_secs(60 * 60)
}

/// Settings for alert grouping and notification dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Label names used to partition alerts into notification groups.
    /// Alerts agreeing on all of these labels share one group per receiver.
    #[serde(default = "default_group_by")]
    pub group_by: Vec<String>,

    /// How long a fresh group buffers alerts before its first flush, letting
    /// related alerts share one notification.
    #[serde(
        default = "default_group_window",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        rename = "group_window_secs"
    )]
    pub group_window: Duration,

    /// How long after a successful send a still-firing group is re-notified.
    #[serde(
        default = "default_repeat_interval",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        rename = "repeat_interval_secs"
    )]
    pub repeat_interval: Duration,

    /// Upper bound on one pipeline invocation, covering the cluster wait,
    /// the dedup check and the send.
    #[serde(
        default = "default_pipeline_timeout",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        rename = "pipeline_timeout_secs"
    )]
    pub pipeline_timeout: Duration,

    /// How long an idle group (no alerts, no pending flush) is kept before
    /// its in-memory state and lock are swept.
    #[serde(
        default = "default_group_retention",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        rename = "group_retention_secs"
    )]
    pub group_retention: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            group_by: default_group_by(),
            group_window: default_group_window(),
            repeat_interval: default_repeat_interval(),
            pipeline_timeout: default_pipeline_timeout(),
            group_retention: default_group_retention(),
        }
    }
}

fn default_log_retention() -> Duration {
    // 120 hours, mirroring common alerting defaults
    Duration::from_secs(120 * 60 * 60)
}

fn default_maintenance_interval() -> Duration {
    Duration::from_secs(15 * 60)
}

/// Settings for the durable notification log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationLogConfig {
    /// How long a fully-resolved log entry is retained before garbage
    /// collection. Entries with firing alerts are never collected.
    #[serde(
        default = "default_log_retention",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        rename = "retention_secs"
    )]
    pub retention: Duration,

    /// How often the maintenance loop runs garbage collection.
    #[serde(
        default = "default_maintenance_interval",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        rename = "maintenance_interval_secs"
    )]
    pub maintenance_interval: Duration,
}

impl Default for NotificationLogConfig {
    fn default() -> Self {
        Self {
            retention: default_log_retention(),
            maintenance_interval: default_maintenance_interval(),
        }
    }
}

fn default_evaluation_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_watchdog_enabled() -> bool {
    true
}

/// Settings for the rule evaluation loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationConfig {
    /// How often the scheduler ticks. Every tick checks the cluster gate
    /// before running the evaluator.
    #[serde(
        default = "default_evaluation_interval",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        rename = "interval_secs"
    )]
    pub interval: Duration,

    /// Whether the built-in always-firing watchdog alert is emitted. It
    /// proves the evaluation-to-notification path end to end.
    #[serde(default = "default_watchdog_enabled")]
    pub watchdog_enabled: bool,

    /// Extra labels attached to the watchdog alert.
    #[serde(default)]
    pub watchdog_labels: HashMap<String, String>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            interval: default_evaluation_interval(),
            watchdog_enabled: default_watchdog_enabled(),
            watchdog_labels: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.group_by, vec!["alertname".to_string()]);
        assert_eq!(config.group_window, Duration::from_secs(30));
        assert_eq!(config.repeat_interval, Duration::from_secs(14_400));
        assert_eq!(config.pipeline_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_dispatch_from_yaml() {
        let yaml = r#"
group_by: ["alertname", "cluster"]
group_window_secs: 10
repeat_interval_secs: 3600
"#;
        let config: DispatchConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.group_by.len(), 2);
        assert_eq!(config.group_window, Duration::from_secs(10));
        assert_eq!(config.repeat_interval, Duration::from_secs(3600));
        // Unspecified fields fall back to defaults.
        assert_eq!(config.pipeline_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_notification_log_defaults() {
        let config = NotificationLogConfig::default();
        assert_eq!(config.retention, Duration::from_secs(432_000));
        assert_eq!(config.maintenance_interval, Duration::from_secs(900));
    }
}
