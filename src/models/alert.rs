//! Alert state produced by rule evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::labels::LabelSet;

/// The observable status of an alert at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// The condition still holds.
    Firing,
    /// The condition stopped holding at `ends_at`.
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Firing => write!(f, "firing"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// A single alert state transition emitted by the evaluation engine.
///
/// Alerts are immutable once created. A newer alert with the same fingerprint
/// supersedes the older one; the dispatcher keeps only the latest per
/// fingerprint within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Identifying labels. The fingerprint is derived from these alone.
    pub labels: LabelSet,
    /// Non-identifying metadata (summary, description, runbook links).
    #[serde(default)]
    pub annotations: LabelSet,
    /// When the condition started holding.
    pub starts_at: DateTime<Utc>,
    /// When the condition stopped holding. `None` means still firing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    /// Link back to the entity that produced this alert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_url: Option<Url>,
}

impl Alert {
    /// The stable identity of this alert's series.
    pub fn fingerprint(&self) -> u64 {
        self.labels.fingerprint()
    }

    /// Returns true if the alert is resolved as of `now`.
    pub fn is_resolved_at(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_some_and(|ends| ends <= now)
    }

    /// The status of the alert as of `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> AlertStatus {
        if self.is_resolved_at(now) {
            AlertStatus::Resolved
        } else {
            AlertStatus::Firing
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::test_helpers::AlertBuilder;

    #[test]
    fn status_is_firing_without_ends_at() {
        let alert = AlertBuilder::new().label("alertname", "X").build();
        assert_eq!(alert.status_at(Utc::now()), AlertStatus::Firing);
    }

    #[test]
    fn status_respects_future_ends_at() {
        let now = Utc::now();
        let alert =
            AlertBuilder::new().label("alertname", "X").ends_at(now + Duration::minutes(5)).build();
        assert_eq!(alert.status_at(now), AlertStatus::Firing);
        assert_eq!(alert.status_at(now + Duration::minutes(6)), AlertStatus::Resolved);
    }

    #[test]
    fn fingerprint_ignores_annotations_and_timing() {
        let a = AlertBuilder::new().label("alertname", "X").annotation("summary", "one").build();
        let b = AlertBuilder::new()
            .label("alertname", "X")
            .annotation("summary", "two")
            .ends_at(Utc::now())
            .build();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
