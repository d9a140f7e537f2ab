//! The rule evaluation boundary.
//!
//! Rule storage and scheduling machinery live outside this crate; the engine
//! only consumes the [`RuleEvaluator`] interface. The built-in
//! [`WatchdogEvaluator`] emits a permanently firing heartbeat alert, which
//! exercises the full evaluation-to-notification path in any deployment.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::models::{Alert, LabelSet};

/// Custom error type for rule evaluation.
#[derive(Error, Debug)]
pub enum EvaluatorError {
    /// Error from the underlying rule machinery.
    #[error("Rule source error: {0}")]
    RuleSource(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// The evaluator could not produce a result for this cycle.
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),
}

/// A source of alert states, queried once per evaluation cycle.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    /// Evaluates all rules as of `now` and returns the resulting alert
    /// states, both firing and resolved.
    async fn evaluate(&self, now: DateTime<Utc>) -> Result<Vec<Alert>, EvaluatorError>;
}

/// An evaluator producing a single, permanently firing heartbeat alert.
///
/// Downstream monitoring treats the absence of this notification as an
/// outage signal, so the alert must fire on every cycle.
pub struct WatchdogEvaluator {
    labels: LabelSet,
    started_at: DateTime<Utc>,
}

impl WatchdogEvaluator {
    /// Creates a watchdog evaluator carrying `extra_labels` in addition to
    /// the fixed `alertname`.
    pub fn new(extra_labels: &HashMap<String, String>) -> Self {
        let mut labels = LabelSet::new();
        for (name, value) in extra_labels {
            labels.insert(name.clone(), value.clone());
        }
        // The alertname is fixed; configured labels may not override it.
        labels.insert("alertname", "Watchdog");
        Self { labels, started_at: Utc::now() }
    }
}

#[async_trait]
impl RuleEvaluator for WatchdogEvaluator {
    async fn evaluate(&self, _now: DateTime<Utc>) -> Result<Vec<Alert>, EvaluatorError> {
        Ok(vec![Alert {
            labels: self.labels.clone(),
            annotations: LabelSet::from([(
                "summary",
                "Always-firing heartbeat proving the alerting pipeline is functional.",
            )]),
            starts_at: self.started_at,
            ends_at: None,
            generator_url: None,
        }])
    }
}
