use chrono::{DateTime, Utc};
use url::Url;

use crate::models::{Alert, LabelSet};

/// A builder for creating `Alert` instances for testing.
///
/// Alerts default to firing (no `ends_at`) and starting now.
#[derive(Debug, Default, Clone)]
pub struct AlertBuilder {
    labels: LabelSet,
    annotations: LabelSet,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    generator_url: Option<Url>,
}

impl AlertBuilder {
    /// Creates a new `AlertBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identifying label.
    pub fn label(mut self, name: &str, value: &str) -> Self {
        self.labels.insert(name, value);
        self
    }

    /// Adds a non-identifying annotation.
    pub fn annotation(mut self, name: &str, value: &str) -> Self {
        self.annotations.insert(name, value);
        self
    }

    /// Sets when the alert started firing.
    pub fn starts_at(mut self, starts_at: DateTime<Utc>) -> Self {
        self.starts_at = Some(starts_at);
        self
    }

    /// Marks the alert as resolved at the given instant.
    pub fn ends_at(mut self, ends_at: DateTime<Utc>) -> Self {
        self.ends_at = Some(ends_at);
        self
    }

    /// Sets the generator URL.
    pub fn generator_url(mut self, url: &str) -> Self {
        self.generator_url = Some(Url::parse(url).unwrap());
        self
    }

    /// Builds the `Alert`.
    pub fn build(self) -> Alert {
        Alert {
            labels: self.labels,
            annotations: self.annotations,
            starts_at: self.starts_at.unwrap_or_else(Utc::now),
            ends_at: self.ends_at,
            generator_url: self.generator_url,
        }
    }
}
