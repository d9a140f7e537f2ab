//! Shared state threaded through a single pipeline invocation.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::models::LabelSet;

/// Per-invocation context handed to every stage of the notification pipeline.
///
/// The decision instant `now` is fixed when the context is created so that
/// every stage partitions the batch into firing and resolved sets against the
/// same clock reading.
#[derive(Debug)]
pub struct PipelineContext {
    /// Name of the receiver this invocation delivers to.
    pub receiver: String,
    /// Grouping fingerprint of the alert batch.
    pub group_key: u64,
    /// Labels shared by construction across the group.
    pub group_labels: LabelSet,
    /// Cooperative cancellation signal for long-running stages.
    pub cancellation_token: CancellationToken,
    /// Decision instant for status partitioning and log timestamps.
    pub now: DateTime<Utc>,
    annotations: Vec<String>,
}

impl PipelineContext {
    /// Creates a context for one pipeline invocation, pinning `now` to the
    /// current instant.
    pub fn new(
        receiver: impl Into<String>,
        group_key: u64,
        group_labels: LabelSet,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            receiver: receiver.into(),
            group_key,
            group_labels,
            cancellation_token,
            now: Utc::now(),
            annotations: Vec::new(),
        }
    }

    /// Appends a human-readable note about something a stage did, for
    /// instance how long the wait stage slept.
    pub fn annotate(&mut self, note: impl Into<String>) {
        self.annotations.push(note.into());
    }

    /// Notes accumulated by stages during this invocation.
    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }
}
