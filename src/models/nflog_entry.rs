//! Durable notification log entries.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The record of the last confirmed notification for a (receiver, group key)
/// pair.
///
/// The firing and resolved sets hold exactly the alert fingerprints contained
/// in the last successful send. Updates replace both sets wholesale rather
/// than accumulating, so the entry always answers "what was sent last", not
/// "what was ever sent".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    /// Fingerprints of the alerts that were firing in the last send.
    pub firing: BTreeSet<u64>,
    /// Fingerprints of the alerts that were resolved in the last send.
    pub resolved: BTreeSet<u64>,
    /// When the last send was confirmed.
    pub timestamp: DateTime<Utc>,
}

impl NotificationLogEntry {
    /// Creates an entry recording a confirmed send at `timestamp`.
    pub fn new(
        firing: BTreeSet<u64>,
        resolved: BTreeSet<u64>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self { firing, resolved, timestamp }
    }

    /// Returns true iff every fingerprint in `candidate` was part of the
    /// firing set of the last send. An empty candidate set is trivially a
    /// subset.
    pub fn is_firing_subset(&self, candidate: &BTreeSet<u64>) -> bool {
        candidate.is_subset(&self.firing)
    }

    /// Returns true iff every fingerprint in `candidate` was part of the
    /// resolved set of the last send.
    pub fn is_resolved_subset(&self, candidate: &BTreeSet<u64>) -> bool {
        candidate.is_subset(&self.resolved)
    }
}
