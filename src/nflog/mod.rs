//! The durable notification log.
//!
//! Every confirmed send is recorded under its (receiver, group key) pair.
//! The dedup stage consults these entries to decide whether a batch still
//! needs sending, which is what makes delivery idempotent across replicas,
//! restarts and retries. Entries are plain JSON values in the key-value
//! store, so any [`KeyValueStore`] backend works.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use chrono::Utc;

use crate::{
    models::NotificationLogEntry,
    persistence::{error::PersistenceError, traits::KeyValueStore},
};

/// Key prefix shared by all notification log entries.
const KEY_PREFIX: &str = "nflog:";

/// Builds the storage key for a (receiver, group key) pair.
fn log_key(receiver: &str, group_key: u64) -> String {
    format!("{KEY_PREFIX}{receiver}:{group_key:016x}")
}

/// Records and queries the last confirmed notification per (receiver, group
/// key).
pub struct NotificationLog<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> NotificationLog<S> {
    /// Creates a notification log over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Retrieves the entry for a (receiver, group key) pair, if any send was
    /// ever confirmed for it.
    pub async fn entry(
        &self,
        receiver: &str,
        group_key: u64,
    ) -> Result<Option<NotificationLogEntry>, PersistenceError> {
        self.store.get_json_state(&log_key(receiver, group_key)).await
    }

    /// Records a confirmed send, replacing the entry's firing and resolved
    /// sets with exactly the fingerprints just sent.
    ///
    /// Must only be called after the receiver acknowledged delivery; an
    /// entry written before a failed send would suppress the retry.
    pub async fn record(
        &self,
        receiver: &str,
        group_key: u64,
        firing: BTreeSet<u64>,
        resolved: BTreeSet<u64>,
    ) -> Result<(), PersistenceError> {
        let entry = NotificationLogEntry::new(firing, resolved, Utc::now());
        tracing::debug!(
            receiver,
            group_key = format_args!("{group_key:016x}"),
            firing = entry.firing.len(),
            resolved = entry.resolved.len(),
            "Recording confirmed notification."
        );
        self.store.set_json_state(&log_key(receiver, group_key), &entry).await
    }

    /// Merges an entry received from another replica, keeping whichever side
    /// has the newer timestamp. Returns true if the remote entry was
    /// applied.
    pub async fn merge(
        &self,
        receiver: &str,
        group_key: u64,
        remote: NotificationLogEntry,
    ) -> Result<bool, PersistenceError> {
        let key = log_key(receiver, group_key);
        let local: Option<NotificationLogEntry> = self.store.get_json_state(&key).await?;

        if let Some(local) = local {
            if local.timestamp >= remote.timestamp {
                return Ok(false);
            }
        }
        self.store.set_json_state(&key, &remote).await?;
        Ok(true)
    }

    /// Deletes entries older than the retention window whose firing set is
    /// empty. An entry with firing alerts is kept regardless of age, since
    /// it still suppresses duplicate sends for an ongoing incident. Returns
    /// the number of entries removed.
    pub async fn gc(&self, retention: Duration) -> Result<usize, PersistenceError> {
        let retention = chrono::Duration::from_std(retention)
            .map_err(|e| PersistenceError::InvalidInput(format!("Invalid retention: {e}")))?;
        let cutoff = Utc::now() - retention;

        let entries: Vec<(String, NotificationLogEntry)> =
            self.store.get_all_json_states_by_prefix(KEY_PREFIX).await?;

        let mut removed = 0;
        for (key, entry) in entries {
            if entry.timestamp < cutoff && entry.firing.is_empty() {
                self.store.delete_state(&key).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Notification log garbage collection completed.");
        }
        Ok(removed)
    }
}
