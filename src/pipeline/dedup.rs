//! Deduplication against the notification log.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Alert, NotificationLogEntry};
use crate::nflog::NotificationLog;
use crate::persistence::traits::KeyValueStore;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::partition_fingerprints;
use crate::pipeline::traits::Stage;

/// Pipeline stage that drops a batch when the notification log shows the
/// receiver already knows its content.
///
/// This is the stage that makes replicated delivery converge: whichever
/// replica records a send first causes every later invocation for the same
/// (receiver, group key) and alert state to stop here.
pub struct DedupStage<S: KeyValueStore> {
    nflog: Arc<NotificationLog<S>>,
    repeat_interval: chrono::Duration,
}

impl<S: KeyValueStore> DedupStage<S> {
    /// Creates a dedup stage reading from `nflog`. Batches whose content
    /// matches the logged entry are re-sent once `repeat_interval` has
    /// passed since the last confirmed send.
    pub fn new(nflog: Arc<NotificationLog<S>>, repeat_interval: Duration) -> Self {
        Self {
            nflog,
            repeat_interval: chrono::Duration::from_std(repeat_interval)
                .unwrap_or_else(|_| chrono::Duration::max_value()),
        }
    }

    /// Decides whether a batch with the given firing and resolved sets still
    /// carries information the receiver has not seen.
    fn needs_update(
        &self,
        entry: &NotificationLogEntry,
        firing: &BTreeSet<u64>,
        resolved: &BTreeSet<u64>,
        now: DateTime<Utc>,
    ) -> bool {
        // Any firing fingerprint the last send did not contain goes out.
        if !entry.is_firing_subset(firing) {
            return true;
        }
        if firing.is_empty() {
            // The whole batch is resolved. Notify only if the last send still
            // reported firing alerts; if it did not, the receiver never heard
            // about these alerts and silence is correct.
            return !entry.firing.is_empty();
        }
        if !entry.is_resolved_subset(resolved) {
            return true;
        }
        // Nothing changed. Re-notify once the repeat interval has elapsed.
        now.checked_sub_signed(self.repeat_interval)
            .is_some_and(|cutoff| entry.timestamp < cutoff)
    }
}

#[async_trait]
impl<S: KeyValueStore> Stage for DedupStage<S> {
    fn name(&self) -> &'static str {
        "dedup"
    }

    async fn exec(
        &self,
        ctx: &mut PipelineContext,
        alerts: Vec<Alert>,
    ) -> Result<Vec<Alert>, PipelineError> {
        let (firing, resolved) = partition_fingerprints(&alerts, ctx.now);

        let entry = self.nflog.entry(&ctx.receiver, ctx.group_key).await?;
        let send = match &entry {
            // Never notified before: anything firing goes out, a batch that
            // resolved before the first send does not.
            None => !firing.is_empty(),
            Some(entry) => self.needs_update(entry, &firing, &resolved, ctx.now),
        };

        if send {
            Ok(alerts)
        } else {
            tracing::debug!(
                receiver = %ctx.receiver,
                group_key = format_args!("{:016x}", ctx.group_key),
                firing = firing.len(),
                resolved = resolved.len(),
                "Suppressing notification already covered by the log."
            );
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabelSet;
    use crate::persistence::SqliteStateRepository;
    use crate::test_helpers::AlertBuilder;
    use chrono::Duration as ChronoDuration;
    use tokio_util::sync::CancellationToken;

    const GROUP_KEY: u64 = 0xfeed;

    async fn setup_stage(repeat_interval: Duration) -> DedupStage<SqliteStateRepository> {
        let repo = SqliteStateRepository::new("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory db");
        repo.run_migrations().await.expect("Failed to run migrations");
        DedupStage::new(Arc::new(NotificationLog::new(Arc::new(repo))), repeat_interval)
    }

    fn context() -> PipelineContext {
        PipelineContext::new("ops", GROUP_KEY, LabelSet::default(), CancellationToken::new())
    }

    fn firing_alert(instance: &str) -> Alert {
        AlertBuilder::new()
            .label("alertname", "HighLatency")
            .label("instance", instance)
            .build()
    }

    fn resolved_alert(instance: &str) -> Alert {
        AlertBuilder::new()
            .label("alertname", "HighLatency")
            .label("instance", instance)
            .ends_at(Utc::now() - ChronoDuration::minutes(5))
            .build()
    }

    fn set(items: &[u64]) -> BTreeSet<u64> {
        items.iter().copied().collect()
    }

    #[tokio::test]
    async fn first_firing_batch_passes_through() {
        let stage = setup_stage(Duration::from_secs(3600)).await;
        let mut ctx = context();

        let out = stage.exec(&mut ctx, vec![firing_alert("a")]).await.unwrap();

        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn resolved_only_batch_without_prior_send_is_suppressed() {
        let stage = setup_stage(Duration::from_secs(3600)).await;
        let mut ctx = context();

        let out = stage.exec(&mut ctx, vec![resolved_alert("a")]).await.unwrap();

        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn unchanged_batch_is_suppressed_after_a_recorded_send() {
        let stage = setup_stage(Duration::from_secs(3600)).await;
        let alert = firing_alert("a");
        let (firing, resolved) = partition_fingerprints(&[alert.clone()], Utc::now());
        stage.nflog.record("ops", GROUP_KEY, firing, resolved).await.unwrap();

        let mut ctx = context();
        let out = stage.exec(&mut ctx, vec![alert]).await.unwrap();

        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn new_firing_fingerprint_forces_a_send() {
        let stage = setup_stage(Duration::from_secs(3600)).await;
        let first = firing_alert("a");
        stage
            .nflog
            .record("ops", GROUP_KEY, set(&[first.fingerprint()]), set(&[]))
            .await
            .unwrap();

        let mut ctx = context();
        let out = stage
            .exec(&mut ctx, vec![first, firing_alert("b")])
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn transition_to_all_resolved_forces_a_send() {
        let stage = setup_stage(Duration::from_secs(3600)).await;
        let alert = firing_alert("a");
        stage
            .nflog
            .record("ops", GROUP_KEY, set(&[alert.fingerprint()]), set(&[]))
            .await
            .unwrap();

        let mut ctx = context();
        let out = stage.exec(&mut ctx, vec![resolved_alert("a")]).await.unwrap();

        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn repeated_resolved_batch_is_suppressed() {
        let stage = setup_stage(Duration::from_secs(3600)).await;
        let alert = resolved_alert("a");
        // The log already shows a resolved-only send covering this alert.
        stage
            .nflog
            .record("ops", GROUP_KEY, set(&[]), set(&[alert.fingerprint()]))
            .await
            .unwrap();

        let mut ctx = context();
        let out = stage.exec(&mut ctx, vec![alert]).await.unwrap();

        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn repeat_interval_elapsing_forces_a_resend() {
        let stage = setup_stage(Duration::from_secs(60)).await;
        let alert = firing_alert("a");
        // Install an entry recorded well before the repeat interval via the
        // replica merge path, which preserves remote timestamps.
        let stale = NotificationLogEntry::new(
            set(&[alert.fingerprint()]),
            set(&[]),
            Utc::now() - ChronoDuration::minutes(10),
        );
        stage.nflog.merge("ops", GROUP_KEY, stale).await.unwrap();

        let mut ctx = context();
        let out = stage.exec(&mut ctx, vec![alert]).await.unwrap();

        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn new_resolution_alongside_ongoing_firing_forces_a_send() {
        let stage = setup_stage(Duration::from_secs(3600)).await;
        let ongoing = firing_alert("a");
        let resolving = resolved_alert("b");
        stage
            .nflog
            .record(
                "ops",
                GROUP_KEY,
                set(&[ongoing.fingerprint(), resolving.fingerprint()]),
                set(&[]),
            )
            .await
            .unwrap();

        let mut ctx = context();
        let out = stage.exec(&mut ctx, vec![ongoing, resolving]).await.unwrap();

        assert_eq!(out.len(), 2);
    }

    #[test]
    fn fingerprints_split_by_status_at_the_decision_instant() {
        let now = Utc::now();
        let firing = firing_alert("a");
        let resolved = resolved_alert("b");

        let (firing_set, resolved_set) =
            partition_fingerprints(&[firing.clone(), resolved.clone()], now);

        assert_eq!(firing_set, set(&[firing.fingerprint()]));
        assert_eq!(resolved_set, set(&[resolved.fingerprint()]));
    }
}
