//! Alert grouping and pipeline dispatch.
//!
//! The [`Dispatcher`] consumes alert state changes from the evaluation side,
//! fans each alert out to every configured receiver, and buffers it in a
//! pending group keyed by receiver and grouping labels. The first alert of a
//! group arms a batch window; when the window expires the group is flushed
//! through the notification pipeline.
//!
//! Flushes for distinct group keys run as parallel tasks. Flushes for the
//! same key are serialized through a per-key lock so the pipeline's log
//! read, send and record form one atomic sequence per group.

use std::{collections::HashMap, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use xxhash_rust::xxh3::xxh3_64;

use crate::{
    config::DispatchConfig,
    models::{Alert, LabelSet, labels::HASH_SEPARATOR},
    pipeline::{NotificationPipeline, PipelineContext, PipelineError, PipelineOutcome},
};

/// Computes the group key for a receiver and an alert's grouping labels.
///
/// The key identifies one (receiver, grouping label values) pair; it doubles
/// as the notification log key component and as the lock arena key.
fn group_key_for(receiver: &str, labels: &LabelSet, group_by: &[String]) -> u64 {
    let mut buf = Vec::with_capacity(receiver.len() + 9);
    buf.extend_from_slice(receiver.as_bytes());
    buf.push(HASH_SEPARATOR);
    buf.extend_from_slice(&labels.grouping_fingerprint(group_by).to_be_bytes());
    xxh3_64(&buf)
}

/// Per-receiver dispatch outcome counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Invocations that delivered a notification.
    pub delivered: usize,
    /// Invocations stopped by a stage without delivering.
    pub skipped: usize,
    /// Invocations that failed terminally (send or log error).
    pub failed: usize,
    /// Invocations cancelled or timed out.
    pub aborted: usize,
}

/// Alerts buffered for one (receiver, group key) pair awaiting flush.
struct PendingGroup {
    receiver: String,
    group_labels: LabelSet,
    /// Latest alert per fingerprint. A newer state change for the same
    /// series replaces the older one rather than queueing behind it.
    alerts: HashMap<u64, Alert>,
    /// When the batch window expires and the group flushes.
    window_deadline: Instant,
}

/// A per-key lock plus bookkeeping for the idle sweep.
struct GroupLock {
    mutex: Arc<Mutex<()>>,
    last_used: Instant,
}

/// Groups alerts and runs the notification pipeline per group.
pub struct Dispatcher {
    /// Names of all configured receivers; every alert fans out to each.
    receivers: Vec<String>,
    config: DispatchConfig,
    pipeline: Arc<NotificationPipeline>,
    /// Pending groups keyed by group key.
    groups: DashMap<u64, PendingGroup>,
    /// Lock arena serializing flushes per group key.
    group_locks: DashMap<u64, GroupLock>,
    stats: DashMap<String, ReceiverStats>,
    /// Tracks spawned flush tasks so shutdown can await them.
    flush_tasks: TaskTracker,
    cancellation_token: CancellationToken,
}

impl Dispatcher {
    /// Creates a dispatcher fanning out to `receivers` and flushing groups
    /// through `pipeline`.
    pub fn new(
        receivers: Vec<String>,
        config: DispatchConfig,
        pipeline: Arc<NotificationPipeline>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            receivers,
            config,
            pipeline,
            groups: DashMap::new(),
            group_locks: DashMap::new(),
            stats: DashMap::new(),
            flush_tasks: TaskTracker::new(),
            cancellation_token,
        }
    }

    /// Runs the dispatch loop: ingests alerts, flushes expired batch windows
    /// and sweeps idle group locks, until cancelled or the channel closes.
    pub async fn run(self: Arc<Self>, mut alerts_rx: mpsc::Receiver<Alert>) {
        let mut flush_interval = tokio::time::interval(self.flush_tick());

        loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("Dispatcher cancellation signal received, shutting down...");
                    break;
                }

                maybe_alert = alerts_rx.recv() => {
                    match maybe_alert {
                        Some(alert) => self.ingest(alert),
                        None => {
                            tracing::info!("Alert channel closed, stopping dispatcher.");
                            break;
                        }
                    }
                }

                _ = flush_interval.tick() => {
                    self.flush_due_groups(false).await;
                    self.sweep_idle_locks();
                }
            }
        }

        self.shutdown().await;
        tracing::info!("Dispatcher has shut down.");
    }

    /// Buffers an alert into the pending group of every receiver, arming the
    /// group's batch window on first contact.
    pub fn ingest(&self, alert: Alert) {
        for receiver in &self.receivers {
            let group_key = group_key_for(receiver, &alert.labels, &self.config.group_by);
            let mut group = self.groups.entry(group_key).or_insert_with(|| PendingGroup {
                receiver: receiver.clone(),
                group_labels: self.grouping_labels(&alert.labels),
                alerts: HashMap::new(),
                window_deadline: Instant::now() + self.config.group_window,
            });
            group.alerts.insert(alert.fingerprint(), alert.clone());
        }
    }

    /// Projects an alert's labels onto the configured grouping label names.
    fn grouping_labels(&self, labels: &LabelSet) -> LabelSet {
        labels
            .iter()
            .filter(|(name, _)| self.config.group_by.iter().any(|n| n == name))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    /// The most recent outcome counters for a receiver.
    pub fn stats(&self, receiver: &str) -> Option<ReceiverStats> {
        self.stats.get(receiver).map(|entry| entry.clone())
    }

    /// Flushes every group whose batch window has expired; with `force`,
    /// flushes everything pending. Each flush runs as its own task.
    async fn flush_due_groups(self: &Arc<Self>, force: bool) {
        let now = Instant::now();
        let due: Vec<u64> = self
            .groups
            .iter()
            .filter(|entry| force || entry.window_deadline <= now)
            .map(|entry| *entry.key())
            .collect();

        for key in due {
            // Late arrivals between the scan and this remove still join the
            // flushed batch.
            if let Some((_, group)) = self.groups.remove(&key) {
                if group.alerts.is_empty() {
                    continue;
                }
                let dispatcher = Arc::clone(self);
                let token = self.cancellation_token.child_token();
                self.flush_tasks.spawn(async move {
                    dispatcher.dispatch_group(key, group, token).await;
                });
            }
        }
    }

    /// Runs the pipeline for one flushed group under its per-key lock.
    async fn dispatch_group(
        self: Arc<Self>,
        group_key: u64,
        group: PendingGroup,
        token: CancellationToken,
    ) {
        let lock = self.group_lock(group_key);
        let _guard = lock.lock().await;

        let mut alerts: Vec<Alert> = group.alerts.into_values().collect();
        alerts.sort_by_key(Alert::fingerprint);

        let mut ctx =
            PipelineContext::new(group.receiver.clone(), group_key, group.group_labels, token);

        let result = self.pipeline.process(&mut ctx, alerts).await;
        self.account(&group.receiver, group_key, &ctx, result);
    }

    /// Updates the receiver's counters and logs the invocation outcome.
    fn account(
        &self,
        receiver: &str,
        group_key: u64,
        ctx: &PipelineContext,
        result: Result<PipelineOutcome, PipelineError>,
    ) {
        let mut stats = self.stats.entry(receiver.to_string()).or_default();
        match result {
            Ok(PipelineOutcome::Delivered { alerts }) => {
                stats.delivered += 1;
                tracing::debug!(
                    receiver,
                    group_key = format_args!("{group_key:016x}"),
                    alerts = alerts.len(),
                    annotations = ?ctx.annotations(),
                    "Group flush delivered."
                );
            }
            Ok(PipelineOutcome::Skipped { stage }) => {
                stats.skipped += 1;
                tracing::debug!(
                    receiver,
                    group_key = format_args!("{group_key:016x}"),
                    stage,
                    "Group flush skipped."
                );
            }
            Err(PipelineError::Aborted(reason)) => {
                stats.aborted += 1;
                tracing::warn!(
                    receiver,
                    group_key = format_args!("{group_key:016x}"),
                    reason,
                    "Group flush aborted."
                );
            }
            Err(e) => {
                stats.failed += 1;
                tracing::error!(
                    receiver,
                    group_key = format_args!("{group_key:016x}"),
                    error = %e,
                    "Group flush failed; the log was not updated and delivery \
                     will be retried on the next state change."
                );
            }
        }
    }

    /// Gets or creates the lock for a group key, refreshing its idle clock.
    fn group_lock(&self, group_key: u64) -> Arc<Mutex<()>> {
        let mut entry = self.group_locks.entry(group_key).or_insert_with(|| GroupLock {
            mutex: Arc::new(Mutex::new(())),
            last_used: Instant::now(),
        });
        entry.last_used = Instant::now();
        entry.mutex.clone()
    }

    /// Drops locks for groups untouched longer than the retention window.
    ///
    /// A lock still referenced by an in-flight flush is never dropped;
    /// removing it would let a second flush for the same key run unserialized.
    fn sweep_idle_locks(&self) {
        let retention = self.config.group_retention;
        self.group_locks.retain(|_, lock| {
            Arc::strong_count(&lock.mutex) > 1 || lock.last_used.elapsed() < retention
        });
    }

    /// Final flush and drain of in-flight work at shutdown. Pending groups
    /// are flushed with fresh cancellation tokens so a send already decided
    /// on can complete; the supervisor's shutdown timeout bounds the total.
    ///
    /// Safe to call more than once; a second call finds nothing pending.
    pub async fn shutdown(self: &Arc<Self>) {
        tracing::info!(pending = self.groups.len(), "Flushing pending groups before shutdown.");
        self.flush_final().await;
        self.flush_tasks.close();
        self.flush_tasks.wait().await;
    }

    /// Force-flushes all pending groups detached from the shutdown token.
    async fn flush_final(self: &Arc<Self>) {
        let keys: Vec<u64> = self.groups.iter().map(|entry| *entry.key()).collect();
        for key in keys {
            if let Some((_, group)) = self.groups.remove(&key) {
                if group.alerts.is_empty() {
                    continue;
                }
                let dispatcher = Arc::clone(self);
                self.flush_tasks.spawn(async move {
                    dispatcher.dispatch_group(key, group, CancellationToken::new()).await;
                });
            }
        }
    }

    /// How often the run loop checks for expired batch windows.
    fn flush_tick(&self) -> Duration {
        (self.config.group_window / 4).max(Duration::from_millis(10))
    }

    #[cfg(test)]
    fn pending_group_count(&self) -> usize {
        self.groups.len()
    }
}
