//! The notification delivery pipeline.
//!
//! A flushed alert group runs through an ordered chain of stages:
//!
//! 1. [`WaitStage`] staggers the invocation by this replica's cluster
//!    position, giving more senior peers a head start.
//! 2. [`DedupStage`] consults the notification log and drops batches the
//!    receiver already knows about.
//! 3. [`SendStage`] renders and delivers the notification.
//! 4. [`UpdateLogStage`] records the confirmed send.
//!
//! A stage returning an empty batch stops the invocation as a
//! [`PipelineOutcome::Skipped`]; an error aborts it before the log is
//! updated, so the dispatcher's next flush retries delivery from scratch.
//! [`NotificationPipeline`] wraps the whole chain in a timeout.

mod context;
mod dedup;
pub mod error;
mod send;
mod traits;
mod update_log;
mod wait;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

pub use context::PipelineContext;
pub use dedup::DedupStage;
pub use error::PipelineError;
pub use send::SendStage;
pub use traits::Stage;
pub use update_log::UpdateLogStage;
pub use wait::WaitStage;

use crate::cluster::PeerPosition;
use crate::config::{ClusterConfig, DispatchConfig};
use crate::models::Alert;
use crate::nflog::NotificationLog;
use crate::persistence::traits::KeyValueStore;
use crate::receivers::ReceiverRegistry;

/// Splits a batch into firing and resolved fingerprint sets, judged at the
/// given instant. Every stage partitions against the context's pinned `now`
/// so the split is identical across the whole invocation.
pub(crate) fn partition_fingerprints(
    alerts: &[Alert],
    now: DateTime<Utc>,
) -> (BTreeSet<u64>, BTreeSet<u64>) {
    let mut firing = BTreeSet::new();
    let mut resolved = BTreeSet::new();
    for alert in alerts {
        if alert.is_resolved_at(now) {
            resolved.insert(alert.fingerprint());
        } else {
            firing.insert(alert.fingerprint());
        }
    }
    (firing, resolved)
}

/// How a pipeline invocation ended, short of an error.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The batch was delivered and recorded.
    Delivered {
        /// The alerts that went out.
        alerts: Vec<Alert>,
    },
    /// A stage stopped the invocation without delivering.
    Skipped {
        /// Name of the stage that dropped the batch.
        stage: &'static str,
    },
}

/// The ordered stage chain for one receiver invocation.
pub struct NotificationPipeline {
    stages: Vec<Box<dyn Stage>>,
    timeout: Duration,
}

impl NotificationPipeline {
    /// Creates a pipeline from an explicit stage chain.
    pub fn new(stages: Vec<Box<dyn Stage>>, timeout: Duration) -> Self {
        Self { stages, timeout }
    }

    /// Assembles the standard wait, dedup, send, update chain from
    /// configuration. Passing `None` as the position provider removes the
    /// cluster stagger, which is the single-replica setup.
    pub fn standard<S>(
        provider: Option<Arc<dyn PeerPosition>>,
        nflog: Arc<NotificationLog<S>>,
        registry: Arc<ReceiverRegistry>,
        cluster: &ClusterConfig,
        dispatch: &DispatchConfig,
    ) -> Self
    where
        S: KeyValueStore + 'static,
    {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(WaitStage::new(provider, cluster.peer_timeout)),
            Box::new(DedupStage::new(nflog.clone(), dispatch.repeat_interval)),
            Box::new(SendStage::new(registry)),
            Box::new(UpdateLogStage::new(nflog)),
        ];
        Self::new(stages, dispatch.pipeline_timeout)
    }

    /// Runs the batch through every stage in order.
    ///
    /// The whole chain shares one deadline; on expiry the invocation's
    /// cancellation token is cancelled and the call returns
    /// [`PipelineError::Aborted`].
    pub async fn process(
        &self,
        ctx: &mut PipelineContext,
        alerts: Vec<Alert>,
    ) -> Result<PipelineOutcome, PipelineError> {
        if alerts.is_empty() {
            return Ok(PipelineOutcome::Skipped { stage: "input" });
        }

        let result = tokio::time::timeout(self.timeout, self.run_stages(ctx, alerts)).await;
        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                ctx.cancellation_token.cancel();
                Err(PipelineError::Aborted(format!(
                    "timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                )))
            }
        }
    }

    async fn run_stages(
        &self,
        ctx: &mut PipelineContext,
        alerts: Vec<Alert>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut batch = alerts;
        for stage in &self.stages {
            batch = stage.exec(ctx, batch).await?;
            if batch.is_empty() {
                tracing::debug!(
                    receiver = %ctx.receiver,
                    group_key = format_args!("{:016x}", ctx.group_key),
                    stage = stage.name(),
                    "Pipeline stopped without delivery."
                );
                return Ok(PipelineOutcome::Skipped { stage: stage.name() });
            }
        }
        Ok(PipelineOutcome::Delivered { alerts: batch })
    }
}
