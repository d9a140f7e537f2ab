//! Notification log update after a confirmed send.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::Alert;
use crate::nflog::NotificationLog;
use crate::persistence::traits::KeyValueStore;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::partition_fingerprints;
use crate::pipeline::traits::Stage;

/// Pipeline stage that records a confirmed send in the notification log.
///
/// Runs strictly after the send stage, so the log only ever claims deliveries
/// that actually happened. The recorded sets are the fingerprints of exactly
/// the batch that went out, partitioned by status at the invocation's
/// decision instant.
pub struct UpdateLogStage<S: KeyValueStore> {
    nflog: Arc<NotificationLog<S>>,
}

impl<S: KeyValueStore> UpdateLogStage<S> {
    /// Creates an update stage writing to `nflog`.
    pub fn new(nflog: Arc<NotificationLog<S>>) -> Self {
        Self { nflog }
    }
}

#[async_trait]
impl<S: KeyValueStore> Stage for UpdateLogStage<S> {
    fn name(&self) -> &'static str {
        "update_log"
    }

    async fn exec(
        &self,
        ctx: &mut PipelineContext,
        alerts: Vec<Alert>,
    ) -> Result<Vec<Alert>, PipelineError> {
        let (firing, resolved) = partition_fingerprints(&alerts, ctx.now);
        self.nflog
            .record(&ctx.receiver, ctx.group_key, firing, resolved)
            .await?;
        Ok(alerts)
    }
}
