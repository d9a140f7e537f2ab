//! Delivery to the configured receiver integration.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::Alert;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::traits::Stage;
use crate::receivers::{Notification, ReceiverRegistry};

/// Pipeline stage that renders the batch into a notification and hands it to
/// the receiver named in the context.
///
/// A failed send surfaces as an error, which aborts the invocation before the
/// notification log is touched. The next flush for the group then repeats the
/// whole pipeline, including deduplication, so the delivery is retried.
pub struct SendStage {
    registry: Arc<ReceiverRegistry>,
}

impl SendStage {
    /// Creates a send stage delivering through `registry`.
    pub fn new(registry: Arc<ReceiverRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Stage for SendStage {
    fn name(&self) -> &'static str {
        "send"
    }

    async fn exec(
        &self,
        ctx: &mut PipelineContext,
        alerts: Vec<Alert>,
    ) -> Result<Vec<Alert>, PipelineError> {
        let notification = Notification::from_alerts(
            &ctx.receiver,
            ctx.group_key,
            ctx.group_labels.clone(),
            &alerts,
            ctx.now,
        );

        self.registry.notify(&ctx.receiver, &notification).await?;

        tracing::info!(
            receiver = %ctx.receiver,
            group_key = %notification.group_key,
            alerts = alerts.len(),
            status = %notification.status,
            "Notification delivered."
        );
        Ok(alerts)
    }
}
