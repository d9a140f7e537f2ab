use async_trait::async_trait;

use crate::models::Alert;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::PipelineError;

/// A single step of the notification pipeline.
///
/// Stages receive the current alert batch and return the batch to hand to the
/// next stage. Returning an empty batch stops the invocation without error,
/// which is how the deduplication stage suppresses a redundant notification.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable stage name used in logs and skip outcomes.
    fn name(&self) -> &'static str;

    /// Runs the stage against `alerts`, observing cancellation via `ctx`.
    async fn exec(
        &self,
        ctx: &mut PipelineContext,
        alerts: Vec<Alert>,
    ) -> Result<Vec<Alert>, PipelineError>;
}
