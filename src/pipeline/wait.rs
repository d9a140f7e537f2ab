//! Cluster stagger stage.
//!
//! Delays an invocation proportionally to this replica's position in the
//! cluster so that lower-positioned peers get a head start. By the time a
//! higher-positioned replica wakes up, a healthy lower peer has usually
//! already delivered and gossiped the notification log entry, and the
//! deduplication stage suppresses the duplicate send.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cluster::PeerPosition;
use crate::models::Alert;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::traits::Stage;

/// Pipeline stage that sleeps `position * peer_timeout` before forwarding the
/// batch. Without a position provider the stage is a passthrough.
pub struct WaitStage {
    provider: Option<Arc<dyn PeerPosition>>,
    peer_timeout: Duration,
}

impl WaitStage {
    /// Creates a wait stage for the given position provider. Passing `None`
    /// disables the stagger entirely, which is the single-replica setup.
    pub fn new(provider: Option<Arc<dyn PeerPosition>>, peer_timeout: Duration) -> Self {
        Self {
            provider,
            peer_timeout,
        }
    }

    /// Computes the stagger for a peer position.
    ///
    /// Invariant: an unknown position must never shorten the wait. A replica
    /// that cannot place itself in the member list waits behind the whole
    /// cluster rather than acting as the most senior peer.
    fn wait_duration(&self, position: i64, peer_count: usize) -> Duration {
        if position < 0 {
            let peers = u32::try_from(peer_count).unwrap_or(u32::MAX);
            return self.peer_timeout.saturating_mul(peers);
        }
        let position = u32::try_from(position).unwrap_or(u32::MAX);
        self.peer_timeout.saturating_mul(position)
    }
}

#[async_trait]
impl Stage for WaitStage {
    fn name(&self) -> &'static str {
        "wait"
    }

    async fn exec(
        &self,
        ctx: &mut PipelineContext,
        alerts: Vec<Alert>,
    ) -> Result<Vec<Alert>, PipelineError> {
        let Some(provider) = &self.provider else {
            return Ok(alerts);
        };

        let position = provider.position();
        let wait = self.wait_duration(position, provider.peer_count());
        if wait.is_zero() {
            return Ok(alerts);
        }

        tracing::debug!(
            receiver = %ctx.receiver,
            group_key = format_args!("{:016x}", ctx.group_key),
            position,
            wait_secs = wait.as_secs_f64(),
            "Delaying notification for cluster position."
        );

        tokio::select! {
            biased;
            _ = ctx.cancellation_token.cancelled() => {
                Err(PipelineError::Aborted(
                    "cancelled while waiting for cluster position".to_string(),
                ))
            }
            _ = tokio::time::sleep(wait) => {
                ctx.annotate(format!(
                    "waited {:.1}s at cluster position {position}",
                    wait.as_secs_f64()
                ));
                Ok(alerts)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockPeerPosition;
    use crate::models::LabelSet;
    use crate::test_helpers::AlertBuilder;
    use tokio_util::sync::CancellationToken;

    fn context() -> PipelineContext {
        PipelineContext::new("ops", 7, LabelSet::default(), CancellationToken::new())
    }

    fn batch() -> Vec<Alert> {
        vec![AlertBuilder::new().label("alertname", "HighLatency").build()]
    }

    fn provider(position: i64, peer_count: usize) -> Arc<dyn PeerPosition> {
        let mut mock = MockPeerPosition::new();
        mock.expect_position().return_const(position);
        mock.expect_peer_count().return_const(peer_count);
        Arc::new(mock)
    }

    #[test]
    fn wait_grows_with_position() {
        let stage = WaitStage::new(None, Duration::from_secs(15));

        assert_eq!(stage.wait_duration(0, 3), Duration::ZERO);
        assert_eq!(stage.wait_duration(1, 3), Duration::from_secs(15));
        assert_eq!(stage.wait_duration(2, 3), Duration::from_secs(30));

        let mut previous = Duration::ZERO;
        for position in 0..10 {
            let wait = stage.wait_duration(position, 10);
            assert!(wait >= previous);
            previous = wait;
        }
    }

    #[test]
    fn unknown_position_waits_behind_the_whole_cluster() {
        let stage = WaitStage::new(None, Duration::from_secs(10));

        assert_eq!(stage.wait_duration(-1, 3), Duration::from_secs(30));
        assert_eq!(stage.wait_duration(i64::MIN, 5), Duration::from_secs(50));
    }

    #[tokio::test(start_paused = true)]
    async fn no_provider_is_a_passthrough() {
        let stage = WaitStage::new(None, Duration::from_secs(15));
        let mut ctx = context();

        let out = stage.exec(&mut ctx, batch()).await.unwrap();

        assert_eq!(out.len(), 1);
        assert!(ctx.annotations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn position_zero_does_not_arm_a_timer() {
        let stage = WaitStage::new(Some(provider(0, 3)), Duration::from_secs(15));
        let mut ctx = context();

        let out = stage.exec(&mut ctx, batch()).await.unwrap();

        assert_eq!(out.len(), 1);
        assert!(ctx.annotations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn positive_position_sleeps_then_forwards_and_annotates() {
        let stage = WaitStage::new(Some(provider(2, 3)), Duration::from_secs(15));
        let mut ctx = context();

        let out = stage.exec(&mut ctx, batch()).await.unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(ctx.annotations().len(), 1);
        assert!(ctx.annotations()[0].contains("position 2"));
    }

    #[tokio::test]
    async fn already_cancelled_token_aborts_before_sleeping() {
        let stage = WaitStage::new(Some(provider(3, 5)), Duration::from_secs(15));
        let mut ctx = context();
        ctx.cancellation_token.cancel();

        let result = stage.exec(&mut ctx, batch()).await;

        assert!(matches!(result, Err(PipelineError::Aborted(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_an_armed_timer() {
        let stage = WaitStage::new(Some(provider(2, 3)), Duration::from_secs(15));
        let mut ctx = context();
        let token = ctx.cancellation_token.clone();

        let handle = tokio::spawn(async move { stage.exec(&mut ctx, batch()).await });

        // Let the stage arm its timer, then cancel well before the 30s wait.
        tokio::time::advance(Duration::from_secs(1)).await;
        token.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(PipelineError::Aborted(_))));
    }
}
