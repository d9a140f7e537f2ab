//! The cluster-gated evaluation loop.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    cluster::EvaluationCoordinator,
    engine::evaluator::{EvaluatorError, RuleEvaluator},
    models::Alert,
};

/// Runs the evaluator on a fixed interval, gated by cluster rank.
///
/// Every tick asks the [`EvaluationCoordinator`] whether this replica is the
/// designated evaluator. Non-designated replicas skip the tick entirely; the
/// notification side still runs on every replica, consuming whatever the
/// designated peer publishes.
pub struct EvaluationScheduler {
    evaluator: Arc<dyn RuleEvaluator>,
    coordinator: EvaluationCoordinator,
    interval: Duration,
    /// The sender for the dispatcher's alert channel.
    alerts_tx: mpsc::Sender<Alert>,
    /// A token used to signal a graceful shutdown.
    cancellation_token: CancellationToken,
    /// Ticks skipped because this replica was not designated.
    skipped_ticks: AtomicU64,
}

impl EvaluationScheduler {
    /// Creates a new scheduler instance.
    pub fn new(
        evaluator: Arc<dyn RuleEvaluator>,
        coordinator: EvaluationCoordinator,
        interval: Duration,
        alerts_tx: mpsc::Sender<Alert>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            evaluator,
            coordinator,
            interval,
            alerts_tx,
            cancellation_token,
            skipped_ticks: AtomicU64::new(0),
        }
    }

    /// Starts the long-running evaluation loop.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!(
                        "Evaluation scheduler cancellation signal received, shutting down..."
                    );
                    break;
                }

                _ = interval.tick() => {
                    if let Err(e) = self.evaluate_cycle().await {
                        tracing::error!(error = %e, "Error during evaluation cycle.");
                    }
                }
            }
        }
        tracing::info!("Evaluation scheduler has shut down.");
    }

    /// Performs one gated evaluation cycle.
    async fn evaluate_cycle(&self) -> Result<(), EvaluatorError> {
        if !self.coordinator.should_evaluate() {
            let skipped = self.skipped_ticks.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(
                skipped_total = skipped,
                "Not the designated evaluator, skipping this cycle."
            );
            return Ok(());
        }

        let now = Utc::now();
        let alerts = self.evaluator.evaluate(now).await?;
        tracing::debug!(alerts = alerts.len(), "Evaluation cycle produced alert states.");

        for alert in alerts {
            if self.alerts_tx.send(alert).await.is_err() {
                tracing::warn!("Alert channel closed, stopping alert forwarding.");
                break;
            }
        }
        Ok(())
    }

    /// Number of ticks this replica sat out because another peer was
    /// designated.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.load(Ordering::Relaxed)
    }
}
