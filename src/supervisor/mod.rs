//! The Supervisor module manages the lifecycle of the herald application.
//!
//! This module implements the **Supervisor Pattern**, a design pattern used to
//! manage the lifecycle of multiple, concurrent, long-running services. It
//! acts as the top-level owner of all major components of the application,
//! such as the evaluation scheduler, the dispatcher and the notification log.
//!
//! ## Responsibilities
//!
//! - **Initialization**: The `SupervisorBuilder` constructs and "wires" all
//!   services together, injecting necessary dependencies like configuration
//!   and database connections.
//! - **Lifecycle Management**: The `Supervisor` starts all services and
//!   manages their lifetimes.
//! - **Graceful Shutdown**: It listens for shutdown signals (like Ctrl+C or
//!   SIGTERM) and orchestrates a clean shutdown of all managed services.
//! - **Task Supervision**: It monitors the health of each service. If a
//!   critical service fails (panics or returns an error), the supervisor will
//!   shut down all other services to ensure the application exits cleanly
//!   rather than continuing in a partially-functional state.

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::{signal, sync::mpsc};

use crate::{
    cluster::{EvaluationCoordinator, PeerPosition},
    config::AppConfig,
    dispatch::Dispatcher,
    engine::{evaluator::RuleEvaluator, scheduler::EvaluationScheduler},
    models::{Alert, receiver::ReceiverConfigError},
    nflog::NotificationLog,
    persistence::SqliteStateRepository,
    pipeline::NotificationPipeline,
    receivers::{ReceiverRegistry, error::ReceiverError},
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A state repository was not provided to the `SupervisorBuilder`.
    #[error("Missing state repository for Supervisor")]
    MissingStateRepository,

    /// No rule evaluator was provided and the watchdog, the built-in
    /// fallback, is disabled.
    #[error("Missing rule evaluator for Supervisor")]
    MissingEvaluator,

    /// An error occurred while loading receiver definitions.
    #[error("Failed to load receiver definitions: {0}")]
    ReceiverLoad(#[from] ReceiverConfigError),

    /// An error occurred while building receiver integrations.
    #[error("Receiver error: {0}")]
    Receiver(#[from] ReceiverError),

    /// An error occurred due to an invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// The primary runtime manager for the application.
///
/// The Supervisor owns all the major components (services) and is responsible
/// for their startup, shutdown, and health monitoring. Once `run` is called,
/// it becomes the main process loop for the entire application.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The persistent state repository backing the notification log.
    state: Arc<SqliteStateRepository>,

    /// Live delivery channels keyed by receiver name.
    registry: Arc<ReceiverRegistry>,

    /// The durable record of what has already been notified.
    nflog: Arc<NotificationLog<SqliteStateRepository>>,

    /// This node's cluster rank source. `None` in standalone deployments.
    provider: Option<Arc<dyn PeerPosition>>,

    /// The source of alert states, queried once per evaluation cycle.
    evaluator: Arc<dyn RuleEvaluator>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: tokio_util::sync::CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: tokio::task::JoinSet<()>,
}

impl Supervisor {
    /// Creates a new Supervisor instance with all its required components.
    ///
    /// This is typically called by the `SupervisorBuilder` after it has
    /// assembled all the necessary dependencies.
    pub fn new(
        config: AppConfig,
        state: Arc<SqliteStateRepository>,
        registry: Arc<ReceiverRegistry>,
        nflog: Arc<NotificationLog<SqliteStateRepository>>,
        provider: Option<Arc<dyn PeerPosition>>,
        evaluator: Arc<dyn RuleEvaluator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            state,
            registry,
            nflog,
            provider,
            evaluator,
            cancellation_token: tokio_util::sync::CancellationToken::new(),
            join_set: tokio::task::JoinSet::new(),
        }
    }

    /// Returns a new `SupervisorBuilder` instance.
    ///
    /// This is the public entry point for creating a supervisor.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// Starts the supervisor and all its managed services.
    ///
    /// This method is the main entry point for the application's runtime. It
    /// performs the following steps:
    /// 1. Spawns a signal handler to listen for `SIGINT` (Ctrl+C) and
    ///    `SIGTERM`.
    /// 2. Spawns the dispatcher, the evaluation scheduler and the
    ///    notification log maintenance loop as long-running background tasks.
    /// 3. Enters the main `select!` loop, which concurrently listens for the
    ///    shutdown signal and monitors the health of all spawned tasks via
    ///    the `JoinSet`.
    /// 4. Upon shutdown, it waits for all tasks to complete and performs
    ///    graceful cleanup of resources like the database connection.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        // Clone the token for the signal handler task.
        let cancellation_token = self.cancellation_token.clone();

        // Spawn a task to listen for shutdown signals.
        self.join_set.spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler")
                    .recv()
                    .await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
            }

            // Notify all other tasks to begin shutting down.
            cancellation_token.cancel();
        });

        // --- Service Initialization ---

        // The channel that carries alert state changes from the evaluation
        // scheduler to the dispatcher.
        let (alerts_tx, alerts_rx) =
            mpsc::channel::<Alert>(self.config.notification_channel_capacity as usize);

        let pipeline = NotificationPipeline::standard(
            self.provider.clone(),
            Arc::clone(&self.nflog),
            Arc::clone(&self.registry),
            &self.config.cluster,
            &self.config.dispatch,
        );

        // --- Task Spawning ---

        // Spawn the Dispatcher service. The Arc is retained so the cleanup
        // phase can force a final flush even if the run task was aborted.
        let dispatcher = Arc::new(Dispatcher::new(
            self.registry.receiver_names(),
            self.config.dispatch.clone(),
            Arc::new(pipeline),
            self.cancellation_token.clone(),
        ));
        let dispatcher_clone = Arc::clone(&dispatcher);
        self.join_set.spawn(async move {
            dispatcher_clone.run(alerts_rx).await;
        });

        // Spawn the EvaluationScheduler service.
        let scheduler = Arc::new(EvaluationScheduler::new(
            Arc::clone(&self.evaluator),
            EvaluationCoordinator::new(self.provider.clone()),
            self.config.evaluation.interval,
            alerts_tx,
            self.cancellation_token.clone(),
        ));
        self.join_set.spawn(async move {
            scheduler.run().await;
        });

        // Spawn the notification log maintenance loop.
        let nflog = Arc::clone(&self.nflog);
        let retention = self.config.notification_log.retention;
        let maintenance_interval = self.config.notification_log.maintenance_interval;
        let maintenance_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            let mut interval = tokio::time::interval(maintenance_interval);
            loop {
                tokio::select! {
                    biased;

                    _ = maintenance_token.cancelled() => {
                        tracing::info!(
                            "Notification log maintenance cancellation signal received, shutting down..."
                        );
                        break;
                    }

                    _ = interval.tick() => {
                        match nflog.gc(retention).await {
                            Ok(0) => {}
                            Ok(removed) => tracing::info!(
                                removed,
                                "Notification log garbage collection removed expired entries."
                            ),
                            Err(e) => tracing::error!(
                                error = %e,
                                "Error during notification log maintenance cycle."
                            ),
                        }
                    }
                }
            }
            tracing::info!("Notification log maintenance has shut down.");
        });

        // --- Main Supervisor Loop ---
        // This loop is only responsible for monitoring task health and
        // shutdown signals.

        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(_)) => {
                            // Task completed successfully, continue monitoring.
                        }
                        Some(Err(e)) => {
                            tracing::error!("A critical task failed: {:?}. Initiating shutdown.", e);
                            self.cancellation_token.cancel();
                        }
                        None => {
                            // All tasks have completed.
                            break;
                        }
                    }
                }
                _ = self.cancellation_token.cancelled() => {
                    // Cancellation requested externally, break the loop.
                    break;
                }
            }
        }

        // --- Graceful Shutdown ---

        // Ensure all spawned tasks are properly awaited before cleanup.
        self.join_set.shutdown().await;
        tracing::info!("All supervised tasks have completed.");

        // Perform final cleanup of resources, with a timeout.
        tracing::info!("Starting graceful resource cleanup...");
        let shutdown_timeout = self.config.shutdown_timeout;

        let cleanup_logic = async {
            // Flush any groups the dispatcher still holds. The decided sends
            // run on fresh tokens, so a recipient is not cut off mid-request.
            dispatcher.shutdown().await;

            if let Err(e) = self.state.flush().await {
                tracing::error!(error = %e, "Failed to flush pending writes, but continuing cleanup.");
            }
            self.state.close().await;
        };

        if tokio::time::timeout(shutdown_timeout, cleanup_logic).await.is_err() {
            tracing::warn!(
                "Cleanup did not complete within the timeout of {:?}. Continuing shutdown.",
                shutdown_timeout
            );
        } else {
            tracing::info!("Cleanup completed successfully.");
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }
}
