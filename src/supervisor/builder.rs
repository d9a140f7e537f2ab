//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::sync::Arc;

use crate::{
    cluster::{ClusterMembership, PeerPosition},
    config::AppConfig,
    engine::evaluator::{RuleEvaluator, WatchdogEvaluator},
    http_client::HttpClientPool,
    loader::load_config,
    models::receiver::ReceiverConfig,
    nflog::NotificationLog,
    persistence::SqliteStateRepository,
    receivers::ReceiverRegistry,
};

use super::{Supervisor, SupervisorError};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    state: Option<Arc<SqliteStateRepository>>,
    evaluator: Option<Arc<dyn RuleEvaluator>>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the state repository (database connection) for the `Supervisor`.
    pub fn state(mut self, state: Arc<SqliteStateRepository>) -> Self {
        self.state = Some(state);
        self
    }

    /// Sets the rule evaluator for the `Supervisor`.
    ///
    /// When no evaluator is provided the built-in watchdog evaluator is used,
    /// unless it has been disabled in the configuration.
    pub fn evaluator(mut self, evaluator: Arc<dyn RuleEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Assembles and validates the components to build a `Supervisor`.
    ///
    /// This method performs the final "wiring" of the application's services.
    /// It ensures all required dependencies have been provided and then
    /// constructs the internal services, such as the `ReceiverRegistry` and
    /// the cluster membership view.
    pub async fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let state = self.state.ok_or(SupervisorError::MissingStateRepository)?;

        // Receiver definitions are loaded here, making the configuration file
        // the single source of truth for delivery channels.
        tracing::debug!(
            path = %config.receivers_config_path.display(),
            "Loading receiver definitions..."
        );
        let receiver_configs =
            load_config::<ReceiverConfig>(config.receivers_config_path.clone())?;
        tracing::info!(count = receiver_configs.len(), "Loaded receiver definitions.");
        if receiver_configs.is_empty() {
            return Err(SupervisorError::InvalidConfiguration(
                "at least one receiver must be configured".to_string(),
            ));
        }

        let client_pool = Arc::new(HttpClientPool::new());
        let registry = ReceiverRegistry::new(&receiver_configs, client_pool).await?;

        // In cluster mode every replica ranks itself within the member view;
        // standalone deployments carry no rank source at all.
        let provider: Option<Arc<dyn PeerPosition>> = if config.cluster.enabled {
            let membership = ClusterMembership::new(
                config.cluster.peer_name.clone(),
                config.cluster.peers.clone(),
            );
            tracing::info!(
                peer_name = %config.cluster.peer_name,
                peers = membership.peer_count(),
                "Cluster mode enabled."
            );
            Some(Arc::new(membership))
        } else {
            None
        };

        let evaluator: Arc<dyn RuleEvaluator> = match self.evaluator {
            Some(evaluator) => evaluator,
            None if config.evaluation.watchdog_enabled => {
                Arc::new(WatchdogEvaluator::new(&config.evaluation.watchdog_labels))
            }
            None => return Err(SupervisorError::MissingEvaluator),
        };

        let nflog = Arc::new(NotificationLog::new(Arc::clone(&state)));

        // Finally, construct the Supervisor with all its components.
        Ok(Supervisor::new(config, state, Arc::new(registry), nflog, provider, evaluator))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;
    use crate::config::EvaluationConfig;

    fn write_receivers_yaml(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("receivers.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", content).unwrap();
        path
    }

    async fn memory_state() -> Arc<SqliteStateRepository> {
        Arc::new(SqliteStateRepository::new("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn build_succeeds_with_watchdog_default() {
        let dir = TempDir::new().unwrap();
        let path = write_receivers_yaml(
            &dir,
            r#"
receivers:
  - name: "ops"
    stdout: {}
"#,
        );

        let config = AppConfig::builder()
            .database_url("sqlite::memory:")
            .receivers_config_path(path.to_str().unwrap())
            .build();

        let result = Supervisor::builder().config(config).state(memory_state().await).build().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn build_fails_if_config_is_missing() {
        let result = Supervisor::builder().state(memory_state().await).build().await;
        assert!(matches!(result, Err(SupervisorError::MissingConfig)));
    }

    #[tokio::test]
    async fn build_fails_if_state_repository_is_missing() {
        let result = Supervisor::builder().config(AppConfig::default()).build().await;
        assert!(matches!(result, Err(SupervisorError::MissingStateRepository)));
    }

    #[tokio::test]
    async fn build_fails_without_evaluator_when_watchdog_is_disabled() {
        let dir = TempDir::new().unwrap();
        let path = write_receivers_yaml(
            &dir,
            r#"
receivers:
  - name: "ops"
    stdout: {}
"#,
        );

        let config = AppConfig::builder()
            .database_url("sqlite::memory:")
            .receivers_config_path(path.to_str().unwrap())
            .evaluation(EvaluationConfig { watchdog_enabled: false, ..Default::default() })
            .build();

        let result = Supervisor::builder().config(config).state(memory_state().await).build().await;
        assert!(matches!(result, Err(SupervisorError::MissingEvaluator)));
    }

    #[tokio::test]
    async fn build_fails_with_no_receivers() {
        let dir = TempDir::new().unwrap();
        let path = write_receivers_yaml(&dir, "receivers: []");

        let config = AppConfig::builder()
            .database_url("sqlite::memory:")
            .receivers_config_path(path.to_str().unwrap())
            .build();

        let result = Supervisor::builder().config(config).state(memory_state().await).build().await;
        assert!(matches!(result, Err(SupervisorError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn build_fails_when_the_receiver_file_is_absent() {
        let config = AppConfig::builder()
            .database_url("sqlite::memory:")
            .receivers_config_path("/definitely/not/here/receivers.yaml")
            .build();

        let result = Supervisor::builder().config(config).state(memory_state().await).build().await;
        assert!(matches!(result, Err(SupervisorError::ReceiverLoad(_))));
    }
}
