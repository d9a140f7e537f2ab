use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::{
    ClusterConfig, DispatchConfig, EvaluationConfig, NotificationLogConfig,
    deserialize_duration_from_seconds,
};

/// Provides the default value for shutdown_timeout.
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Provides the default value for notification_channel_capacity.
fn default_notification_channel_capacity() -> u32 {
    1024
}

/// Application configuration for herald.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Database URL for the SQLite database.
    pub database_url: String,

    /// Path to the receiver configuration file.
    #[serde(skip_deserializing)]
    pub receivers_config_path: PathBuf,

    /// Cluster membership settings.
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Alert grouping and dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Durable notification log settings.
    #[serde(default)]
    pub notification_log: NotificationLogConfig,

    /// Rule evaluation loop settings.
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,

    /// The capacity of the channel carrying alerts from the evaluation loop
    /// to the dispatcher.
    #[serde(default = "default_notification_channel_capacity")]
    pub notification_channel_capacity: u32,
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading from the configuration directory.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)))
            .add_source(Environment::with_prefix("HERALD").separator("__"))
            .build()?;
        let mut config: Self = s.try_deserialize()?;

        // Receiver definitions live next to app.yaml.
        let config_path = Path::new(config_dir_str);
        config.receivers_config_path = config_path.join("receivers.yaml");

        Ok(config)
    }

    /// Creates a new `AppConfigBuilder` for testing purposes.
    #[cfg(test)]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// A builder for creating `AppConfig` instances for testing.
#[cfg(test)]
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn database_url(mut self, url: &str) -> Self {
        self.config.database_url = url.to_string();
        self
    }

    pub fn receivers_config_path(mut self, path: &str) -> Self {
        self.config.receivers_config_path = path.into();
        self
    }

    pub fn cluster(mut self, cluster: ClusterConfig) -> Self {
        self.config.cluster = cluster;
        self
    }

    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.config.dispatch = dispatch;
        self
    }

    pub fn evaluation(mut self, evaluation: EvaluationConfig) -> Self {
        self.config.evaluation = evaluation;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
