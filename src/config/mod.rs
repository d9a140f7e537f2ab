//! Configuration module for herald.

mod app_config;
mod cluster;
mod dispatch;
mod helpers;
mod http_retry;

pub use app_config::AppConfig;
pub use cluster::ClusterConfig;
pub use dispatch::{DispatchConfig, EvaluationConfig, NotificationLogConfig};
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, serialize_duration_to_ms,
    serialize_duration_to_seconds,
};
pub use http_retry::{HttpRetryConfig, JitterSetting};
