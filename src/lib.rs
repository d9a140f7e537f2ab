#![warn(missing_docs)]
//! Herald is a cluster-aware alerting engine. It gates rule evaluation on
//! cluster position and delivers grouped, deduplicated notifications across
//! replicas.

pub mod cluster;
pub mod cmd;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod http_client;
pub mod loader;
pub mod models;
pub mod nflog;
pub mod persistence;
pub mod pipeline;
pub mod receivers;
pub mod supervisor;
pub mod test_helpers;
