use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::helpers::{deserialize_duration_from_seconds, serialize_duration_to_seconds};

fn default_peer_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_peer_name() -> String {
    "replica-0".to_string()
}

/// Cluster membership settings for a replicated deployment.
///
/// With `enabled: false` (the default) the node runs standalone: rule
/// evaluation is never gated and notifications are sent without stagger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Whether this node participates in a cluster.
    #[serde(default)]
    pub enabled: bool,

    /// The unique name of this replica within the cluster.
    #[serde(default = "default_peer_name")]
    pub peer_name: String,

    /// Names of all known peers, including this node. The membership layer
    /// may later replace this seed view as peers join and leave.
    #[serde(default)]
    pub peers: Vec<String>,

    /// The stagger unit: a peer at rank `k` delays its notifications by
    /// `k * peer_timeout` to give lower-ranked peers first chance to send.
    #[serde(
        default = "default_peer_timeout",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        rename = "peer_timeout_secs"
    )]
    pub peer_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            peer_name: default_peer_name(),
            peers: Vec::new(),
            peer_timeout: default_peer_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let config = ClusterConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.peer_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let yaml = r#"
enabled: true
peer_name: "replica-1"
peers: ["replica-0", "replica-1", "replica-2"]
peer_timeout_secs: 20
"#;
        let config: ClusterConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.enabled);
        assert_eq!(config.peer_name, "replica-1");
        assert_eq!(config.peers.len(), 3);
        assert_eq!(config.peer_timeout, Duration::from_secs(20));
    }
}
