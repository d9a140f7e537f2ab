//! Cluster membership and evaluation gating.
//!
//! A replicated deployment runs the same rule set on every node. The types
//! here decide which node acts: [`ClusterMembership`] ranks this node within
//! the current member view, and [`EvaluationCoordinator`] gates rule
//! evaluation on that rank. The notification side consumes the same rank via
//! the [`PeerPosition`] trait to stagger sends (see
//! [`WaitStage`](crate::pipeline::WaitStage)).
//!
//! The coordinator and the wait stage read the position at different
//! instants, so they may briefly observe different ranks while a membership
//! change propagates. No correctness property depends on the two reads
//! agreeing; the notification log is the backstop against duplicate sends.

mod coordinator;

pub use coordinator::EvaluationCoordinator;

#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;

/// A source of this node's rank within the cluster.
///
/// Implementations must be cheap to query; both the evaluation loop and the
/// notification pipeline read the position on their hot paths.
#[cfg_attr(test, automock)]
pub trait PeerPosition: Send + Sync {
    /// The rank of this node among all known peers, starting at zero.
    ///
    /// A negative value signals that the rank could not be determined (for
    /// example, this node is missing from its own membership view). Callers
    /// must treat any negative value as "do not act as the senior node".
    fn position(&self) -> i64;

    /// The number of peers in the current membership view.
    fn peer_count(&self) -> usize;
}

/// This node's view of cluster membership.
///
/// Rank is the index of the node's own name in the lexicographically sorted
/// member list. Every replica sorts the same names, so all replicas that
/// share a view agree on the ranking without any election protocol.
pub struct ClusterMembership {
    own_name: String,
    /// Sorted, deduplicated member names. Guarded by a lightweight lock so
    /// position reads stay cheap snapshot reads.
    members: RwLock<Vec<String>>,
}

impl ClusterMembership {
    /// Creates a membership view seeded with the given peers. The node's own
    /// name is added to the view if the seed list omits it.
    pub fn new(own_name: impl Into<String>, seed_peers: Vec<String>) -> Self {
        let own_name = own_name.into();
        let mut members = seed_peers;
        if !members.contains(&own_name) {
            members.push(own_name.clone());
        }
        members.sort();
        members.dedup();
        Self { own_name, members: RwLock::new(members) }
    }

    /// The name this node identifies as within the cluster.
    pub fn own_name(&self) -> &str {
        &self.own_name
    }

    /// Replaces the member view. Called by the membership transport when
    /// peers join or leave; the new view takes effect for the next position
    /// read.
    pub fn set_members(&self, names: Vec<String>) {
        let mut sorted = names;
        sorted.sort();
        sorted.dedup();
        let mut members = self.members.write();
        if *members != sorted {
            tracing::info!(
                old_size = members.len(),
                new_size = sorted.len(),
                "Cluster membership view changed."
            );
            *members = sorted;
        }
    }

    /// A snapshot of the current member names, in rank order.
    pub fn members(&self) -> Vec<String> {
        self.members.read().clone()
    }
}

impl PeerPosition for ClusterMembership {
    fn position(&self) -> i64 {
        let members = self.members.read();
        match members.binary_search(&self.own_name) {
            Ok(index) => index as i64,
            // The view no longer contains this node. Report the sentinel and
            // let callers fail closed.
            Err(_) => {
                tracing::debug!(
                    own_name = %self.own_name,
                    members = members.len(),
                    "Own name absent from membership view."
                );
                -1
            }
        }
    }

    fn peer_count(&self) -> usize {
        self.members.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rank_follows_sorted_order() {
        let membership =
            ClusterMembership::new("replica-1", names(&["replica-0", "replica-1", "replica-2"]));
        assert_eq!(membership.position(), 1);
        assert_eq!(membership.peer_count(), 3);
    }

    #[test]
    fn first_sorted_name_gets_rank_zero() {
        let membership =
            ClusterMembership::new("replica-0", names(&["replica-2", "replica-0", "replica-1"]));
        assert_eq!(membership.position(), 0);
    }

    #[test]
    fn own_name_is_added_when_missing_from_seed() {
        let membership = ClusterMembership::new("replica-1", names(&["replica-0"]));
        assert_eq!(membership.members(), names(&["replica-0", "replica-1"]));
        assert_eq!(membership.position(), 1);
    }

    #[test]
    fn single_node_has_rank_zero() {
        let membership = ClusterMembership::new("only", Vec::new());
        assert_eq!(membership.position(), 0);
        assert_eq!(membership.peer_count(), 1);
    }

    #[test]
    fn view_update_changes_rank() {
        let membership = ClusterMembership::new("replica-1", names(&["replica-0", "replica-1"]));
        assert_eq!(membership.position(), 1);

        // replica-0 left; this node becomes the senior peer.
        membership.set_members(names(&["replica-1", "replica-2"]));
        assert_eq!(membership.position(), 0);
    }

    #[test]
    fn absent_own_name_yields_negative_position() {
        let membership = ClusterMembership::new("replica-1", names(&["replica-0", "replica-1"]));
        membership.set_members(names(&["replica-0", "replica-2"]));
        assert_eq!(membership.position(), -1);
        // The view itself is still reported as-is.
        assert_eq!(membership.peer_count(), 2);
    }

    #[test]
    fn duplicate_names_are_collapsed() {
        let membership = ClusterMembership::new(
            "replica-1",
            names(&["replica-0", "replica-0", "replica-1"]),
        );
        assert_eq!(membership.peer_count(), 2);
        assert_eq!(membership.position(), 1);
    }
}
