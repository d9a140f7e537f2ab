//! Gates rule evaluation on cluster rank.

use std::sync::Arc;

use crate::cluster::PeerPosition;

/// Decides whether this replica should evaluate rules in the current cycle.
///
/// Exactly one node at a time is meant to evaluate: the one at rank zero.
/// Every other rank, and every ambiguous rank, sits the cycle out. Under a
/// broken membership view this means no node evaluates for a cycle, which is
/// preferred over two nodes firing duplicate notifications.
pub struct EvaluationCoordinator {
    provider: Option<Arc<dyn PeerPosition>>,
}

impl EvaluationCoordinator {
    /// Creates a coordinator. With no provider (standalone deployment) every
    /// cycle is authorized.
    pub fn new(provider: Option<Arc<dyn PeerPosition>>) -> Self {
        Self { provider }
    }

    /// Returns true iff this node is currently designated to evaluate rules.
    pub fn should_evaluate(&self) -> bool {
        let Some(provider) = &self.provider else {
            return true;
        };

        let position = provider.position();
        // Invariant: only an exact rank of zero authorizes evaluation. A
        // negative rank means the view could not place this node; acting on
        // it could duplicate evaluation, so the guard fails closed.
        if position < 0 {
            tracing::debug!(position, "Cluster position unknown, not evaluating this cycle.");
            return false;
        }
        position == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockPeerPosition;

    fn coordinator_with_position(position: i64) -> EvaluationCoordinator {
        let mut provider = MockPeerPosition::new();
        provider.expect_position().return_const(position);
        EvaluationCoordinator::new(Some(Arc::new(provider)))
    }

    #[test]
    fn no_provider_always_evaluates() {
        let coordinator = EvaluationCoordinator::new(None);
        assert!(coordinator.should_evaluate());
    }

    #[test]
    fn rank_zero_evaluates() {
        assert!(coordinator_with_position(0).should_evaluate());
    }

    #[test]
    fn non_zero_ranks_do_not_evaluate() {
        for position in [1, 2, 17, i64::MAX] {
            assert!(
                !coordinator_with_position(position).should_evaluate(),
                "position {position} must not evaluate"
            );
        }
    }

    #[test]
    fn negative_ranks_fail_closed() {
        for position in [-1, -5, i64::MIN] {
            assert!(
                !coordinator_with_position(position).should_evaluate(),
                "position {position} must not evaluate"
            );
        }
    }
}
