//! Prometheus metrics for the oracle network

use prometheus::{Counter, IntCounter, IntGauge, Registry};

/// Oracle registry and consensus metrics
pub struct OracleMetrics {
    pub submissions_accepted: IntCounter,
    pub submissions_rejected: IntCounter,
    pub consensus_finalized: IntCounter,
    pub consensus_failed: IntCounter,
    pub rewards_distributed: Counter,
    pub heartbeat_timeouts: IntCounter,
    pub active_nodes: IntGauge,
}

impl OracleMetrics {
    pub fn new() -> Self {
        Self {
            submissions_accepted: IntCounter::new(
                "trustgrid_oracle_submissions_accepted_total",
                "Oracle data submissions accepted",
            )
            .expect("valid metric definition"),
            submissions_rejected: IntCounter::new(
                "trustgrid_oracle_submissions_rejected_total",
                "Oracle data submissions rejected by validation",
            )
            .expect("valid metric definition"),
            consensus_finalized: IntCounter::new(
                "trustgrid_oracle_consensus_finalized_total",
                "Consensus records created",
            )
            .expect("valid metric definition"),
            consensus_failed: IntCounter::new(
                "trustgrid_oracle_consensus_failed_total",
                "Consensus checks aborted by an aggregation error",
            )
            .expect("valid metric definition"),
            rewards_distributed: Counter::new(
                "trustgrid_oracle_rewards_distributed_total",
                "Reward units credited to node stakes",
            )
            .expect("valid metric definition"),
            heartbeat_timeouts: IntCounter::new(
                "trustgrid_oracle_heartbeat_timeouts_total",
                "Nodes marked inactive by the heartbeat sweep",
            )
            .expect("valid metric definition"),
            active_nodes: IntGauge::new(
                "trustgrid_oracle_active_nodes",
                "Currently active oracle nodes",
            )
            .expect("valid metric definition"),
        }
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.submissions_accepted.clone()))?;
        registry.register(Box::new(self.submissions_rejected.clone()))?;
        registry.register(Box::new(self.consensus_finalized.clone()))?;
        registry.register(Box::new(self.consensus_failed.clone()))?;
        registry.register(Box::new(self.rewards_distributed.clone()))?;
        registry.register(Box::new(self.heartbeat_timeouts.clone()))?;
        registry.register(Box::new(self.active_nodes.clone()))?;
        Ok(())
    }
}

impl Default for OracleMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_once() {
        let registry = Registry::new();
        let metrics = OracleMetrics::new();
        metrics.register(&registry).unwrap();
        metrics.submissions_accepted.inc();
        assert_eq!(registry.gather().len(), 7);
        // Same names cannot be registered twice
        assert!(OracleMetrics::new().register(&registry).is_err());
    }
}
