//! Oracle node registry
//!
//! Node lifecycle:
//!
//! ```text
//! unregistered ──register──▶ active ◀──heartbeat── inactive
//!                              │  └──timeout sweep──▶ ┘
//!                              └──operator penalty──▶ penalized
//! ```
//!
//! A single coarse lock guards the node map; updates are infrequent
//! compared to reads.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use trustgrid_common::{
    NodeRegistration, NodeStatus, OracleData, OracleNode, OracleSettings, RegistryError, Result,
    SubmissionError,
};

use crate::metrics::OracleMetrics;

/// Snapshot of registry health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub total_nodes: usize,
    pub active_nodes: usize,
    pub inactive_nodes: usize,
    pub penalized_nodes: usize,
    pub total_stake: Decimal,
    pub average_reputation: f64,
}

/// Registry of oracle nodes
pub struct NodeRegistry {
    settings: OracleSettings,
    nodes: RwLock<HashMap<String, OracleNode>>,
    metrics: Arc<OracleMetrics>,
}

impl NodeRegistry {
    pub fn new(settings: OracleSettings) -> Self {
        Self {
            settings,
            nodes: RwLock::new(HashMap::new()),
            metrics: Arc::new(OracleMetrics::new()),
        }
    }

    /// Share a metrics handle with the consensus engine
    pub fn with_metrics(mut self, metrics: Arc<OracleMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn settings(&self) -> &OracleSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &Arc<OracleMetrics> {
        &self.metrics
    }

    pub fn register(&self, registration: NodeRegistration) -> Result<OracleNode> {
        self.register_at(registration, Utc::now())
    }

    /// Register a node as of `now`
    ///
    /// Checked in order: credentials, capacity, duplicate id, stake.
    #[instrument(skip(self, registration), fields(node = %registration.id))]
    pub fn register_at(
        &self,
        registration: NodeRegistration,
        now: DateTime<Utc>,
    ) -> Result<OracleNode> {
        let result = self.try_register(registration, now);
        if let Err(err) = &result {
            warn!(error = %err, "Node registration rejected");
        }
        result
    }

    fn try_register(
        &self,
        registration: NodeRegistration,
        now: DateTime<Utc>,
    ) -> Result<OracleNode> {
        validate_credentials(&registration)?;

        let mut nodes = self.nodes.write();

        if nodes.len() >= self.settings.max_nodes {
            return Err(RegistryError::CapacityExceeded {
                max: self.settings.max_nodes,
            }
            .into());
        }
        if nodes.contains_key(&registration.id) {
            return Err(RegistryError::DuplicateNode(registration.id).into());
        }
        if registration.stake < self.settings.min_stake {
            return Err(RegistryError::InsufficientStake {
                required: self.settings.min_stake,
                available: registration.stake,
            }
            .into());
        }

        let node = OracleNode::from_registration(registration, now);
        nodes.insert(node.id.clone(), node.clone());
        self.metrics.active_nodes.set(count_active(&nodes) as i64);

        info!(
            node = %node.id,
            did = %node.did,
            stake = %node.stake,
            reputation = node.reputation,
            "Oracle node registered"
        );
        Ok(node)
    }

    pub fn submit_heartbeat(&self, node_id: &str) -> Result<NodeStatus> {
        self.submit_heartbeat_at(node_id, Utc::now())
    }

    /// Refresh a node's heartbeat, reactivating it if it had timed out
    pub fn submit_heartbeat_at(&self, node_id: &str, now: DateTime<Utc>) -> Result<NodeStatus> {
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(node_id)
            .ok_or_else(|| RegistryError::NodeNotFound(node_id.to_string()))?;

        match node.status {
            NodeStatus::Penalized => {
                return Err(RegistryError::NodePenalized(node_id.to_string()).into());
            }
            NodeStatus::Inactive => {
                node.status = NodeStatus::Active;
                info!(node = %node_id, "Oracle node reactivated by heartbeat");
            }
            NodeStatus::Active => {}
        }
        node.last_heartbeat = now;

        self.metrics.active_nodes.set(count_active(&nodes) as i64);
        Ok(NodeStatus::Active)
    }

    pub fn sweep_heartbeats(&self) -> Vec<String> {
        self.sweep_heartbeats_at(Utc::now())
    }

    /// Mark every active node whose heartbeat is older than the timeout inactive
    pub fn sweep_heartbeats_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let timeout = self.settings.heartbeat_timeout();
        let mut nodes = self.nodes.write();

        let mut expired = Vec::new();
        for node in nodes.values_mut() {
            if node.status == NodeStatus::Active && now - node.last_heartbeat > timeout {
                node.status = NodeStatus::Inactive;
                expired.push(node.id.clone());
                warn!(
                    node = %node.id,
                    last_heartbeat = %node.last_heartbeat,
                    "Oracle node heartbeat timed out"
                );
            }
        }

        if !expired.is_empty() {
            self.metrics.heartbeat_timeouts.inc_by(expired.len() as u64);
            self.metrics.active_nodes.set(count_active(&nodes) as i64);
        }
        expired
    }

    /// Run the heartbeat sweep every `period` until the task is aborted
    pub fn spawn_heartbeat_monitor(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let expired = registry.sweep_heartbeats();
                if !expired.is_empty() {
                    info!(count = expired.len(), "Heartbeat sweep deactivated nodes");
                }
            }
        })
    }

    /// Operator action: move a node to `penalized`
    pub fn penalize(&self, node_id: &str, reason: &str) -> Result<()> {
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(node_id)
            .ok_or_else(|| RegistryError::NodeNotFound(node_id.to_string()))?;

        node.status = NodeStatus::Penalized;
        warn!(node = %node_id, reason = %reason, "Oracle node penalized");

        self.metrics.active_nodes.set(count_active(&nodes) as i64);
        Ok(())
    }

    pub fn get(&self, node_id: &str) -> Option<OracleNode> {
        self.nodes.read().get(node_id).cloned()
    }

    pub fn list(&self) -> Vec<OracleNode> {
        let mut nodes: Vec<_> = self.nodes.read().values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    pub fn active_count(&self) -> usize {
        count_active(&self.nodes.read())
    }

    pub fn total_stake(&self) -> Decimal {
        self.nodes.read().values().map(|n| n.stake).sum()
    }

    pub fn network_stats(&self) -> NetworkStats {
        let nodes = self.nodes.read();
        let count = |status: NodeStatus| nodes.values().filter(|n| n.status == status).count();
        let reputations: Vec<f64> = nodes.values().map(|n| n.reputation).collect();

        NetworkStats {
            total_nodes: nodes.len(),
            active_nodes: count(NodeStatus::Active),
            inactive_nodes: count(NodeStatus::Inactive),
            penalized_nodes: count(NodeStatus::Penalized),
            total_stake: nodes.values().map(|n| n.stake).sum(),
            average_reputation: trustgrid_common::stats::mean(&reputations),
        }
    }

    /// Public key of an active node, for signature checks
    pub(crate) fn active_public_key(&self, node_id: &str) -> std::result::Result<String, SubmissionError> {
        let nodes = self.nodes.read();
        let node = nodes
            .get(node_id)
            .ok_or_else(|| SubmissionError::UnknownNode(node_id.to_string()))?;
        ensure_active(node)?;
        Ok(node.public_key.clone())
    }

    /// Append to an active node's submission log
    pub(crate) fn record_submission(
        &self,
        data: OracleData,
    ) -> std::result::Result<(), SubmissionError> {
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(&data.oracle_id)
            .ok_or_else(|| SubmissionError::UnknownNode(data.oracle_id.clone()))?;
        ensure_active(node)?;

        if node.submissions.iter().any(|s| s.id == data.id) {
            return Err(SubmissionError::MalformedPayload(format!(
                "duplicate submission id {}",
                data.id
            )));
        }

        debug!(node = %node.id, submission = %data.id, "Submission logged");
        node.log_submission(data, self.settings.submission_log_capacity);
        Ok(())
    }

    /// Run `f` over the node map under the read lock
    pub(crate) fn with_nodes<R>(&self, f: impl FnOnce(&HashMap<String, OracleNode>) -> R) -> R {
        f(&self.nodes.read())
    }

    /// Credit stake to nodes
    pub(crate) fn credit(&self, credits: &[(String, Decimal)]) {
        let mut nodes = self.nodes.write();
        for (node_id, amount) in credits {
            if let Some(node) = nodes.get_mut(node_id) {
                node.stake += *amount;
            }
        }
    }
}

fn validate_credentials(reg: &NodeRegistration) -> Result<()> {
    let missing: Vec<&str> = [
        ("id", &reg.id),
        ("did", &reg.did),
        ("endpoint", &reg.endpoint),
        ("public_key", &reg.public_key),
    ]
    .iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(name, _)| *name)
    .collect();

    if !missing.is_empty() {
        return Err(RegistryError::IncompleteCredentials(format!(
            "missing {}",
            missing.join(", ")
        ))
        .into());
    }
    if !reg.reputation.is_finite() || !(0.0..=100.0).contains(&reg.reputation) {
        return Err(RegistryError::IncompleteCredentials(format!(
            "reputation must be within 0-100, got {}",
            reg.reputation
        ))
        .into());
    }
    Ok(())
}

fn ensure_active(node: &OracleNode) -> std::result::Result<(), SubmissionError> {
    if node.is_active() {
        Ok(())
    } else {
        Err(SubmissionError::NodeNotActive {
            node_id: node.id.clone(),
            status: node.status.to_string(),
        })
    }
}

fn count_active(nodes: &HashMap<String, OracleNode>) -> usize {
    nodes.values().filter(|n| n.is_active()).count()
}
