//! Oracle node, submission, and consensus records
//!
//! Nodes report observed values for a `(data_type, target_did)` pair.
//! Submissions are append-only; a consensus record is created once per
//! submission window and only its reward flag changes afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Well-known data types reported by oracle nodes
pub mod data_types {
    pub const TRUST_SCORE: &str = "trust_score";
    pub const REPUTATION: &str = "reputation";
    pub const CREDENTIAL_STATUS: &str = "credential_status";
    pub const COMPLIANCE_STATUS: &str = "compliance_status";
}

/// Oracle node lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Active,
    Inactive,
    /// Set only by an explicit operator action
    Penalized,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Penalized => "penalized",
        };
        f.write_str(s)
    }
}

/// Registration request for a new oracle node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRegistration {
    pub id: String,
    pub did: String,
    pub endpoint: String,
    pub public_key: String,
    pub stake: Decimal,
    /// Reputation on a 0-100 scale
    pub reputation: f64,
}

/// Reported value for a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraclePayload {
    #[serde(rename = "targetDID", alias = "target_did")]
    pub target_did: String,
    pub value: serde_json::Value,
}

/// One node's report for a `(data_type, target_did)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleData {
    pub id: String,
    pub oracle_id: String,
    pub data_type: String,
    pub data: OraclePayload,
    pub signature: String,
    pub timestamp: DateTime<Utc>,
}

impl OracleData {
    pub fn key(&self) -> ConsensusKey {
        ConsensusKey::new(&self.data_type, &self.data.target_did)
    }

    /// Numeric view of the reported value
    pub fn numeric_value(&self) -> Option<f64> {
        self.data.value.as_f64()
    }
}

/// Registered oracle node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleNode {
    pub id: String,
    pub did: String,
    pub endpoint: String,
    pub public_key: String,
    pub stake: Decimal,
    pub reputation: f64,
    pub status: NodeStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
    /// Most recent submissions, oldest first
    pub submissions: VecDeque<OracleData>,
}

impl OracleNode {
    /// Create an active node from a validated registration
    pub fn from_registration(reg: NodeRegistration, now: DateTime<Utc>) -> Self {
        Self {
            id: reg.id,
            did: reg.did,
            endpoint: reg.endpoint,
            public_key: reg.public_key,
            stake: reg.stake,
            reputation: reg.reputation,
            status: NodeStatus::Active,
            last_heartbeat: now,
            registered_at: now,
            submissions: VecDeque::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }

    /// Append to the submission log, evicting the oldest entry at capacity
    pub fn log_submission(&mut self, data: OracleData, capacity: usize) {
        if capacity == 0 {
            return;
        }
        while self.submissions.len() >= capacity {
            self.submissions.pop_front();
        }
        self.submissions.push_back(data);
    }
}

/// Lookup key for consensus serialization
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsensusKey {
    pub data_type: String,
    pub target_did: String,
}

impl ConsensusKey {
    pub fn new(data_type: &str, target_did: &str) -> Self {
        Self {
            data_type: data_type.to_string(),
            target_did: target_did.to_string(),
        }
    }
}

impl std::fmt::Display for ConsensusKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.data_type, self.target_did)
    }
}

/// Aggregation algorithm used to reach consensus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusAlgorithm {
    WeightedAverage,
    Median,
    Majority,
}

impl std::fmt::Display for ConsensusAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::WeightedAverage => "weighted_average",
            Self::Median => "median",
            Self::Majority => "majority",
        };
        f.write_str(s)
    }
}

/// Agreed value with its confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub value: serde_json::Value,
    pub confidence: f64,
}

/// Finalized agreement for a `(data_type, target_did)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConsensus {
    pub id: String,
    pub data_type: String,
    #[serde(rename = "targetDID", alias = "target_did")]
    pub target_did: String,
    pub submissions: Vec<OracleData>,
    pub consensus_result: ConsensusResult,
    pub consensus_algorithm: ConsensusAlgorithm,
    pub threshold: f64,
    pub finalized_at: DateTime<Utc>,
    pub reward_distributed: bool,
}

impl OracleConsensus {
    pub fn key(&self) -> ConsensusKey {
        ConsensusKey::new(&self.data_type, &self.target_did)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn data(id: &str) -> OracleData {
        OracleData {
            id: id.to_string(),
            oracle_id: "node-1".to_string(),
            data_type: data_types::TRUST_SCORE.to_string(),
            data: OraclePayload {
                target_did: "did:web:agent".to_string(),
                value: serde_json::json!(0.8),
            },
            signature: "sig".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_submission_log_is_bounded() {
        let reg = NodeRegistration {
            id: "node-1".to_string(),
            did: "did:key:node1".to_string(),
            endpoint: "https://node1.example".to_string(),
            public_key: "pk".to_string(),
            stake: dec!(5000),
            reputation: 85.0,
        };
        let mut node = OracleNode::from_registration(reg, Utc::now());
        for i in 0..5 {
            node.log_submission(data(&format!("s{i}")), 3);
        }
        assert_eq!(node.submissions.len(), 3);
        assert_eq!(node.submissions.front().unwrap().id, "s2");
        assert_eq!(node.submissions.back().unwrap().id, "s4");
    }

    #[test]
    fn test_payload_wire_shape() {
        let json = serde_json::json!({ "targetDID": "did:web:x", "value": "valid" });
        let payload: OraclePayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.target_did, "did:web:x");
        assert_eq!(data("s").key().to_string(), "trust_score:did:web:agent");
    }
}
