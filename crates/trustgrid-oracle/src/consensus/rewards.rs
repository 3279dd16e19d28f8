//! Reward settlement for finalized consensus
//!
//! Each contributing node receives an equal share of the pool scaled by
//! how accurate its submissions were and by its reputation.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use trustgrid_common::{OracleConsensus, OracleData};

/// Decimal places kept on credited amounts
pub const REWARD_SCALE: u32 = 8;

/// Credit to one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReward {
    pub node_id: String,
    /// Share of this node's submissions that agreed with the consensus value
    pub accuracy: f64,
    pub reputation: f64,
    pub amount: Decimal,
}

/// Result of settling one consensus record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSummary {
    pub consensus_id: String,
    pub rewards: Vec<NodeReward>,
    pub total: Decimal,
}

impl RewardSummary {
    pub fn amount_for(&self, node_id: &str) -> Option<Decimal> {
        self.rewards
            .iter()
            .find(|r| r.node_id == node_id)
            .map(|r| r.amount)
    }

    pub fn total_f64(&self) -> f64 {
        self.total.to_f64().unwrap_or_default()
    }
}

/// Outcome of a reward distribution request
#[derive(Debug, Clone, PartialEq)]
pub enum RewardOutcome {
    Distributed(RewardSummary),
    /// Rewards for this record were paid earlier
    AlreadySettled,
}

/// Whether a submission agrees with the consensus value
///
/// Numbers agree within `tolerance`; anything else must be equal.
pub fn is_accurate(submission: &OracleData, consensus: &Value, tolerance: f64) -> bool {
    match (submission.numeric_value(), consensus.as_f64()) {
        (Some(reported), Some(agreed)) => (reported - agreed).abs() <= tolerance,
        _ => submission.data.value == *consensus,
    }
}

/// Compute per-node rewards for `record`
///
/// Nodes missing from `reputations` are paid as reputation 0.
pub fn compute_rewards(
    record: &OracleConsensus,
    reputations: &HashMap<String, f64>,
    pool: Decimal,
    tolerance: f64,
) -> RewardSummary {
    // (total, accurate) per node, in first-contribution order
    let mut per_node: Vec<(&str, usize, usize)> = Vec::new();
    for submission in &record.submissions {
        let accurate = is_accurate(submission, &record.consensus_result.value, tolerance);
        let idx = match per_node.iter().position(|(id, _, _)| *id == submission.oracle_id) {
            Some(idx) => idx,
            None => {
                per_node.push((submission.oracle_id.as_str(), 0, 0));
                per_node.len() - 1
            }
        };
        per_node[idx].1 += 1;
        if accurate {
            per_node[idx].2 += 1;
        }
    }

    if per_node.is_empty() {
        return RewardSummary {
            consensus_id: record.id.clone(),
            rewards: Vec::new(),
            total: Decimal::ZERO,
        };
    }

    let share = pool / Decimal::from(per_node.len());
    let rewards: Vec<NodeReward> = per_node
        .into_iter()
        .map(|(node_id, total, accurate)| {
            let accuracy = accurate as f64 / total as f64;
            let reputation = reputations.get(node_id).copied().unwrap_or_default();
            let factor = Decimal::from_f64(accuracy * reputation / 100.0).unwrap_or_default();
            NodeReward {
                node_id: node_id.to_string(),
                accuracy,
                reputation,
                amount: (share * factor).round_dp(REWARD_SCALE),
            }
        })
        .collect();

    let total = rewards.iter().map(|r| r.amount).sum();
    RewardSummary {
        consensus_id: record.id.clone(),
        rewards,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use trustgrid_common::{ConsensusAlgorithm, ConsensusResult, OraclePayload};

    fn submission(id: &str, node: &str, value: Value) -> OracleData {
        OracleData {
            id: id.to_string(),
            oracle_id: node.to_string(),
            data_type: "trust_score".to_string(),
            data: OraclePayload {
                target_did: "did:web:agent".to_string(),
                value,
            },
            signature: "sig".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn record(value: Value, submissions: Vec<OracleData>) -> OracleConsensus {
        OracleConsensus {
            id: "c1".to_string(),
            data_type: "trust_score".to_string(),
            target_did: "did:web:agent".to_string(),
            submissions,
            consensus_result: ConsensusResult {
                value,
                confidence: 1.0,
            },
            consensus_algorithm: ConsensusAlgorithm::WeightedAverage,
            threshold: 0.67,
            finalized_at: Utc::now(),
            reward_distributed: false,
        }
    }

    #[test]
    fn test_accuracy_rules() {
        let close = submission("s", "n", json!(0.85));
        assert!(is_accurate(&close, &json!(0.8), 0.1));
        assert!(!is_accurate(&close, &json!(0.7), 0.1));

        let status = submission("s", "n", json!("valid"));
        assert!(is_accurate(&status, &json!("valid"), 0.1));
        assert!(!is_accurate(&status, &json!("revoked"), 0.1));
    }

    #[test]
    fn test_rewards_scale_with_accuracy_and_reputation() {
        let rec = record(
            json!(0.8),
            vec![
                submission("s1", "a", json!(0.8)),
                submission("s2", "b", json!(0.8)),
                submission("s3", "b", json!(0.2)),
            ],
        );
        let reps = HashMap::from([("a".to_string(), 100.0), ("b".to_string(), 50.0)]);

        let summary = compute_rewards(&rec, &reps, dec!(100), 0.1);
        // 50 per node; a: 1.0 * 1.0; b: 0.5 * 0.5
        assert_eq!(summary.amount_for("a"), Some(dec!(50)));
        assert_eq!(summary.amount_for("b"), Some(dec!(12.5)));
        assert_eq!(summary.total, dec!(62.5));
    }

    #[test]
    fn test_unknown_node_gets_nothing() {
        let rec = record(json!("valid"), vec![submission("s1", "gone", json!("valid"))]);
        let summary = compute_rewards(&rec, &HashMap::new(), dec!(100), 0.1);
        assert_eq!(summary.amount_for("gone"), Some(Decimal::ZERO));
    }
}
