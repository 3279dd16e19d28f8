//! Oracle consensus engine
//!
//! Accepts signed submissions from active nodes, finalizes a consensus
//! record once enough distinct nodes agree to report on a key, and settles
//! rewards exactly once per record.
//!
//! Check-then-create and reward settlement for a `(data_type, target_did)`
//! key run under that key's mutex, so a key never gets two records from
//! the same submissions. Lock order is key lock, then registry lock.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use trustgrid_common::{
    data_types, ConsensusAlgorithm, ConsensusError, ConsensusKey, OracleConsensus, OracleData,
    OracleSettings, Result, SubmissionError,
};

use super::algorithms::{aggregate, Sample};
use super::rewards::{compute_rewards, RewardOutcome, RewardSummary};
use super::store::ConsensusStore;
use crate::metrics::OracleMetrics;
use crate::registry::NodeRegistry;
use crate::signature::{NonEmptySignature, SignatureVerifier};

/// Result of submitting oracle data
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Not enough distinct nodes have reported yet
    Pending { have: usize, required: usize },
    /// This submission completed a consensus record
    Finalized(Box<OracleConsensus>),
    /// Enough nodes reported but aggregation failed; the submission is kept
    Failed { reason: String },
}

impl SubmissionOutcome {
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized(_))
    }

    pub fn consensus(&self) -> Option<&OracleConsensus> {
        match self {
            Self::Finalized(record) => Some(record),
            _ => None,
        }
    }
}

/// Submissions waiting to be folded into a record for one key
#[derive(Debug, Default)]
struct KeyState {
    pending: Vec<OracleData>,
}

/// Oracle consensus engine
pub struct ConsensusEngine {
    settings: OracleSettings,
    registry: Arc<NodeRegistry>,
    store: Arc<dyn ConsensusStore>,
    verifier: Arc<dyn SignatureVerifier>,
    keys: DashMap<ConsensusKey, Arc<Mutex<KeyState>>>,
    sequence: AtomicU64,
}

impl ConsensusEngine {
    /// Create an engine sharing the registry's settings and metrics
    pub fn new(registry: Arc<NodeRegistry>, store: Arc<dyn ConsensusStore>) -> Self {
        Self {
            settings: registry.settings().clone(),
            registry,
            store,
            verifier: Arc::new(NonEmptySignature),
            keys: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Use a different signature verifier
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    fn metrics(&self) -> &OracleMetrics {
        self.registry.metrics()
    }

    /// Algorithm used for a data type
    pub fn algorithm_for(&self, data_type: &str) -> ConsensusAlgorithm {
        if let Some(algorithm) = self.settings.algorithms.get(data_type) {
            return *algorithm;
        }
        match data_type {
            data_types::REPUTATION => ConsensusAlgorithm::Median,
            data_types::CREDENTIAL_STATUS | data_types::COMPLIANCE_STATUS => {
                ConsensusAlgorithm::Majority
            }
            _ => ConsensusAlgorithm::WeightedAverage,
        }
    }

    /// Submissions needed for consensus with the current active node count
    pub fn required_submissions(&self) -> usize {
        required_for(self.registry.active_count(), self.settings.consensus_threshold)
    }

    pub fn submit(&self, data: OracleData) -> Result<SubmissionOutcome> {
        self.submit_at(data, Utc::now())
    }

    /// Validate and record a submission as of `now`, then check consensus for its key
    #[instrument(skip(self, data), fields(submission = %data.id, node = %data.oracle_id, key = %data.key()))]
    pub fn submit_at(&self, data: OracleData, now: DateTime<Utc>) -> Result<SubmissionOutcome> {
        if let Err(err) = self.validate(&data, now) {
            self.reject(&err);
            return Err(err.into());
        }

        let key = data.key();
        let result = {
            let state = self.key_state(&key);
            let mut state = state.lock();

            match self.registry.record_submission(data.clone()) {
                Err(err) => {
                    self.reject(&err);
                    Err(err.into())
                }
                Ok(()) => {
                    self.metrics().submissions_accepted.inc();
                    debug!("Submission accepted");
                    state.pending.push(data);
                    Ok(self.check_locked(&key, &mut state, now))
                }
            }
        };
        self.release_key(&key);
        result
    }

    fn validate(
        &self,
        data: &OracleData,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), SubmissionError> {
        validate_payload(data, now, &self.settings)?;

        let algorithm = self.algorithm_for(&data.data_type);
        let numeric = matches!(
            algorithm,
            ConsensusAlgorithm::WeightedAverage | ConsensusAlgorithm::Median
        );
        if numeric && !data.numeric_value().is_some_and(f64::is_finite) {
            return Err(SubmissionError::MalformedPayload(format!(
                "{} expects a finite number for {algorithm}, got {}",
                data.data_type, data.data.value
            )));
        }

        let public_key = self.registry.active_public_key(&data.oracle_id)?;
        if !self.verifier.verify(data, &public_key) {
            return Err(SubmissionError::InvalidSignature(data.id.clone()));
        }
        Ok(())
    }

    fn reject(&self, err: &SubmissionError) {
        self.metrics().submissions_rejected.inc();
        warn!(error = %err, "Submission rejected");
    }

    pub fn check_consensus(&self, data_type: &str, target_did: &str) -> SubmissionOutcome {
        self.check_consensus_at(data_type, target_did, Utc::now())
    }

    /// Re-run the consensus check for a key without a new submission
    pub fn check_consensus_at(
        &self,
        data_type: &str,
        target_did: &str,
        now: DateTime<Utc>,
    ) -> SubmissionOutcome {
        let key = ConsensusKey::new(data_type, target_did);
        let outcome = {
            let state = self.key_state(&key);
            let mut state = state.lock();
            self.check_locked(&key, &mut state, now)
        };
        self.release_key(&key);
        outcome
    }

    /// Caller holds the key lock
    fn check_locked(
        &self,
        key: &ConsensusKey,
        state: &mut KeyState,
        now: DateTime<Utc>,
    ) -> SubmissionOutcome {
        let window = self.settings.freshness_window();
        state.pending.retain(|s| now - s.timestamp <= window);

        let (active, reputations) = self.registry.with_nodes(|nodes| {
            let active = nodes.values().filter(|n| n.is_active()).count();
            let reputations: HashMap<String, f64> = nodes
                .values()
                .filter(|n| n.is_active())
                .map(|n| (n.id.clone(), n.reputation))
                .collect();
            (active, reputations)
        });

        let contributing: Vec<&OracleData> = state
            .pending
            .iter()
            .filter(|s| reputations.contains_key(&s.oracle_id))
            .collect();
        let have = contributing
            .iter()
            .map(|s| s.oracle_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        let required = required_for(active, self.settings.consensus_threshold);

        if have < required {
            debug!(have, required, "Consensus pending");
            return SubmissionOutcome::Pending { have, required };
        }

        let algorithm = self.algorithm_for(&key.data_type);
        let samples: Vec<Sample<'_>> = contributing
            .iter()
            .map(|data| Sample {
                data,
                reputation: reputations[&data.oracle_id],
            })
            .collect();

        let result = match aggregate(algorithm, &samples) {
            Ok(result) => result,
            Err(err) => {
                self.metrics().consensus_failed.inc();
                error!(key = %key, algorithm = %algorithm, error = %err, "Consensus aggregation failed");
                return SubmissionOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        let submissions: Vec<OracleData> = contributing.into_iter().cloned().collect();
        let record = OracleConsensus {
            id: self.record_id(key, now),
            data_type: key.data_type.clone(),
            target_did: key.target_did.clone(),
            submissions,
            consensus_result: result,
            consensus_algorithm: algorithm,
            threshold: self.settings.consensus_threshold,
            finalized_at: now,
            reward_distributed: false,
        };

        if let Err(err) = self.store.insert(record.clone()) {
            self.metrics().consensus_failed.inc();
            error!(key = %key, error = %err, "Failed to store consensus record");
            return SubmissionOutcome::Failed {
                reason: err.to_string(),
            };
        }

        let consumed: HashSet<&str> = record.submissions.iter().map(|s| s.id.as_str()).collect();
        state.pending.retain(|s| !consumed.contains(s.id.as_str()));
        self.metrics().consensus_finalized.inc();

        info!(
            consensus = %record.id,
            key = %key,
            algorithm = %algorithm,
            value = %record.consensus_result.value,
            confidence = record.consensus_result.confidence,
            submissions = record.submissions.len(),
            "Consensus finalized"
        );

        if !self.settings.auto_distribute_rewards {
            return SubmissionOutcome::Finalized(Box::new(record));
        }

        match self.settle_locked(&record.id) {
            Ok(_) => {
                let settled = self.store.get(&record.id).unwrap_or(record);
                SubmissionOutcome::Finalized(Box::new(settled))
            }
            Err(err) => {
                error!(consensus = %record.id, error = %err, "Automatic reward distribution failed");
                SubmissionOutcome::Finalized(Box::new(record))
            }
        }
    }

    /// Pay rewards for a record, at most once
    #[instrument(skip(self))]
    pub fn distribute_rewards(&self, consensus_id: &str) -> Result<RewardOutcome> {
        let record = self
            .store
            .get(consensus_id)
            .ok_or_else(|| ConsensusError::NotFound(consensus_id.to_string()))?;

        let key = record.key();
        let result = {
            let state = self.key_state(&key);
            let _guard = state.lock();
            self.settle_locked(consensus_id)
        };
        self.release_key(&key);
        result
    }

    /// Caller holds the key lock for the record
    fn settle_locked(&self, consensus_id: &str) -> Result<RewardOutcome> {
        let record = self
            .store
            .get(consensus_id)
            .ok_or_else(|| ConsensusError::NotFound(consensus_id.to_string()))?;
        if record.reward_distributed {
            debug!(consensus = %consensus_id, "Rewards already settled");
            return Ok(RewardOutcome::AlreadySettled);
        }

        let reputations: HashMap<String, f64> = self.registry.with_nodes(|nodes| {
            nodes
                .values()
                .map(|n| (n.id.clone(), n.reputation))
                .collect()
        });
        let summary = compute_rewards(
            &record,
            &reputations,
            self.settings.reward_pool,
            self.settings.accuracy_tolerance,
        );

        if !self.store.mark_rewarded(consensus_id)? {
            return Ok(RewardOutcome::AlreadySettled);
        }
        self.credit(&summary);

        info!(
            consensus = %consensus_id,
            nodes = summary.rewards.len(),
            total = %summary.total,
            "Rewards distributed"
        );
        Ok(RewardOutcome::Distributed(summary))
    }

    fn credit(&self, summary: &RewardSummary) {
        let credits: Vec<_> = summary
            .rewards
            .iter()
            .map(|r| (r.node_id.clone(), r.amount))
            .collect();
        self.registry.credit(&credits);
        self.metrics().rewards_distributed.inc_by(summary.total_f64());
    }

    pub fn get_consensus(&self, consensus_id: &str) -> Option<OracleConsensus> {
        self.store.get(consensus_id)
    }

    /// Most recent record for a key
    pub fn consensus_for(&self, data_type: &str, target_did: &str) -> Option<OracleConsensus> {
        self.store
            .for_key(&ConsensusKey::new(data_type, target_did))
            .into_iter()
            .max_by_key(|r| r.finalized_at)
    }

    /// Submissions held for a key that no record has consumed yet
    pub fn pending_submissions(&self, data_type: &str, target_did: &str) -> usize {
        let state = self
            .keys
            .get(&ConsensusKey::new(data_type, target_did))
            .map(|state| Arc::clone(&state));
        state.map(|state| state.lock().pending.len()).unwrap_or(0)
    }

    /// Keys currently holding state
    pub fn tracked_keys(&self) -> usize {
        self.keys.len()
    }

    pub fn prune_stale(&self) -> usize {
        self.prune_stale_at(Utc::now())
    }

    /// Drop expired submissions from every key and forget keys left empty
    ///
    /// Returns the number of keys released.
    pub fn prune_stale_at(&self, now: DateTime<Utc>) -> usize {
        let window = self.settings.freshness_window();
        let keys: Vec<ConsensusKey> = self.keys.iter().map(|entry| entry.key().clone()).collect();

        let mut expired = 0;
        let mut released = 0;
        for key in &keys {
            if let Some(state) = self.keys.get(key).map(|state| Arc::clone(&state)) {
                let mut state = state.lock();
                let before = state.pending.len();
                state.pending.retain(|s| now - s.timestamp <= window);
                expired += before - state.pending.len();
            }
            if self.release_key(key) {
                released += 1;
            }
        }

        if released > 0 || expired > 0 {
            debug!(released, expired, remaining = self.keys.len(), "Pruned stale consensus keys");
        }
        released
    }

    /// Run [`Self::prune_stale`] every `period` until the task is aborted
    pub fn spawn_stale_pruner(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                engine.prune_stale();
            }
        })
    }

    fn key_state(&self, key: &ConsensusKey) -> Arc<Mutex<KeyState>> {
        self.keys.entry(key.clone()).or_default().clone()
    }

    /// Remove a key's state if nothing is pending and no caller holds it
    ///
    /// Handles are cloned under the shard lock `remove_if` holds, so a
    /// strong count of one means no caller can be waiting on the mutex.
    fn release_key(&self, key: &ConsensusKey) -> bool {
        self.keys
            .remove_if(key, |_, state| {
                Arc::strong_count(state) == 1
                    && state.try_lock().is_some_and(|s| s.pending.is_empty())
            })
            .is_some()
    }

    fn record_id(&self, key: &ConsensusKey, now: DateTime<Utc>) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new();
        hasher.update(key.data_type.as_bytes());
        hasher.update(&[0]);
        hasher.update(key.target_did.as_bytes());
        hasher.update(&[0]);
        hasher.update(&now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        hasher.update(&sequence.to_le_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

/// `ceil(active × threshold)`, at least one
pub fn required_for(active: usize, threshold: f64) -> usize {
    // 1e-9 absorbs float error such as 100 × 0.67 = 67.00000000000001
    let required = (active as f64 * threshold - 1e-9).ceil();
    (required.max(1.0)) as usize
}

fn validate_payload(
    data: &OracleData,
    now: DateTime<Utc>,
    settings: &OracleSettings,
) -> std::result::Result<(), SubmissionError> {
    let malformed = |msg: &str| Err(SubmissionError::MalformedPayload(msg.to_string()));

    if data.id.trim().is_empty() {
        return malformed("empty submission id");
    }
    if data.data_type.trim().is_empty() {
        return malformed("empty data type");
    }
    if data.data.target_did.trim().is_empty() {
        return malformed("empty target DID");
    }
    if data.data.value.is_null() {
        return malformed("missing value");
    }
    if data.timestamp - now > settings.max_clock_skew() {
        return Err(SubmissionError::MalformedPayload(format!(
            "timestamp {} is in the future",
            data.timestamp
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::store::{InMemoryConsensusStore, MockConsensusStore, StoreError};
    use crate::signature::MockSignatureVerifier;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use trustgrid_common::{NodeRegistration, OraclePayload, TrustGridError};

    const TARGET: &str = "did:web:agent";

    fn registry_with(nodes: &[(&str, f64)], settings: OracleSettings) -> Arc<NodeRegistry> {
        let registry = NodeRegistry::new(settings);
        for (id, reputation) in nodes {
            registry
                .register(NodeRegistration {
                    id: id.to_string(),
                    did: format!("did:key:{id}"),
                    endpoint: format!("https://{id}.example"),
                    public_key: format!("pk-{id}"),
                    stake: dec!(5000),
                    reputation: *reputation,
                })
                .unwrap();
        }
        Arc::new(registry)
    }

    fn engine(nodes: &[(&str, f64)]) -> ConsensusEngine {
        let registry = registry_with(nodes, OracleSettings::default());
        ConsensusEngine::new(registry, Arc::new(InMemoryConsensusStore::new()))
    }

    fn data(id: &str, node: &str, data_type: &str, value: Value) -> OracleData {
        OracleData {
            id: id.to_string(),
            oracle_id: node.to_string(),
            data_type: data_type.to_string(),
            data: OraclePayload {
                target_did: TARGET.to_string(),
                value,
            },
            signature: "sig".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_required_for() {
        assert_eq!(required_for(3, 0.67), 3);
        assert_eq!(required_for(5, 0.67), 4);
        assert_eq!(required_for(100, 0.67), 67);
        assert_eq!(required_for(1, 0.67), 1);
        assert_eq!(required_for(0, 0.67), 1);
    }

    #[test]
    fn test_algorithm_selection() {
        let mut settings = OracleSettings::default();
        settings
            .algorithms
            .insert("custom_metric".to_string(), ConsensusAlgorithm::Median);
        let registry = registry_with(&[], settings);
        let engine = ConsensusEngine::new(registry, Arc::new(InMemoryConsensusStore::new()));

        assert_eq!(engine.algorithm_for("trust_score"), ConsensusAlgorithm::WeightedAverage);
        assert_eq!(engine.algorithm_for("reputation"), ConsensusAlgorithm::Median);
        assert_eq!(engine.algorithm_for("credential_status"), ConsensusAlgorithm::Majority);
        assert_eq!(engine.algorithm_for("compliance_status"), ConsensusAlgorithm::Majority);
        assert_eq!(engine.algorithm_for("custom_metric"), ConsensusAlgorithm::Median);
        assert_eq!(engine.algorithm_for("unlisted"), ConsensusAlgorithm::WeightedAverage);
    }

    #[test]
    fn test_pending_until_threshold() {
        let engine = engine(&[("a", 80.0), ("b", 80.0), ("c", 80.0)]);

        let outcome = engine.submit(data("s1", "a", "trust_score", json!(0.8))).unwrap();
        assert_eq!(outcome, SubmissionOutcome::Pending { have: 1, required: 3 });

        // a second report from the same node does not count twice
        let outcome = engine.submit(data("s2", "a", "trust_score", json!(0.8))).unwrap();
        assert_eq!(outcome, SubmissionOutcome::Pending { have: 1, required: 3 });

        engine.submit(data("s3", "b", "trust_score", json!(0.8))).unwrap();
        let outcome = engine.submit(data("s4", "c", "trust_score", json!(0.8))).unwrap();
        let record = outcome.consensus().unwrap();
        assert_eq!(record.submissions.len(), 4);
        assert_eq!(engine.pending_submissions("trust_score", TARGET), 0);
        assert_eq!(engine.tracked_keys(), 0);
    }

    #[test]
    fn test_rejections() {
        let engine = engine(&[("a", 80.0)]);

        let err = engine.submit(data("s1", "ghost", "trust_score", json!(0.5))).unwrap_err();
        assert!(matches!(err, TrustGridError::Submission(SubmissionError::UnknownNode(_))));

        let mut unsigned = data("s2", "a", "trust_score", json!(0.5));
        unsigned.signature = String::new();
        assert!(matches!(
            engine.submit(unsigned).unwrap_err(),
            TrustGridError::Submission(SubmissionError::InvalidSignature(_))
        ));

        let null_value = data("s3", "a", "trust_score", Value::Null);
        assert!(matches!(
            engine.submit(null_value).unwrap_err(),
            TrustGridError::Submission(SubmissionError::MalformedPayload(_))
        ));

        let mut future = data("s4", "a", "trust_score", json!(0.5));
        future.timestamp = Utc::now() + Duration::minutes(10);
        assert!(matches!(
            engine.submit(future).unwrap_err(),
            TrustGridError::Submission(SubmissionError::MalformedPayload(_))
        ));

        engine.registry().penalize("a", "test").unwrap();
        assert!(matches!(
            engine.submit(data("s5", "a", "trust_score", json!(0.5))).unwrap_err(),
            TrustGridError::Submission(SubmissionError::NodeNotActive { .. })
        ));
        assert_eq!(engine.registry().metrics().submissions_rejected.get(), 5);
    }

    #[test]
    fn test_duplicate_submission_id_rejected() {
        let engine = engine(&[("a", 80.0), ("b", 80.0)]);
        engine.submit(data("s1", "a", "trust_score", json!(0.5))).unwrap();
        assert!(matches!(
            engine.submit(data("s1", "a", "trust_score", json!(0.5))).unwrap_err(),
            TrustGridError::Submission(SubmissionError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_injected_verifier_is_consulted() {
        let mut verifier = MockSignatureVerifier::new();
        verifier
            .expect_verify()
            .withf(|data, public_key| data.oracle_id == "a" && public_key.to_string() == "pk-a")
            .times(1)
            .return_const(false);

        let registry = registry_with(&[("a", 80.0)], OracleSettings::default());
        let engine = ConsensusEngine::new(registry, Arc::new(InMemoryConsensusStore::new()))
            .with_verifier(Arc::new(verifier));

        assert!(matches!(
            engine.submit(data("s1", "a", "trust_score", json!(0.5))).unwrap_err(),
            TrustGridError::Submission(SubmissionError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_stale_submissions_do_not_count() {
        let engine = engine(&[("a", 80.0), ("b", 80.0)]);
        let t0 = Utc::now();

        let mut old = data("s1", "a", "trust_score", json!(0.5));
        old.timestamp = t0;
        engine.submit_at(old, t0).unwrap();

        let mut fresh = data("s2", "b", "trust_score", json!(0.5));
        fresh.timestamp = t0 + Duration::minutes(6);
        let outcome = engine.submit_at(fresh, t0 + Duration::minutes(6)).unwrap();
        assert_eq!(outcome, SubmissionOutcome::Pending { have: 1, required: 2 });
    }

    #[test]
    fn test_non_numeric_report_cannot_block_numeric_key() {
        let engine = engine(&[("a", 85.0), ("b", 92.0), ("c", 78.0)]);

        assert!(matches!(
            engine.submit(data("s1", "a", "trust_score", json!("garbage"))).unwrap_err(),
            TrustGridError::Submission(SubmissionError::MalformedPayload(_))
        ));
        assert_eq!(engine.pending_submissions("trust_score", TARGET), 0);

        let outcome = engine.submit(data("s2", "b", "trust_score", json!(0.85))).unwrap();
        assert_eq!(outcome, SubmissionOutcome::Pending { have: 1, required: 3 });
        let outcome = engine.submit(data("s3", "c", "trust_score", json!(0.90))).unwrap();
        assert_eq!(outcome, SubmissionOutcome::Pending { have: 2, required: 3 });

        let outcome = engine.submit(data("s4", "a", "trust_score", json!(0.80))).unwrap();
        let record = outcome.consensus().expect("valid reports finalize");
        assert_eq!(record.submissions.len(), 3);
        assert!(engine.consensus_for("trust_score", TARGET).is_some());
    }

    #[test]
    fn test_numeric_check_follows_algorithm() {
        let engine = engine(&[("a", 80.0), ("b", 80.0)]);

        // median data types need numbers too
        assert!(matches!(
            engine.submit(data("s1", "a", "reputation", json!({"score": 4}))).unwrap_err(),
            TrustGridError::Submission(SubmissionError::MalformedPayload(_))
        ));

        // majority data types take any value
        let outcome = engine
            .submit(data("s2", "a", "credential_status", json!("valid")))
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Pending { have: 1, required: 2 });
    }

    #[test]
    fn test_store_failure_keeps_submissions_pending() {
        let mut store = MockConsensusStore::new();
        store
            .expect_insert()
            .times(1)
            .returning(|record| Err(StoreError::StorageError(format!("disk full writing {}", record.id))));
        store.expect_get().never();

        let registry = registry_with(&[("a", 80.0)], OracleSettings::default());
        let engine = ConsensusEngine::new(registry, Arc::new(store));

        match engine.submit(data("s1", "a", "trust_score", json!(0.6))).unwrap() {
            SubmissionOutcome::Failed { reason } => assert!(reason.contains("disk full")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(engine.pending_submissions("trust_score", TARGET), 1);
        assert_eq!(engine.tracked_keys(), 1);
        assert_eq!(engine.registry().metrics().consensus_failed.get(), 1);
        assert_eq!(engine.registry().metrics().consensus_finalized.get(), 0);
    }

    #[test]
    fn test_stale_keys_are_pruned() {
        let engine = engine(&[("a", 80.0), ("b", 80.0)]);
        let t0 = Utc::now();

        for i in 0..50 {
            let mut report = data(&format!("s{i}"), "a", "trust_score", json!(0.5));
            report.data.target_did = format!("did:web:target-{i}");
            report.timestamp = t0;
            engine.submit_at(report, t0).unwrap();
        }
        assert_eq!(engine.tracked_keys(), 50);

        // still fresh
        assert_eq!(engine.prune_stale_at(t0 + Duration::minutes(2)), 0);
        assert_eq!(engine.tracked_keys(), 50);

        assert_eq!(engine.prune_stale_at(t0 + Duration::hours(1)), 50);
        assert_eq!(engine.tracked_keys(), 0);
    }

    #[test]
    fn test_keys_released_after_rejection_and_settlement() {
        let engine = engine(&[("a", 100.0)]);

        let mut future = data("s1", "a", "trust_score", json!(0.5));
        future.timestamp = Utc::now() + Duration::minutes(10);
        assert!(engine.submit(future).is_err());
        assert_eq!(engine.tracked_keys(), 0);

        let outcome = engine.submit(data("s2", "a", "trust_score", json!(0.5))).unwrap();
        let record = outcome.consensus().unwrap().clone();
        assert_eq!(engine.tracked_keys(), 0);

        assert_eq!(
            engine.distribute_rewards(&record.id).unwrap(),
            RewardOutcome::AlreadySettled
        );
        assert_eq!(engine.check_consensus("trust_score", TARGET), SubmissionOutcome::Pending {
            have: 0,
            required: 1,
        });
        assert_eq!(engine.tracked_keys(), 0);
    }

    #[test]
    fn test_zero_reputation_fails_weighted_average() {
        let engine = engine(&[("a", 0.0)]);
        let outcome = engine.submit(data("s1", "a", "trust_score", json!(0.5))).unwrap();
        match outcome {
            SubmissionOutcome::Failed { reason } => assert!(reason.contains("reputation")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(engine.pending_submissions("trust_score", TARGET), 1);
        assert_eq!(engine.registry().metrics().consensus_failed.get(), 1);
    }

    #[test]
    fn test_rewards_settle_once() {
        let settings = OracleSettings {
            auto_distribute_rewards: false,
            ..Default::default()
        };
        let registry = registry_with(&[("a", 100.0)], settings);
        let engine = ConsensusEngine::new(registry, Arc::new(InMemoryConsensusStore::new()));

        let outcome = engine.submit(data("s1", "a", "trust_score", json!(0.7))).unwrap();
        let record = outcome.consensus().unwrap().clone();
        assert!(!record.reward_distributed);

        match engine.distribute_rewards(&record.id).unwrap() {
            RewardOutcome::Distributed(summary) => {
                assert_eq!(summary.amount_for("a"), Some(dec!(100)));
            }
            other => panic!("expected distribution, got {other:?}"),
        }
        assert_eq!(engine.registry().get("a").unwrap().stake, dec!(5100));

        assert_eq!(
            engine.distribute_rewards(&record.id).unwrap(),
            RewardOutcome::AlreadySettled
        );
        assert_eq!(engine.registry().get("a").unwrap().stake, dec!(5100));
        assert!(engine.get_consensus(&record.id).unwrap().reward_distributed);
    }

    #[test]
    fn test_distribute_unknown_record() {
        let engine = engine(&[("a", 80.0)]);
        assert!(matches!(
            engine.distribute_rewards("missing"),
            Err(TrustGridError::Consensus(ConsensusError::NotFound(_)))
        ));
    }

    #[test]
    fn test_record_ids_unique_within_same_instant() {
        let engine = engine(&[]);
        let key = ConsensusKey::new("trust_score", TARGET);
        let now = Utc::now();
        let a = engine.record_id(&key, now);
        let b = engine.record_id(&key, now);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
