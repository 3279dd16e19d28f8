//! Consensus record storage
//!
//! Records are immutable once inserted except for the reward flag.

use dashmap::DashMap;
use trustgrid_common::{ConsensusKey, OracleConsensus, TrustGridError};

/// Storage backend for finalized consensus records
///
/// Called while the engine holds a per-key lock, so implementations
/// must not block on anything that re-enters the engine.
#[cfg_attr(test, mockall::automock)]
pub trait ConsensusStore: Send + Sync {
    /// Insert a new record; ids are unique
    fn insert(&self, record: OracleConsensus) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Option<OracleConsensus>;

    /// Records for a key, oldest first
    fn for_key(&self, key: &ConsensusKey) -> Vec<OracleConsensus>;

    /// Set the reward flag, returning false if it was already set
    fn mark_rewarded(&self, id: &str) -> Result<bool, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors from consensus store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Consensus record already exists: {0}")]
    Duplicate(String),

    #[error("Consensus record not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<StoreError> for TrustGridError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => trustgrid_common::ConsensusError::NotFound(id).into(),
            other => TrustGridError::Internal(other.to_string()),
        }
    }
}

/// In-memory consensus store
#[derive(Default)]
pub struct InMemoryConsensusStore {
    records: DashMap<String, OracleConsensus>,
    /// Record ids per key, in insertion order
    by_key: DashMap<ConsensusKey, Vec<String>>,
}

impl InMemoryConsensusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsensusStore for InMemoryConsensusStore {
    fn insert(&self, record: OracleConsensus) -> Result<(), StoreError> {
        if self.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        self.by_key
            .entry(record.key())
            .or_default()
            .push(record.id.clone());
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<OracleConsensus> {
        self.records.get(id).map(|r| r.clone())
    }

    fn for_key(&self, key: &ConsensusKey) -> Vec<OracleConsensus> {
        let Some(ids) = self.by_key.get(key).map(|ids| ids.clone()) else {
            return Vec::new();
        };
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    fn mark_rewarded(&self, id: &str) -> Result<bool, StoreError> {
        let mut record = self
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if record.reward_distributed {
            return Ok(false);
        }
        record.reward_distributed = true;
        Ok(true)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
