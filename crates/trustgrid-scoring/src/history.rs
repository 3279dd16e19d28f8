//! Assessment history
//!
//! Per-agent fixed-capacity ring buffers of past assessments and peer
//! assessments. This is the only mutable state of the factor engine.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use trustgrid_common::TrustBreakdown;

/// Fixed-capacity FIFO buffer; pushing at capacity evicts the oldest entry
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// Create an empty buffer. A zero capacity is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, returning the evicted one if the buffer was full
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }
}

impl<T: Clone> BoundedHistory<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

/// A past trust assessment of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalAssessment {
    pub overall: f64,
    pub breakdown: TrustBreakdown,
    pub recorded_at: DateTime<Utc>,
}

/// One agent's score of another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerAssessment {
    pub assessor_id: String,
    pub subject_id: String,
    pub score: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Concurrent per-agent assessment store
pub struct AssessmentStore {
    /// Own assessments, keyed by agent
    history: DashMap<String, BoundedHistory<HistoricalAssessment>>,
    /// Peer assessments, keyed by subject agent
    peers: DashMap<String, BoundedHistory<PeerAssessment>>,
    capacity: usize,
}

impl AssessmentStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: DashMap::new(),
            peers: DashMap::new(),
            capacity,
        }
    }

    /// Append an assessment to the agent's history
    pub fn record_assessment(&self, agent_id: &str, assessment: HistoricalAssessment) {
        let evicted = self
            .history
            .entry(agent_id.to_string())
            .or_insert_with(|| BoundedHistory::with_capacity(self.capacity))
            .push(assessment);

        if evicted.is_some() {
            tracing::trace!(agent = %agent_id, "Evicted oldest assessment");
        }
    }

    /// Append a peer assessment to the subject's peer history
    pub fn record_peer_assessment(&self, assessment: PeerAssessment) {
        self.peers
            .entry(assessment.subject_id.clone())
            .or_insert_with(|| BoundedHistory::with_capacity(self.capacity))
            .push(assessment);
    }

    /// Assessments of an agent, oldest first
    pub fn history(&self, agent_id: &str) -> Vec<HistoricalAssessment> {
        self.history
            .get(agent_id)
            .map(|h| h.to_vec())
            .unwrap_or_default()
    }

    /// Peer assessments of an agent, oldest first
    pub fn peer_assessments(&self, subject_id: &str) -> Vec<PeerAssessment> {
        self.peers
            .get(subject_id)
            .map(|h| h.to_vec())
            .unwrap_or_default()
    }

    pub fn history_len(&self, agent_id: &str) -> usize {
        self.history.get(agent_id).map(|h| h.len()).unwrap_or(0)
    }
}

impl Default for AssessmentStore {
    fn default() -> Self {
        Self::new(100)
    }
}
