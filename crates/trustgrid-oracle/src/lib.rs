//! # TrustGrid Oracle
//!
//! Oracle node registry and consensus engine for TrustGrid.
//!
//! ## Components
//!
//! - **Registry**: node registration, heartbeats, operator penalties
//! - **Consensus**: per-key aggregation of signed node reports into
//!   immutable consensus records
//! - **Rewards**: one-time settlement credited to node stakes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TrustGrid Oracle                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐ │
//! │  │  Registry   │  │  Consensus  │  │   ConsensusStore    │ │
//! │  │ (RwLock map)│◀─│ (per-key    │──│  (records, reward   │ │
//! │  │             │  │   mutex)    │  │       flag)         │ │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod consensus;
pub mod metrics;
pub mod registry;
pub mod signature;

pub use consensus::{
    ConsensusEngine, ConsensusStore, InMemoryConsensusStore, NodeReward, RewardOutcome,
    RewardSummary, StoreError, SubmissionOutcome,
};
pub use metrics::OracleMetrics;
pub use registry::{NetworkStats, NodeRegistry};
pub use signature::{Blake3Signature, NonEmptySignature, SignatureVerifier};

use std::sync::Arc;
use trustgrid_common::OracleSettings;

/// Registry and engine wired together over an in-memory store
pub struct OracleNetwork {
    pub registry: Arc<NodeRegistry>,
    pub engine: Arc<ConsensusEngine>,
    pub metrics: Arc<OracleMetrics>,
}

impl OracleNetwork {
    pub fn new(settings: OracleSettings) -> Self {
        Self::with_store(settings, Arc::new(InMemoryConsensusStore::new()))
    }

    pub fn with_store(settings: OracleSettings, store: Arc<dyn ConsensusStore>) -> Self {
        let metrics = Arc::new(OracleMetrics::new());
        let registry = Arc::new(NodeRegistry::new(settings).with_metrics(Arc::clone(&metrics)));
        let engine = Arc::new(ConsensusEngine::new(Arc::clone(&registry), store));
        Self {
            registry,
            engine,
            metrics,
        }
    }
}
