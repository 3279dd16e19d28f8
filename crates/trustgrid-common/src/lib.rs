//! # TrustGrid Common
//!
//! Shared types, errors, numeric utilities, and configuration for the
//! TrustGrid trust-computation core.
//!
//! ## Core Types
//!
//! - [`Agent`], [`TrustDeclaration`], [`Evidence`]: scoring inputs owned by an external directory
//! - [`TrustScore`]: six-pillar, decaying, confidence-weighted score in [0, 1]
//! - [`OracleNode`], [`OracleData`], [`OracleConsensus`]: oracle network records
//!
//! ## Utilities
//!
//! - [`stats`]: mean/variance, clamping, exponential decay
//! - [`config`]: engine configuration with file and environment layering

pub mod config;
pub mod error;
pub mod stats;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{
    AdvancedSettings, FactorWeights, OracleSettings, PillarWeights, RiskThresholds,
    ScoringSettings, TrustGridConfig, TrustThresholds,
};
pub use error::{
    ConsensusError, RegistryError, Result, ScoringError, SubmissionError, TrustGridError,
};
pub use types::{
    agent::{Agent, Evidence, EvidenceType, TrustDeclaration, VerificationStatus},
    oracle::{
        data_types, ConsensusAlgorithm, ConsensusKey, ConsensusResult, NodeRegistration,
        NodeStatus, OracleConsensus, OracleData, OracleNode, OraclePayload,
    },
    trust_score::{Pillar, TrustBreakdown, TrustLevel, TrustScore},
};

/// TrustGrid version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Seconds per day, used for fractional-day arithmetic
pub const SECONDS_PER_DAY: f64 = 86_400.0;
