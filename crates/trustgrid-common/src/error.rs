//! Error types for TrustGrid
//!
//! Provides a unified error type and domain-specific error variants

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias using TrustGridError
pub type Result<T> = std::result::Result<T, TrustGridError>;

/// Unified error type for TrustGrid operations
#[derive(Debug, Error)]
pub enum TrustGridError {
    // Scoring errors
    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    // Registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // Submission errors
    #[error("Submission rejected: {0}")]
    Submission(#[from] SubmissionError),

    // Consensus errors
    #[error("Consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Trust scoring errors
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Pillar weights must sum to 1, got {sum}")]
    InvalidWeights { sum: f64 },

    #[error("Invalid status transition for declaration {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },

    #[error("Store error: {0}")]
    Store(String),
}

/// Oracle node registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Incomplete node credentials: {0}")]
    IncompleteCredentials(String),

    #[error("Registry at capacity: {max} nodes")]
    CapacityExceeded { max: usize },

    #[error("Node already registered: {0}")]
    DuplicateNode(String),

    #[error("Insufficient stake: need {required}, have {available}")]
    InsufficientStake { required: Decimal, available: Decimal },

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node is penalized: {0}")]
    NodePenalized(String),
}

/// Oracle data submission errors
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Unknown oracle node: {0}")]
    UnknownNode(String),

    #[error("Oracle node {node_id} is not active ({status})")]
    NodeNotActive { node_id: String, status: String },

    #[error("Invalid signature on submission {0}")]
    InvalidSignature(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Consensus computation errors
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("Non-numeric value in {data_type} submission {submission_id}")]
    NonNumericValue {
        data_type: String,
        submission_id: String,
    },

    #[error("Total reputation of contributing nodes is zero")]
    ZeroReputation,

    #[error("No submissions to aggregate")]
    EmptySubmissions,

    #[error("Consensus record not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for TrustGridError {
    fn from(err: serde_json::Error) -> Self {
        TrustGridError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for TrustGridError {
    fn from(err: config::ConfigError) -> Self {
        TrustGridError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for TrustGridError {
    fn from(err: anyhow::Error) -> Self {
        TrustGridError::Internal(err.to_string())
    }
}

impl TrustGridError {
    /// Whether the caller may correct the input and retry
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TrustGridError::Registry(_) | TrustGridError::Submission(_)
        )
    }
}
