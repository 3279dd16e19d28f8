//! # TrustGrid Scoring
//!
//! Converts verified claims about an agent into a bounded, decaying,
//! confidence-weighted trust score, and augments it with longitudinal and
//! peer signals.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────┐      ┌──────────────────────────────┐
//! │   DeclarationStore     │─────▶│     TrustScoringEngine       │
//! │ (agents, declarations) │      │  six pillars → TrustScore    │
//! └────────────────────────┘      └──────────────┬───────────────┘
//!                                                │ base score
//! ┌────────────────────────┐      ┌──────────────▼───────────────┐
//! │    AssessmentStore     │─────▶│    AdvancedScoringEngine     │
//! │ (bounded histories)    │      │ history + peers → enhanced   │
//! └────────────────────────┘      └──────────────────────────────┘
//! ```

pub mod advanced;
pub mod engine;
pub mod history;
pub mod pillars;
pub mod store;

pub use advanced::{
    AdvancedScoringEngine, AdvancedTrustScore, FactorScores, RiskLevel, ScoringContext,
};
pub use engine::TrustScoringEngine;
pub use history::{AssessmentStore, BoundedHistory, HistoricalAssessment, PeerAssessment};
pub use pillars::PillarProfile;
pub use store::{DeclarationStore, InMemoryDeclarationStore, StoreError};
