//! Core data types for TrustGrid

pub mod agent;
pub mod oracle;
pub mod trust_score;
