//! Agent, declaration, and evidence records
//!
//! These records are owned by an external directory. The scoring core only
//! reads them; the one mutation it understands is a declaration's status
//! transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::SECONDS_PER_DAY;

/// An agent whose trustworthiness is being scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub did: String,
    pub created_at: DateTime<Utc>,
    pub verified: bool,
}

impl Agent {
    pub fn new(id: impl Into<String>, did: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            did: did.into(),
            created_at,
            verified: false,
        }
    }

    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    /// Age in fractional years at `now`
    pub fn age_years(&self, now: DateTime<Utc>) -> f64 {
        let days = (now - self.created_at).num_seconds() as f64 / SECONDS_PER_DAY;
        (days / 365.25).max(0.0)
    }
}

/// Verification lifecycle of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Kind of artifact backing a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    Document,
    Signature,
    Attestation,
    Metric,
}

impl EvidenceType {
    /// Base quality before metadata bonuses
    pub fn base_quality(&self) -> f64 {
        match self {
            Self::Signature => 0.9,
            Self::Attestation => 0.8,
            Self::Document => 0.7,
            Self::Metric => 0.6,
        }
    }
}

/// Bonus for an explicit `verified: true` metadata flag
pub const VERIFIED_EVIDENCE_BONUS: f64 = 0.1;

/// Bonus for a named `source`
pub const SOURCED_EVIDENCE_BONUS: f64 = 0.05;

/// Typed artifact with a free-form metadata bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub evidence_type: EvidenceType,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Evidence {
    pub fn new(evidence_type: EvidenceType) -> Self {
        Self {
            evidence_type,
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn is_marked_verified(&self) -> bool {
        self.metadata
            .get("verified")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata
            .get("source")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Quality in [0, 1]: type base plus metadata bonuses, capped at 1.0
    pub fn quality(&self) -> f64 {
        let mut quality = self.evidence_type.base_quality();
        if self.is_marked_verified() {
            quality += VERIFIED_EVIDENCE_BONUS;
        }
        if self.source().is_some() {
            quality += SOURCED_EVIDENCE_BONUS;
        }
        quality.min(1.0)
    }
}

/// An agent-scoped claim backed by evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustDeclaration {
    pub id: String,
    pub agent_id: String,
    pub assertion: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    pub score: f64,
    pub confidence: f64,
    pub verification_status: VerificationStatus,
    pub verified_at: Option<DateTime<Utc>>,
}

impl TrustDeclaration {
    /// Create a pending declaration; the score is clamped to [0, 1]
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        assertion: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            assertion: assertion.into(),
            evidence: Vec::new(),
            score: crate::stats::clamp01(score),
            confidence: 0.5,
            verification_status: VerificationStatus::Pending,
            verified_at: None,
        }
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }

    /// Apply a status transition
    ///
    /// Allowed: `pending -> verified`, `pending -> rejected`,
    /// `verified -> rejected`. Everything else is refused.
    pub fn transition(
        &mut self,
        to: VerificationStatus,
        at: DateTime<Utc>,
    ) -> Result<(), ScoringError> {
        use VerificationStatus::*;

        let allowed = matches!(
            (self.verification_status, to),
            (Pending, Verified) | (Pending, Rejected) | (Verified, Rejected)
        );
        if !allowed {
            return Err(ScoringError::InvalidTransition {
                id: self.id.clone(),
                from: self.verification_status.to_string(),
                to: to.to_string(),
            });
        }

        self.verification_status = to;
        if to == Verified {
            self.verified_at = Some(at);
        }
        Ok(())
    }

    /// Convenience for fixtures and importers: verify at `at`
    pub fn mark_verified(mut self, at: DateTime<Utc>) -> Self {
        self.verification_status = VerificationStatus::Verified;
        self.verified_at = Some(at);
        self
    }
}
