//! TrustScore - six-pillar trustworthiness metric (0.0-1.0)
//!
//! A TrustScore is derived data: it is recomputed on demand from verified
//! declarations and never treated as the source of truth. Every value it
//! carries lies in [0, 1].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{PillarWeights, TrustThresholds};
use crate::stats::clamp01;

/// One of the six independently scored trust dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Technical,
    Ethical,
    Operational,
    Transparency,
    Security,
    Compliance,
}

impl Pillar {
    pub const ALL: [Pillar; 6] = [
        Pillar::Technical,
        Pillar::Ethical,
        Pillar::Operational,
        Pillar::Transparency,
        Pillar::Security,
        Pillar::Compliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Ethical => "ethical",
            Self::Operational => "operational",
            Self::Transparency => "transparency",
            Self::Security => "security",
            Self::Compliance => "compliance",
        }
    }
}

impl std::fmt::Display for Pillar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-pillar score breakdown
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrustBreakdown {
    pub technical: f64,
    pub ethical: f64,
    pub operational: f64,
    pub transparency: f64,
    pub security: f64,
    pub compliance: f64,
}

impl TrustBreakdown {
    pub fn get(&self, pillar: Pillar) -> f64 {
        match pillar {
            Pillar::Technical => self.technical,
            Pillar::Ethical => self.ethical,
            Pillar::Operational => self.operational,
            Pillar::Transparency => self.transparency,
            Pillar::Security => self.security,
            Pillar::Compliance => self.compliance,
        }
    }

    /// Set a pillar, clamping into [0, 1]
    pub fn set(&mut self, pillar: Pillar, value: f64) {
        let value = clamp01(value);
        match pillar {
            Pillar::Technical => self.technical = value,
            Pillar::Ethical => self.ethical = value,
            Pillar::Operational => self.operational = value,
            Pillar::Transparency => self.transparency = value,
            Pillar::Security => self.security = value,
            Pillar::Compliance => self.compliance = value,
        }
    }

    /// Pillar values in `Pillar::ALL` order
    pub fn values(&self) -> [f64; 6] {
        Pillar::ALL.map(|p| self.get(p))
    }

    /// Clamped weighted sum of the six pillars
    pub fn weighted_total(&self, weights: &PillarWeights) -> f64 {
        clamp01(
            Pillar::ALL
                .iter()
                .map(|p| self.get(*p) * weights.get(*p))
                .sum(),
        )
    }
}

/// Coarse trust classification against configured thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// Below the minimum threshold
    Untrusted,
    Minimum,
    Warning,
    Good,
    Excellent,
}

/// Agent trust score with full breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustScore {
    /// Weighted pillar total (0.0-1.0)
    pub overall: f64,

    /// Confidence in the score (0.0-1.0)
    pub confidence: f64,

    /// Pillar breakdown for transparency
    pub breakdown: TrustBreakdown,

    /// Overall score after temporal decay
    pub temporal_score: f64,

    /// Verification time of the newest evidence behind the score, or the
    /// computation time when there is none
    pub last_updated: DateTime<Utc>,
}

impl TrustScore {
    /// Build a score, clamping every value into [0, 1]
    pub fn new(
        overall: f64,
        confidence: f64,
        breakdown: TrustBreakdown,
        temporal_score: f64,
        last_updated: DateTime<Utc>,
    ) -> Self {
        let mut clamped = TrustBreakdown::default();
        for pillar in Pillar::ALL {
            clamped.set(pillar, breakdown.get(pillar));
        }
        Self {
            overall: clamp01(overall),
            confidence: clamp01(confidence),
            breakdown: clamped,
            temporal_score: clamp01(temporal_score),
            last_updated,
        }
    }

    /// Classify the decayed score
    pub fn level(&self, thresholds: &TrustThresholds) -> TrustLevel {
        let s = self.temporal_score;
        if s >= thresholds.excellent {
            TrustLevel::Excellent
        } else if s >= thresholds.good {
            TrustLevel::Good
        } else if s >= thresholds.warning {
            TrustLevel::Warning
        } else if s >= thresholds.minimum {
            TrustLevel::Minimum
        } else {
            TrustLevel::Untrusted
        }
    }

    /// Check if the decayed score meets a threshold
    pub fn meets_threshold(&self, min_score: f64) -> bool {
        self.temporal_score >= min_score
    }
}

impl std::fmt::Display for TrustScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TrustScore({:.3}, decayed={:.3}, confidence={:.2})",
            self.overall, self.temporal_score, self.confidence
        )
    }
}
