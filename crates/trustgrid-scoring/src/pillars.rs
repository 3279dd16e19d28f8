//! Pillar profiles
//!
//! Each pillar starts from a neutral base, earns an evidence-quality bonus,
//! and loses ground multiplicatively for every low-scoring declaration that
//! references its concern.

use trustgrid_common::{stats, EvidenceType, Pillar, TrustDeclaration};

/// Weight of the operational consistency bonus
pub const CONSISTENCY_WEIGHT: f64 = 0.1;

/// Declarations required before consistency is rewarded
pub const CONSISTENCY_MIN_DECLARATIONS: usize = 5;

/// Static scoring parameters for one pillar
#[derive(Debug, Clone, Copy)]
pub struct PillarProfile {
    pub pillar: Pillar,
    /// Neutral starting score
    pub base: f64,
    /// Multiplier on mean evidence quality
    pub evidence_weight: f64,
    /// Declarations scoring below this count as violations
    pub violation_threshold: f64,
    /// Multiplier applied once per violation
    pub violation_decay: f64,
    /// Evidence types that speak to this pillar
    pub evidence_types: &'static [EvidenceType],
    /// Lowercase fragments that tie an assertion to this pillar
    pub keywords: &'static [&'static str],
}

const TECHNICAL: PillarProfile = PillarProfile {
    pillar: Pillar::Technical,
    base: 0.5,
    evidence_weight: 0.3,
    violation_threshold: 0.4,
    violation_decay: 0.85,
    evidence_types: &[EvidenceType::Metric, EvidenceType::Attestation],
    keywords: &["technical", "performance", "accuracy", "reliab", "capabilit", "error rate"],
};

const ETHICAL: PillarProfile = PillarProfile {
    pillar: Pillar::Ethical,
    base: 0.5,
    evidence_weight: 0.25,
    violation_threshold: 0.5,
    violation_decay: 0.75,
    evidence_types: &[EvidenceType::Attestation, EvidenceType::Document],
    keywords: &["ethic", "bias", "fair", "harm", "discriminat", "privacy"],
};

const OPERATIONAL: PillarProfile = PillarProfile {
    pillar: Pillar::Operational,
    base: 0.5,
    evidence_weight: 0.2,
    violation_threshold: 0.4,
    violation_decay: 0.9,
    evidence_types: &[EvidenceType::Metric, EvidenceType::Signature],
    keywords: &["uptime", "availability", "operational", "incident", "outage", "sla"],
};

// Transparency has to be earned through documentation, hence the low base.
const TRANSPARENCY: PillarProfile = PillarProfile {
    pillar: Pillar::Transparency,
    base: 0.3,
    evidence_weight: 0.4,
    violation_threshold: 0.5,
    violation_decay: 0.85,
    evidence_types: &[EvidenceType::Document],
    keywords: &["transparen", "disclos", "explain", "documentation", "audit trail", "open source"],
};

const SECURITY: PillarProfile = PillarProfile {
    pillar: Pillar::Security,
    base: 0.5,
    evidence_weight: 0.3,
    violation_threshold: 0.5,
    violation_decay: 0.8,
    evidence_types: &[EvidenceType::Signature, EvidenceType::Attestation],
    keywords: &["security", "vulnerab", "breach", "encrypt", "exploit", "access control"],
};

const COMPLIANCE: PillarProfile = PillarProfile {
    pillar: Pillar::Compliance,
    base: 0.5,
    evidence_weight: 0.25,
    violation_threshold: 0.5,
    violation_decay: 0.8,
    evidence_types: &[EvidenceType::Document, EvidenceType::Attestation],
    keywords: &["complian", "regulat", "gdpr", "hipaa", "policy", "legal", "certif"],
};

impl PillarProfile {
    pub fn for_pillar(pillar: Pillar) -> &'static PillarProfile {
        match pillar {
            Pillar::Technical => &TECHNICAL,
            Pillar::Ethical => &ETHICAL,
            Pillar::Operational => &OPERATIONAL,
            Pillar::Transparency => &TRANSPARENCY,
            Pillar::Security => &SECURITY,
            Pillar::Compliance => &COMPLIANCE,
        }
    }

    /// Whether the assertion text references this pillar's concern
    pub fn references(&self, assertion: &str) -> bool {
        let text = assertion.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k))
    }

    /// Evidence is relevant by type, or when tagged with `pillar`/`pillars` metadata
    fn is_relevant(&self, evidence: &trustgrid_common::Evidence) -> bool {
        if self.evidence_types.contains(&evidence.evidence_type) {
            return true;
        }
        let name = self.pillar.as_str();
        match (evidence.metadata.get("pillar"), evidence.metadata.get("pillars")) {
            (Some(serde_json::Value::String(p)), _) if p.eq_ignore_ascii_case(name) => true,
            (_, Some(serde_json::Value::Array(ps))) => ps
                .iter()
                .filter_map(|p| p.as_str())
                .any(|p| p.eq_ignore_ascii_case(name)),
            _ => false,
        }
    }

    /// Mean quality of relevant evidence across declarations, if any
    pub fn evidence_quality(&self, declarations: &[&TrustDeclaration]) -> Option<f64> {
        let qualities: Vec<f64> = declarations
            .iter()
            .flat_map(|d| d.evidence.iter())
            .filter(|e| self.is_relevant(e))
            .map(|e| e.quality())
            .collect();

        if qualities.is_empty() {
            None
        } else {
            Some(stats::mean(&qualities))
        }
    }

    /// Declarations that both score low and reference this pillar
    pub fn violations(&self, declarations: &[&TrustDeclaration]) -> usize {
        declarations
            .iter()
            .filter(|d| d.score < self.violation_threshold && self.references(&d.assertion))
            .count()
    }

    /// Score this pillar over the recent declarations
    ///
    /// `all_scores` holds every verified declaration score and only feeds
    /// the operational consistency term.
    pub fn score(&self, recent: &[&TrustDeclaration], all_scores: &[f64]) -> f64 {
        if recent.is_empty() && all_scores.is_empty() {
            return self.base;
        }

        let mut score = self.base;

        if let Some(quality) = self.evidence_quality(recent) {
            score += quality * self.evidence_weight;
        }

        let violations = self.violations(recent);
        if violations > 0 {
            score *= self.violation_decay.powi(violations as i32);
        }

        if self.pillar == Pillar::Operational && all_scores.len() > CONSISTENCY_MIN_DECLARATIONS {
            let consistency = (1.0 - 2.0 * stats::variance(all_scores)).max(0.0);
            score += consistency * CONSISTENCY_WEIGHT;
        }

        stats::clamp01(score)
    }
}
