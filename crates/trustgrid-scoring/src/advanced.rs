//! Historical/Peer Factor Engine
//!
//! Augments a base [`TrustScore`] with longitudinal and peer signals:
//!
//! | factor                 | weight |
//! |------------------------|--------|
//! | historical reliability | 0.25   |
//! | peer consensus         | 0.20   |
//! | behavioral consistency | 0.15   |
//! | reputation             | 0.15   |
//! | anomaly detection      | 0.15   |
//! | network effects        | 0.10   |
//!
//! ```text
//! final = 0.6 × decayed(base) + 0.4 × Σ(factor × weight)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use trustgrid_common::{
    stats, AdvancedSettings, Agent, Pillar, Result, ScoringSettings, TrustScore,
    SECONDS_PER_DAY,
};

use crate::engine::DECAY_GRACE_DAYS;
use crate::history::{AssessmentStore, HistoricalAssessment, PeerAssessment};

/// Neutral value for any factor lacking data
pub const NEUTRAL: f64 = 0.5;

/// Assessments considered for reliability
pub const RELIABILITY_WINDOW: usize = 10;

/// Peer scores within this distance of the mean count as agreeing
pub const PEER_AGREEMENT_TOLERANCE: f64 = 0.1;

/// Minimum history for anomaly detection
pub const ANOMALY_MIN_POINTS: usize = 5;

/// Most recent points checked for anomalies
pub const ANOMALY_RECENT_POINTS: usize = 3;

/// Deviation, in standard deviations, that flags an anomaly
pub const ANOMALY_SIGMA: f64 = 2.0;

/// Optional caller-supplied context
#[derive(Debug, Clone, Default)]
pub struct ScoringContext {
    /// Overrides the recorded history when present
    pub history: Option<Vec<HistoricalAssessment>>,
    /// Peer agent ids for network effects
    pub peers: Option<Vec<String>>,
}

/// The six historical/peer factors, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub historical_reliability: f64,
    pub peer_consensus: f64,
    pub behavioral_consistency: f64,
    pub reputation_score: f64,
    pub anomaly_detection: f64,
    pub network_effects: f64,
}

impl FactorScores {
    pub fn values(&self) -> [f64; 6] {
        [
            self.historical_reliability,
            self.peer_consensus,
            self.behavioral_consistency,
            self.reputation_score,
            self.anomaly_detection,
            self.network_effects,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Enhanced score with the factors that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedTrustScore {
    pub score: TrustScore,
    pub factors: FactorScores,
    /// Weighted factor total
    pub ml_score: f64,
    /// Base pillar total after temporal decay
    pub decayed_base: f64,
    pub risk_level: RiskLevel,
}

/// Historical/peer factor engine
pub struct AdvancedScoringEngine {
    settings: AdvancedSettings,
    scoring: ScoringSettings,
    store: Arc<AssessmentStore>,
}

impl AdvancedScoringEngine {
    pub fn new(
        settings: AdvancedSettings,
        scoring: ScoringSettings,
        store: Arc<AssessmentStore>,
    ) -> Result<Self> {
        settings.factor_weights.validate()?;
        scoring.weights.validate()?;
        Ok(Self {
            settings,
            scoring,
            store,
        })
    }

    pub fn store(&self) -> &Arc<AssessmentStore> {
        &self.store
    }

    /// Record a completed assessment of an agent
    pub fn record_assessment(&self, agent_id: &str, score: &TrustScore) {
        self.store.record_assessment(
            agent_id,
            HistoricalAssessment {
                overall: score.overall,
                breakdown: score.breakdown,
                recorded_at: score.last_updated,
            },
        );
    }

    /// Record one agent's assessment of another
    pub fn record_peer_assessment(&self, assessment: PeerAssessment) {
        self.store.record_peer_assessment(PeerAssessment {
            score: stats::clamp01(assessment.score),
            ..assessment
        });
    }

    pub fn compute_advanced_score(
        &self,
        agent: &Agent,
        base: &TrustScore,
        context: &ScoringContext,
    ) -> AdvancedTrustScore {
        self.compute_advanced_score_at(agent, base, context, Utc::now())
    }

    /// Compute the enhanced score as of `now`
    #[instrument(skip(self, agent, base, context), fields(agent = %agent.id))]
    pub fn compute_advanced_score_at(
        &self,
        agent: &Agent,
        base: &TrustScore,
        context: &ScoringContext,
        now: DateTime<Utc>,
    ) -> AdvancedTrustScore {
        let mut history = context
            .history
            .clone()
            .unwrap_or_else(|| self.store.history(&agent.id));
        history.sort_by_key(|a| a.recorded_at);

        let peer_assessments = self.store.peer_assessments(&agent.id);
        let peers: &[String] = context.peers.as_deref().unwrap_or(&[]);

        let factors = FactorScores {
            historical_reliability: historical_reliability(&history),
            peer_consensus: peer_consensus(&peer_assessments),
            behavioral_consistency: behavioral_consistency(&history),
            reputation_score: reputation_score(agent, now),
            anomaly_detection: anomaly_detection(&history),
            network_effects: network_effects(peers, &peer_assessments),
        };

        let ml_score: f64 = factors
            .values()
            .iter()
            .zip(self.settings.factor_weights.values().iter())
            .map(|(f, w)| f * w)
            .sum();

        let base_total = base.breakdown.weighted_total(&self.scoring.weights);
        let days = (now - base.last_updated).num_seconds() as f64 / SECONDS_PER_DAY;
        let decayed_base = if days > DECAY_GRACE_DAYS {
            stats::temporal_decay(
                base_total,
                self.scoring.decay_factor,
                days,
                self.scoring.half_life_days,
            )
        } else {
            base_total
        };

        let base_weight = self.settings.base_weight.clamp(0.0, 1.0);
        let final_score =
            stats::clamp01(base_weight * decayed_base + (1.0 - base_weight) * ml_score);

        let confidence = stats::mean(&[
            if history.len() > 10 { 0.9 } else { 0.5 },
            if peers.len() > 3 { 0.8 } else { 0.5 },
            stats::clamp01(1.0 - stats::variance(&base.breakdown.values())),
            stats::clamp01(1.0 - stats::variance(&factors.values())),
        ]);

        let risk_level = self.classify_risk(&factors, confidence, final_score);

        debug!(
            history = history.len(),
            peers = peers.len(),
            ml_score,
            decayed_base,
            final_score,
            ?risk_level,
            "Advanced score computed"
        );

        AdvancedTrustScore {
            score: TrustScore::new(
                final_score,
                confidence,
                base.breakdown,
                final_score,
                base.last_updated,
            ),
            factors,
            ml_score,
            decayed_base,
            risk_level,
        }
    }

    fn classify_risk(&self, factors: &FactorScores, confidence: f64, score: f64) -> RiskLevel {
        let r = &self.settings.risk;
        let indicators = [
            factors.anomaly_detection < r.anomaly_below,
            factors.behavioral_consistency < r.consistency_below,
            confidence < r.confidence_below,
            score < r.score_below,
        ]
        .iter()
        .filter(|hit| **hit)
        .count();

        if indicators >= r.high_indicator_count {
            RiskLevel::High
        } else if indicators >= 1 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Recency-weighted average of the last assessments blended with stability
pub fn historical_reliability(history: &[HistoricalAssessment]) -> f64 {
    if history.is_empty() {
        return NEUTRAL;
    }
    let start = history.len().saturating_sub(RELIABILITY_WINDOW);
    let scores: Vec<f64> = history[start..].iter().map(|a| a.overall).collect();
    let count = scores.len() as f64;

    let weighted = stats::weighted_mean(
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| (*s, (i + 1) as f64 / count)),
    )
    .unwrap_or(NEUTRAL);
    let stability = (1.0 - stats::variance(&scores)).max(0.0);

    stats::clamp01(0.5 * weighted + 0.5 * stability)
}

/// Mean peer score blended with the share of peers agreeing with it
pub fn peer_consensus(assessments: &[PeerAssessment]) -> f64 {
    if assessments.is_empty() {
        return NEUTRAL;
    }
    let scores: Vec<f64> = assessments.iter().map(|a| a.score).collect();
    let avg = stats::mean(&scores);
    let agreeing = scores
        .iter()
        .filter(|s| stats::within_tolerance(**s, avg, PEER_AGREEMENT_TOLERANCE))
        .count();
    let agreement = agreeing as f64 / scores.len() as f64;

    stats::clamp01(0.5 * avg + 0.5 * agreement)
}

/// Mean over pillars of `1 − variance` across historical assessments
pub fn behavioral_consistency(history: &[HistoricalAssessment]) -> f64 {
    if history.len() < 2 {
        return NEUTRAL;
    }
    let per_pillar: Vec<f64> = Pillar::ALL
        .iter()
        .map(|p| {
            let values: Vec<f64> = history.iter().map(|a| a.breakdown.get(*p)).collect();
            1.0 - stats::variance(&values)
        })
        .collect();

    stats::clamp01(stats::mean(&per_pillar))
}

/// Age and verification based reputation
pub fn reputation_score(agent: &Agent, now: DateTime<Utc>) -> f64 {
    let age_bonus = (agent.age_years(now) * 0.2).min(0.2);
    let verified_bonus = if agent.verified { 0.2 } else { 0.0 };
    (NEUTRAL + age_bonus + verified_bonus).min(1.0)
}

/// Share of the last three scores that are not outliers
pub fn anomaly_detection(history: &[HistoricalAssessment]) -> f64 {
    if history.len() < ANOMALY_MIN_POINTS {
        return NEUTRAL;
    }
    let scores: Vec<f64> = history.iter().map(|a| a.overall).collect();
    let mean = stats::mean(&scores);
    let sd = stats::std_dev(&scores);

    let flagged = scores
        .iter()
        .rev()
        .take(ANOMALY_RECENT_POINTS)
        .filter(|s| (**s - mean).abs() > ANOMALY_SIGMA * sd)
        .count();

    1.0 - flagged as f64 / ANOMALY_RECENT_POINTS as f64
}

/// Peer coverage blended with the mean peer view of this agent
pub fn network_effects(peers: &[String], assessments: &[PeerAssessment]) -> f64 {
    if peers.is_empty() {
        return NEUTRAL;
    }

    let latest_from = |peer: &str| {
        assessments
            .iter()
            .rev()
            .find(|a| a.assessor_id == peer)
            .map(|a| a.score)
    };

    let views: Vec<Option<f64>> = peers.iter().map(|p| latest_from(p)).collect();
    let coverage = views.iter().filter(|v| v.is_some()).count() as f64 / peers.len() as f64;
    let mean_view = stats::mean(
        &views
            .iter()
            .map(|v| v.unwrap_or(NEUTRAL))
            .collect::<Vec<_>>(),
    );

    stats::clamp01((coverage + mean_view) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use trustgrid_common::TrustBreakdown;

    fn engine() -> AdvancedScoringEngine {
        AdvancedScoringEngine::new(
            AdvancedSettings::default(),
            ScoringSettings::default(),
            Arc::new(AssessmentStore::default()),
        )
        .unwrap()
    }

    fn uniform(value: f64) -> TrustBreakdown {
        let mut b = TrustBreakdown::default();
        for p in Pillar::ALL {
            b.set(p, value);
        }
        b
    }

    fn assessment(overall: f64, at: DateTime<Utc>) -> HistoricalAssessment {
        HistoricalAssessment {
            overall,
            breakdown: uniform(overall),
            recorded_at: at,
        }
    }

    fn peer(assessor: &str, subject: &str, score: f64) -> PeerAssessment {
        PeerAssessment {
            assessor_id: assessor.to_string(),
            subject_id: subject.to_string(),
            score,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_neutral_without_data() {
        assert_eq!(historical_reliability(&[]), NEUTRAL);
        assert_eq!(peer_consensus(&[]), NEUTRAL);
        assert_eq!(behavioral_consistency(&[]), NEUTRAL);
        assert_eq!(anomaly_detection(&[]), NEUTRAL);
        assert_eq!(network_effects(&[], &[]), NEUTRAL);
    }

    #[test]
    fn test_historical_reliability_weights_recent() {
        let now = Utc::now();
        let rising: Vec<_> = [0.2, 0.4, 0.6, 0.8]
            .iter()
            .map(|s| assessment(*s, now))
            .collect();
        // weights 1/4..4/4: (0.2 + 0.8 + 1.8 + 3.2) / 10 = 0.6
        let scores = [0.2, 0.4, 0.6, 0.8];
        let expected = 0.5 * 0.6 + 0.5 * (1.0 - stats::variance(&scores));
        assert!((historical_reliability(&rising) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_peer_consensus_agreement() {
        let assessments = vec![peer("a", "x", 0.8), peer("b", "x", 0.8), peer("c", "x", 0.2)];
        // avg 0.6, nobody within 0.1
        assert!((peer_consensus(&assessments) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_reputation() {
        let now = Utc::now();
        let fresh = Agent::new("a", "did:web:a", now);
        assert!((reputation_score(&fresh, now) - 0.5).abs() < 1e-9);

        let veteran = Agent::new("b", "did:web:b", now - Duration::days(3 * 365)).verified();
        assert!((reputation_score(&veteran, now) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_anomaly_flags_recent_outlier() {
        let now = Utc::now();
        let mut history: Vec<_> = (0..9).map(|_| assessment(0.8, now)).collect();
        history.push(assessment(0.05, now));
        // one of the last three deviates by more than 2σ
        assert!((anomaly_detection(&history) - 2.0 / 3.0).abs() < 1e-12);

        let steady: Vec<_> = (0..6).map(|_| assessment(0.7, now)).collect();
        assert_eq!(anomaly_detection(&steady), 1.0);
    }

    #[test]
    fn test_network_effects() {
        let peers = vec!["p1".to_string(), "p2".to_string()];
        let assessments = vec![peer("p1", "x", 0.9), peer("outsider", "x", 0.1)];
        // coverage 0.5, mean view (0.9 + 0.5) / 2 = 0.7
        assert!((network_effects(&peers, &assessments) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_blend_and_risk() {
        let engine = engine();
        let now = Utc::now();
        let agent = Agent::new("agent-1", "did:web:a1", now - Duration::days(365)).verified();
        let base = TrustScore::new(0.8, 0.8, uniform(0.8), 0.8, now);

        for i in 0..12 {
            engine.record_assessment(
                "agent-1",
                &TrustScore::new(0.8, 0.8, uniform(0.8), 0.8, now - Duration::hours(12 - i)),
            );
        }
        for p in ["p1", "p2", "p3", "p4"] {
            engine.record_peer_assessment(peer(p, "agent-1", 0.8));
        }

        let context = ScoringContext {
            history: None,
            peers: Some(vec!["p1".into(), "p2".into(), "p3".into(), "p4".into()]),
        };
        let result = engine.compute_advanced_score_at(&agent, &base, &context, now);

        let expected = 0.6 * result.decayed_base + 0.4 * result.ml_score;
        assert!((result.score.overall - expected).abs() < 1e-12);
        assert!((result.decayed_base - 0.8).abs() < 1e-9);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.score.confidence > 0.8);
    }

    #[test]
    fn test_sparse_agent_is_medium_risk() {
        let engine = engine();
        let now = Utc::now();
        let agent = Agent::new("new", "did:web:new", now);
        let base = TrustScore::new(0.3, 0.2, uniform(0.3), 0.3, now);

        let result = engine.compute_advanced_score_at(&agent, &base, &ScoringContext::default(), now);
        assert!(result.score.overall < 0.5);
        assert_eq!(result.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_stale_base_decays_before_blending() {
        let engine = engine();
        let now = Utc::now();
        let agent = Agent::new("a", "did:web:a", now);
        let base = TrustScore::new(0.8, 0.8, uniform(0.8), 0.8, now - Duration::days(60));

        let result = engine.compute_advanced_score_at(&agent, &base, &ScoringContext::default(), now);
        assert!((result.decayed_base - 0.8 * 0.95f64.powf(2.0)).abs() < 1e-9);
    }
}
