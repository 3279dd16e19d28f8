//! Trust Scoring Engine
//!
//! Converts an agent's verified declarations into a six-pillar
//! [`TrustScore`]:
//!
//! 1. Filter to verified declarations, and to the trailing evaluation window
//!    for pillar scoring
//! 2. Score each pillar from its profile (evidence bonus, violation decay)
//! 3. Combine pillars by configured weight
//! 4. Decay the result when no new evidence arrived for more than a day
//! 5. Derive confidence from declaration count and score variance

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};
use trustgrid_common::{
    stats, Pillar, Result, ScoringError, ScoringSettings, TrustBreakdown, TrustDeclaration,
    TrustScore, SECONDS_PER_DAY,
};

use crate::pillars::PillarProfile;
use crate::store::DeclarationStore;

/// Decay applies only once the newest evidence is older than this
pub const DECAY_GRACE_DAYS: f64 = 1.0;

/// Confidence ceiling from declaration count alone
pub const MAX_COUNT_CONFIDENCE: f64 = 0.95;

/// Largest confidence reduction attributable to score variance
pub const MAX_VARIANCE_PENALTY: f64 = 0.3;

/// Confidence floor once any declaration exists
pub const MIN_CONFIDENCE: f64 = 0.1;

/// Trust scoring engine over an injected declaration store
pub struct TrustScoringEngine {
    settings: ScoringSettings,
    store: Arc<dyn DeclarationStore>,
}

impl TrustScoringEngine {
    /// Create a new engine; pillar weights are validated up front
    pub fn new(settings: ScoringSettings, store: Arc<dyn DeclarationStore>) -> Result<Self> {
        settings.weights.validate()?;
        Ok(Self { settings, store })
    }

    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    /// Compute the current trust score for an agent
    pub async fn compute_trust_score(&self, agent_id: &str) -> Result<TrustScore> {
        self.compute_trust_score_at(agent_id, Utc::now()).await
    }

    /// Compute the trust score for an agent as of `now`
    #[instrument(skip(self))]
    pub async fn compute_trust_score_at(
        &self,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TrustScore> {
        let agent = self
            .store
            .get_agent(agent_id)
            .await
            .map_err(ScoringError::from)?
            .ok_or_else(|| ScoringError::AgentNotFound(agent_id.to_string()))?;

        let declarations = self
            .store
            .verified_declarations(&agent.id)
            .await
            .map_err(ScoringError::from)?;

        let score = self.score_declarations(&declarations, now);

        debug!(
            agent = %agent.id,
            declarations = declarations.len(),
            overall = score.overall,
            decayed = score.temporal_score,
            confidence = score.confidence,
            "Trust score computed"
        );

        Ok(score)
    }

    /// Score several agents; fails on the first unknown agent
    pub async fn compute_trust_scores(&self, agent_ids: &[&str]) -> Result<Vec<TrustScore>> {
        let now = Utc::now();
        let mut scores = Vec::with_capacity(agent_ids.len());
        for id in agent_ids {
            scores.push(self.compute_trust_score_at(id, now).await?);
        }
        Ok(scores)
    }

    /// Pure scoring over a declaration set
    ///
    /// Unverified declarations are ignored. With no verified declarations
    /// every pillar sits at its neutral base and confidence is zero.
    pub fn score_declarations(
        &self,
        declarations: &[TrustDeclaration],
        now: DateTime<Utc>,
    ) -> TrustScore {
        let verified: Vec<(&TrustDeclaration, DateTime<Utc>)> = declarations
            .iter()
            .filter(|d| d.is_verified())
            .filter_map(|d| d.verified_at.map(|at| (d, at)))
            .collect();

        let window_start = now - self.settings.evaluation_window();
        let recent: Vec<&TrustDeclaration> = verified
            .iter()
            .filter(|(_, at)| *at >= window_start)
            .map(|(d, _)| *d)
            .collect();
        let all_scores: Vec<f64> = verified.iter().map(|(d, _)| d.score).collect();

        let mut breakdown = TrustBreakdown::default();
        for pillar in Pillar::ALL {
            let profile = PillarProfile::for_pillar(pillar);
            breakdown.set(pillar, profile.score(&recent, &all_scores));
        }

        let overall = breakdown.weighted_total(&self.settings.weights);

        let newest = verified.iter().map(|(_, at)| *at).max();
        let temporal_score = match newest {
            Some(at) => {
                let days = (now - at).num_seconds() as f64 / SECONDS_PER_DAY;
                if days > DECAY_GRACE_DAYS {
                    stats::temporal_decay(
                        overall,
                        self.settings.decay_factor,
                        days,
                        self.settings.half_life_days,
                    )
                } else {
                    overall
                }
            }
            None => overall,
        };

        let confidence = confidence(&all_scores);

        TrustScore::new(
            overall,
            confidence,
            breakdown,
            temporal_score,
            newest.unwrap_or(now),
        )
    }
}

/// Confidence from declaration count, penalized by score variance
pub fn confidence(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let from_count = (0.5 + 0.05 * scores.len() as f64).min(MAX_COUNT_CONFIDENCE);
    let penalty = (0.5 * stats::variance(scores)).min(MAX_VARIANCE_PENALTY);
    (from_count - penalty).max(MIN_CONFIDENCE)
}
