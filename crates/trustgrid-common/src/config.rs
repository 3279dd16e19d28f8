//! TrustGrid configuration
//!
//! Every section has working defaults. `TrustGridConfig::load` layers
//! an optional `trustgrid.toml` (or the file named by `TRUSTGRID_CONFIG`)
//! and `TRUSTGRID__SECTION__KEY` environment variables on top of them.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, ScoringError, TrustGridError};
use crate::types::oracle::ConsensusAlgorithm;
use crate::types::trust_score::Pillar;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustGridConfig {
    pub scoring: ScoringSettings,
    pub advanced: AdvancedSettings,
    pub oracle: OracleSettings,
}

impl TrustGridConfig {
    /// Load configuration from `.env`, an optional file, and the environment
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let path =
            std::env::var("TRUSTGRID_CONFIG").unwrap_or_else(|_| "trustgrid".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("TRUSTGRID")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;

        tracing::debug!(config = ?cfg, "Configuration loaded");
        Ok(cfg)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.scoring.weights.validate()?;
        self.advanced.factor_weights.validate()?;

        let s = &self.scoring;
        if !(s.decay_factor > 0.0 && s.decay_factor <= 1.0) {
            return Err(TrustGridError::Config(format!(
                "scoring.decay_factor must be in (0, 1], got {}",
                s.decay_factor
            )));
        }
        if s.half_life_days <= 0.0 {
            return Err(TrustGridError::Config(
                "scoring.half_life_days must be positive".to_string(),
            ));
        }

        let o = &self.oracle;
        if !(o.consensus_threshold > 0.0 && o.consensus_threshold <= 1.0) {
            return Err(TrustGridError::Config(format!(
                "oracle.consensus_threshold must be in (0, 1], got {}",
                o.consensus_threshold
            )));
        }
        if o.max_nodes == 0 {
            return Err(TrustGridError::Config(
                "oracle.max_nodes must be positive".to_string(),
            ));
        }
        if o.min_stake < Decimal::ZERO || o.reward_pool < Decimal::ZERO {
            return Err(TrustGridError::Config(
                "oracle.min_stake and oracle.reward_pool must be non-negative".to_string(),
            ));
        }
        if self.advanced.history_capacity == 0 {
            return Err(TrustGridError::Config(
                "advanced.history_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pillar weights; must sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PillarWeights {
    pub technical: f64,
    pub ethical: f64,
    pub operational: f64,
    pub transparency: f64,
    pub security: f64,
    pub compliance: f64,
}

impl Default for PillarWeights {
    fn default() -> Self {
        Self {
            technical: 0.25,
            ethical: 0.20,
            operational: 0.15,
            transparency: 0.15,
            security: 0.15,
            compliance: 0.10,
        }
    }
}

impl PillarWeights {
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

    pub fn sum(&self) -> f64 {
        Pillar::ALL.iter().map(|p| self.get(*p)).sum()
    }

    pub fn validate(&self) -> std::result::Result<(), ScoringError> {
        let sum = self.sum();
        let negative = Pillar::ALL.iter().any(|p| self.get(*p) < 0.0);
        if negative || (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ScoringError::InvalidWeights { sum });
        }
        Ok(())
    }
}

/// Trust level thresholds on the decayed score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustThresholds {
    pub minimum: f64,
    pub warning: f64,
    pub good: f64,
    pub excellent: f64,
}

impl Default for TrustThresholds {
    fn default() -> Self {
        Self {
            minimum: 0.3,
            warning: 0.5,
            good: 0.7,
            excellent: 0.9,
        }
    }
}

/// Trust scoring engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub weights: PillarWeights,
    pub thresholds: TrustThresholds,
    /// Decay base applied per half-life
    pub decay_factor: f64,
    pub half_life_days: f64,
    /// Trailing window of verified declarations used for pillar scoring
    pub evaluation_window_days: i64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            weights: PillarWeights::default(),
            thresholds: TrustThresholds::default(),
            decay_factor: 0.95,
            half_life_days: 30.0,
            evaluation_window_days: 30,
        }
    }
}

impl ScoringSettings {
    pub fn evaluation_window(&self) -> Duration {
        Duration::days(self.evaluation_window_days)
    }
}

/// Weights of the six historical/peer factors; must sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    pub historical_reliability: f64,
    pub peer_consensus: f64,
    pub behavioral_consistency: f64,
    pub reputation_score: f64,
    pub anomaly_detection: f64,
    pub network_effects: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            historical_reliability: 0.25,
            peer_consensus: 0.20,
            behavioral_consistency: 0.15,
            reputation_score: 0.15,
            anomaly_detection: 0.15,
            network_effects: 0.10,
        }
    }
}

impl FactorWeights {
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

    pub fn validate(&self) -> std::result::Result<(), ScoringError> {
        let values = self.values();
        let sum: f64 = values.iter().sum();
        if values.iter().any(|w| *w < 0.0) || (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ScoringError::InvalidWeights { sum });
        }
        Ok(())
    }
}

/// Risk classification triggers
///
/// Uncalibrated defaults; revisit against observed assessment data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub anomaly_below: f64,
    pub consistency_below: f64,
    pub confidence_below: f64,
    pub score_below: f64,
    /// Triggered indicators needed for `high`
    pub high_indicator_count: usize,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            anomaly_below: 0.3,
            consistency_below: 0.4,
            confidence_below: 0.5,
            score_below: 0.5,
            high_indicator_count: 3,
        }
    }
}

/// Historical/peer factor engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    pub factor_weights: FactorWeights,
    pub risk: RiskThresholds,
    /// Share of the decayed base score in the final blend
    pub base_weight: f64,
    /// Per-agent assessment history capacity
    pub history_capacity: usize,
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            factor_weights: FactorWeights::default(),
            risk: RiskThresholds::default(),
            base_weight: 0.6,
            history_capacity: 100,
        }
    }
}

/// Oracle registry and consensus settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Fraction of active nodes required for consensus
    pub consensus_threshold: f64,
    pub max_nodes: usize,
    pub min_stake: Decimal,
    pub heartbeat_timeout_secs: i64,
    /// How often the heartbeat monitor sweeps
    pub heartbeat_sweep_interval_secs: u64,
    /// Submissions older than this do not count toward consensus
    pub freshness_window_secs: i64,
    /// Allowed clock skew for submission timestamps
    pub max_clock_skew_secs: i64,
    /// Units distributed per consensus event. Uncalibrated default.
    pub reward_pool: Decimal,
    /// Distance from the consensus value that still counts as accurate
    pub accuracy_tolerance: f64,
    pub auto_distribute_rewards: bool,
    /// Per-node submission log capacity
    pub submission_log_capacity: usize,
    /// Per-data-type algorithm overrides
    pub algorithms: HashMap<String, ConsensusAlgorithm>,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            consensus_threshold: 0.67,
            max_nodes: 21,
            min_stake: Decimal::new(1000, 0),
            heartbeat_timeout_secs: 300,
            heartbeat_sweep_interval_secs: 30,
            freshness_window_secs: 300,
            max_clock_skew_secs: 60,
            reward_pool: Decimal::new(100, 0),
            accuracy_tolerance: 0.1,
            auto_distribute_rewards: true,
            submission_log_capacity: 1000,
            algorithms: HashMap::new(),
        }
    }
}

impl OracleSettings {
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::seconds(self.heartbeat_timeout_secs)
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::seconds(self.freshness_window_secs)
    }

    pub fn max_clock_skew(&self) -> Duration {
        Duration::seconds(self.max_clock_skew_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        TrustGridConfig::default().validate().unwrap();
        assert!((PillarWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let mut cfg = TrustGridConfig::default();
        cfg.scoring.weights.security = 0.5;
        assert!(matches!(
            cfg.validate(),
            Err(TrustGridError::Scoring(ScoringError::InvalidWeights { .. }))
        ));
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let mut cfg = TrustGridConfig::default();
        cfg.oracle.consensus_threshold = 0.0;
        assert!(matches!(cfg.validate(), Err(TrustGridError::Config(_))));
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let cfg: TrustGridConfig = serde_json::from_value(serde_json::json!({
            "oracle": { "max_nodes": 7, "algorithms": { "uptime": "median" } }
        }))
        .unwrap();
        assert_eq!(cfg.oracle.max_nodes, 7);
        assert_eq!(cfg.oracle.heartbeat_timeout_secs, 300);
        assert_eq!(
            cfg.oracle.algorithms.get("uptime"),
            Some(&ConsensusAlgorithm::Median)
        );
        assert_eq!(cfg.scoring.weights, PillarWeights::default());
    }
}
