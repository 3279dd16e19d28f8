//! Consensus aggregation algorithms
//!
//! Each algorithm reduces the contributing submissions for one key to a
//! single value plus a confidence in [0, 1].

use serde_json::Value;
use trustgrid_common::{ConsensusAlgorithm, ConsensusError, ConsensusResult, OracleData};

/// Fixed confidence reported by the median algorithm
pub const MEDIAN_CONFIDENCE: f64 = 0.8;

/// One contributing submission with its node's reputation (0-100)
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub data: &'a OracleData,
    pub reputation: f64,
}

/// Run `algorithm` over `samples`
pub fn aggregate(
    algorithm: ConsensusAlgorithm,
    samples: &[Sample<'_>],
) -> Result<ConsensusResult, ConsensusError> {
    if samples.is_empty() {
        return Err(ConsensusError::EmptySubmissions);
    }
    match algorithm {
        ConsensusAlgorithm::WeightedAverage => weighted_average(samples),
        ConsensusAlgorithm::Median => median(samples),
        ConsensusAlgorithm::Majority => Ok(majority(samples)),
    }
}

/// Reputation-weighted mean of numeric values
///
/// Confidence is the mean reputation of contributors, capped at 1.
pub fn weighted_average(samples: &[Sample<'_>]) -> Result<ConsensusResult, ConsensusError> {
    let mut weighted_sum = 0.0;
    let mut total_reputation = 0.0;
    for sample in samples {
        let value = numeric(sample.data)?;
        weighted_sum += value * sample.reputation;
        total_reputation += sample.reputation;
    }

    if total_reputation <= 0.0 {
        return Err(ConsensusError::ZeroReputation);
    }

    let value = weighted_sum / total_reputation;
    Ok(ConsensusResult {
        value: number(value),
        confidence: (total_reputation / samples.len() as f64).min(1.0),
    })
}

/// Upper median of numeric values
pub fn median(samples: &[Sample<'_>]) -> Result<ConsensusResult, ConsensusError> {
    let mut values = samples
        .iter()
        .map(|s| numeric(s.data))
        .collect::<Result<Vec<_>, _>>()?;
    values.sort_by(|a, b| a.total_cmp(b));

    Ok(ConsensusResult {
        value: number(values[values.len() / 2]),
        confidence: MEDIAN_CONFIDENCE,
    })
}

/// Plurality vote over JSON values; ties go to the value seen first
pub fn majority(samples: &[Sample<'_>]) -> ConsensusResult {
    // (serialized form, value, votes) in first-seen order
    let mut tally: Vec<(String, &Value, usize)> = Vec::new();
    for sample in samples {
        let value = &sample.data.data.value;
        let key = value.to_string();
        match tally.iter_mut().find(|(k, _, _)| *k == key) {
            Some(entry) => entry.2 += 1,
            None => tally.push((key, value, 1)),
        }
    }

    let mut winner = &tally[0];
    for entry in &tally[1..] {
        if entry.2 > winner.2 {
            winner = entry;
        }
    }

    ConsensusResult {
        value: winner.1.clone(),
        confidence: winner.2 as f64 / samples.len() as f64,
    }
}

fn numeric(data: &OracleData) -> Result<f64, ConsensusError> {
    data.numeric_value()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConsensusError::NonNumericValue {
            data_type: data.data_type.clone(),
            submission_id: data.id.clone(),
        })
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
