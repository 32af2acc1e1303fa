use serde::{Deserialize, Serialize};

use super::super::constitution::RuleDefinition;
use super::config::EvaluationConfig;
use super::ValidationRuleResult;

/// Which rules count as passed for a given holistic score band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassCriterion {
    All,
    WeightBelow { cutoff: f64 },
    WeightBelowOrRequired { cutoff: f64 },
}

impl PassCriterion {
    pub fn admits(&self, rule: &RuleDefinition) -> bool {
        match *self {
            PassCriterion::All => true,
            PassCriterion::WeightBelow { cutoff } => rule.weight < cutoff,
            PassCriterion::WeightBelowOrRequired { cutoff } => rule.weight < cutoff || rule.required,
        }
    }

    /// True when every rule this criterion admits is also admitted by `wider`.
    pub fn within(&self, wider: &PassCriterion) -> bool {
        use PassCriterion::*;
        match (*self, *wider) {
            (_, All) => true,
            (All, _) => false,
            (WeightBelow { cutoff }, WeightBelow { cutoff: wide })
            | (WeightBelow { cutoff }, WeightBelowOrRequired { cutoff: wide })
            | (WeightBelowOrRequired { cutoff }, WeightBelowOrRequired { cutoff: wide }) => {
                cutoff <= wide
            }
            (WeightBelowOrRequired { .. }, WeightBelow { .. }) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassBand {
    pub min_score: f64,
    pub criterion: PassCriterion,
}

/// Maps a delegated holistic score onto per-rule pass/fail.
///
/// The per-rule outcome is illustrative: the holistic score stays authoritative
/// and the policy only keeps pass counts consistent with it. Bands are checked
/// from the highest `min_score` down; scores below every band use `floor`.
/// Each band admits at least the rules of every band below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PassRatePolicyFields")]
pub struct PassRatePolicy {
    bands: Vec<PassBand>,
    floor: PassCriterion,
}

#[derive(Deserialize)]
struct PassRatePolicyFields {
    bands: Vec<PassBand>,
    floor: PassCriterion,
}

impl TryFrom<PassRatePolicyFields> for PassRatePolicy {
    type Error = PassRatePolicyError;

    fn try_from(fields: PassRatePolicyFields) -> Result<Self, Self::Error> {
        PassRatePolicy::new(fields.bands, fields.floor)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PassRatePolicyError {
    #[error("pass band min_score {0} must be a finite score in [0, 1]")]
    InvalidMinScore(f64),
    #[error("pass bands share min_score {0}")]
    DuplicateBand(f64),
    #[error("pass band at min_score {min_score} admits fewer rules than the band below it")]
    NotMonotonic { min_score: f64 },
}

impl Default for PassRatePolicy {
    fn default() -> Self {
        Self {
            bands: vec![
                PassBand {
                    min_score: 0.9,
                    criterion: PassCriterion::All,
                },
                PassBand {
                    min_score: 0.8,
                    criterion: PassCriterion::WeightBelowOrRequired { cutoff: 0.15 },
                },
                PassBand {
                    min_score: 0.7,
                    criterion: PassCriterion::WeightBelow { cutoff: 0.12 },
                },
                PassBand {
                    min_score: 0.6,
                    criterion: PassCriterion::WeightBelow { cutoff: 0.10 },
                },
                PassBand {
                    min_score: 0.5,
                    criterion: PassCriterion::WeightBelow { cutoff: 0.08 },
                },
            ],
            floor: PassCriterion::WeightBelow { cutoff: 0.05 },
        }
    }
}

impl PassRatePolicy {
    pub fn new(
        mut bands: Vec<PassBand>,
        floor: PassCriterion,
    ) -> Result<Self, PassRatePolicyError> {
        if let Some(band) = bands
            .iter()
            .find(|band| !(0.0..=1.0).contains(&band.min_score))
        {
            return Err(PassRatePolicyError::InvalidMinScore(band.min_score));
        }
        bands.sort_by(|left, right| right.min_score.total_cmp(&left.min_score));

        let mut below = floor;
        for band in bands.iter().rev() {
            if !below.within(&band.criterion) {
                return Err(PassRatePolicyError::NotMonotonic {
                    min_score: band.min_score,
                });
            }
            below = band.criterion;
        }
        if let Some(pair) = bands
            .windows(2)
            .find(|pair| pair[0].min_score == pair[1].min_score)
        {
            return Err(PassRatePolicyError::DuplicateBand(pair[0].min_score));
        }

        Ok(Self { bands, floor })
    }

    pub fn bands(&self) -> &[PassBand] {
        &self.bands
    }

    pub fn criterion_for(&self, score: f64) -> PassCriterion {
        self.bands
            .iter()
            .find(|band| score >= band.min_score)
            .map(|band| band.criterion)
            .unwrap_or(self.floor)
    }

    pub fn rule_passes(&self, score: f64, rule: &RuleDefinition) -> bool {
        self.criterion_for(score).admits(rule)
    }
}

/// Approval gate shared by both evaluation modes.
pub(crate) fn is_approved(
    config: &EvaluationConfig,
    overall_score: f64,
    fraud_indicators: &[String],
    results: &[ValidationRuleResult],
) -> bool {
    overall_score >= config.approval_threshold
        && fraud_indicators.is_empty()
        && !results
            .iter()
            .any(|result| !result.passed && result.weight >= config.critical_weight_threshold)
}
