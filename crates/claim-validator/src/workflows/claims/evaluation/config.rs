use serde::{Deserialize, Serialize};

use super::policy::PassRatePolicy;

/// Thresholds shared by the local rules, the fraud scan and the approval gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub approval_threshold: f64,
    /// Any failed rule at or above this weight blocks approval.
    pub critical_weight_threshold: f64,
    pub filing_window_days: i64,
    pub late_filing_days: i64,
    pub receipt_required_above: f64,
    pub minimum_photos: usize,
    pub multiple_angle_photos: usize,
    pub max_photo_count: usize,
    /// Claims above this amount need strong severity language in photo evidence.
    pub severity_check_above: f64,
    /// Claims below this amount should not be described as catastrophic.
    pub minor_claim_below: f64,
    /// Claims above this amount need receipts and a policy on file.
    pub documentation_review_above: f64,
    pub missing_receipts_above: f64,
    pub max_plausible_damage: f64,
    pub min_plausible_damage: f64,
    pub receipt_coverage_ratio: f64,
    pub receipt_lookback_days: i64,
    pub emergency_expense_days: i64,
    pub pass_rate_policy: PassRatePolicy,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            approval_threshold: 0.75,
            critical_weight_threshold: 0.15,
            filing_window_days: 60,
            late_filing_days: 90,
            receipt_required_above: 100.0,
            minimum_photos: 2,
            multiple_angle_photos: 3,
            max_photo_count: 20,
            severity_check_above: 100_000.0,
            minor_claim_below: 10_000.0,
            documentation_review_above: 50_000.0,
            missing_receipts_above: 10_000.0,
            max_plausible_damage: 500_000.0,
            min_plausible_damage: 1_000.0,
            receipt_coverage_ratio: 0.5,
            receipt_lookback_days: 30,
            emergency_expense_days: 30,
            pass_rate_policy: PassRatePolicy::default(),
        }
    }
}
