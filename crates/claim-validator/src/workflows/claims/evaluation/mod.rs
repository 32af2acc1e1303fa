mod config;
mod delegated;
mod local;
mod policy;
mod rules;

pub use config::EvaluationConfig;
pub use delegated::DelegatedEvaluator;
pub use local::LocalRuleEvaluator;
pub use policy::{PassBand, PassCriterion, PassRatePolicy, PassRatePolicyError};

pub(crate) use policy::is_approved;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ClaimId, ClaimPacket};
use super::judgment::JudgmentError;

/// Progressive depth of analysis applied at each loop stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisDepth {
    BasicScreening,
    EnhancedWithReceipts,
    ForensicAnalysis,
    ExpertReview,
}

impl AnalysisDepth {
    pub const fn label(self) -> &'static str {
        match self {
            AnalysisDepth::BasicScreening => "BASIC_SCREENING",
            AnalysisDepth::EnhancedWithReceipts => "ENHANCED_WITH_RECEIPTS",
            AnalysisDepth::ForensicAnalysis => "FORENSIC_ANALYSIS",
            AnalysisDepth::ExpertReview => "EXPERT_REVIEW",
        }
    }
}

/// How an iteration's validation was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    Delegated,
    Local,
}

/// Per-iteration inputs handed to an evaluator alongside the packet.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub iteration: usize,
    pub depth: AnalysisDepth,
    pub previous_scores: &'a [f64],
    /// Reference instant for elapsed-time rules.
    pub as_of: DateTime<Utc>,
}

/// Outcome of a single constitution rule for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRuleResult {
    pub rule_id: String,
    pub description: String,
    pub weight: f64,
    pub passed: bool,
    pub confidence: f64,
    pub rationale: String,
}

/// Scored judgment of a claim packet at one point in the loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimValidation {
    pub claim_id: ClaimId,
    pub overall_score: f64,
    pub confidence: f64,
    pub approved: bool,
    pub rules_evaluated: Vec<ValidationRuleResult>,
    pub missing_documents: Vec<String>,
    pub fraud_indicators: Vec<String>,
    pub rationale: String,
    pub timestamp: DateTime<Utc>,
}

impl ClaimValidation {
    pub fn rules_passed(&self) -> usize {
        self.rules_evaluated
            .iter()
            .filter(|result| result.passed)
            .count()
    }

    pub fn result(&self, rule_id: &str) -> Option<&ValidationRuleResult> {
        self.rules_evaluated
            .iter()
            .find(|result| result.rule_id == rule_id)
    }
}

/// Produces one [`ClaimValidation`] per loop iteration.
#[async_trait]
pub trait ClaimEvaluator: Send + Sync {
    fn mode(&self) -> EvaluationMode;

    async fn evaluate(
        &self,
        packet: &ClaimPacket,
        context: &EvaluationContext<'_>,
    ) -> Result<ClaimValidation, EvaluationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Judgment(#[from] JudgmentError),
    #[error("judgment source did not answer within {0:?}")]
    Timeout(Duration),
    #[error("judgment assessment rejected: {0}")]
    InvalidAssessment(String),
}
