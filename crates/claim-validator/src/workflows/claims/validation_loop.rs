//! Progressive validation loop.
//!
//! `INIT -> ITERATING(k) -> TARGET_MET | BUDGET_EXHAUSTED`. Each stage enhances
//! the packet, evaluates it, and appends an [`IterationRecord`]. The loop stops as
//! soon as a score reaches the target, including on the first iteration. The
//! reported validation is always the last iteration's, even when an earlier one
//! scored higher.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::constitution::RuleConstitution;
use super::domain::{ClaimId, ClaimPacket, ClaimStatus};
use super::enhancement::{ClaimEnhancer, NoEnhancement};
use super::evaluation::{
    AnalysisDepth, ClaimEvaluator, ClaimValidation, EvaluationContext, EvaluationMode,
    LocalRuleEvaluator,
};

pub const DEFAULT_TARGET_SCORE: f64 = 0.8;

/// One step of the loop: an enhancement followed by an evaluation at `depth`.
#[derive(Clone)]
pub struct ValidationStage {
    pub depth: AnalysisDepth,
    pub enhancer: Arc<dyn ClaimEnhancer>,
}

impl ValidationStage {
    pub fn new(depth: AnalysisDepth, enhancer: Arc<dyn ClaimEnhancer>) -> Self {
        Self { depth, enhancer }
    }
}

/// The four-stage wildfire sequence: screen, add receipts, reprocess, final review.
pub fn standard_stages(
    receipts: Arc<dyn ClaimEnhancer>,
    reprocessing: Arc<dyn ClaimEnhancer>,
) -> Vec<ValidationStage> {
    vec![
        ValidationStage::new(AnalysisDepth::BasicScreening, Arc::new(NoEnhancement)),
        ValidationStage::new(AnalysisDepth::EnhancedWithReceipts, receipts),
        ValidationStage::new(AnalysisDepth::ForensicAnalysis, reprocessing),
        ValidationStage::new(AnalysisDepth::ExpertReview, Arc::new(NoEnhancement)),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopOutcome {
    TargetMet,
    BudgetExhausted,
}

/// Audit entry for one loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub analysis_depth: AnalysisDepth,
    pub evaluation_mode: EvaluationMode,
    pub score: f64,
    pub rules_passed: usize,
    pub total_rules: usize,
    pub improvement: f64,
    pub documents_processed: usize,
    pub validation: ClaimValidation,
}

/// Everything the loop produced for a claim.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationLoopReport {
    pub claim_id: ClaimId,
    pub outcome: LoopOutcome,
    pub final_validation: ClaimValidation,
    pub history: Vec<IterationRecord>,
    pub iterations_completed: usize,
    pub total_improvement: f64,
    pub final_analysis_depth: AnalysisDepth,
    /// Packet as left by the last enhancement stage.
    #[serde(skip)]
    pub packet: ClaimPacket,
}

impl ValidationLoopReport {
    pub fn persistence_record(&self) -> ValidationRecord {
        ValidationRecord {
            claim_id: self.claim_id.clone(),
            status: ClaimStatus::Validated,
            outcome: self.outcome,
            final_validation: self.final_validation.clone(),
            history: self.history.clone(),
        }
    }
}

/// What gets stored once a loop completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub claim_id: ClaimId,
    pub status: ClaimStatus,
    pub outcome: LoopOutcome,
    pub final_validation: ClaimValidation,
    pub history: Vec<IterationRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationLoopError {
    #[error(
        "iteration {iteration} produced {actual} rule results but the constitution defines {expected}"
    )]
    ConstitutionMismatch {
        iteration: usize,
        expected: usize,
        actual: usize,
    },
    #[error("enhancement stage {stage} changed the claim's identifying fields")]
    IdentityChanged { stage: &'static str },
    #[error("validation loop has no stages configured")]
    NoStages,
}

/// Drives a claim through the configured stages until it meets the target score.
pub struct ValidationLoopController {
    constitution: Arc<RuleConstitution>,
    evaluator: Arc<dyn ClaimEvaluator>,
    fallback: LocalRuleEvaluator,
    stages: Vec<ValidationStage>,
    target_score: f64,
}

impl std::fmt::Debug for ValidationLoopController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationLoopController")
            .field("constitution", &self.constitution)
            .field("fallback", &self.fallback)
            .field("stages", &self.stages.len())
            .field("target_score", &self.target_score)
            .finish_non_exhaustive()
    }
}

impl ValidationLoopController {
    pub fn new(
        constitution: Arc<RuleConstitution>,
        evaluator: Arc<dyn ClaimEvaluator>,
        fallback: LocalRuleEvaluator,
        stages: Vec<ValidationStage>,
    ) -> Self {
        Self {
            constitution,
            evaluator,
            fallback,
            stages,
            target_score: DEFAULT_TARGET_SCORE,
        }
    }

    /// Targets above 1.0 are capped; targets that are not a positive number
    /// keep the current target.
    pub fn with_target_score(mut self, target_score: f64) -> Self {
        if target_score.is_finite() && target_score > 0.0 {
            self.target_score = target_score.min(1.0);
        } else {
            warn!(target_score, kept = self.target_score, "ignoring invalid target score");
        }
        self
    }

    pub fn target_score(&self) -> f64 {
        self.target_score
    }

    pub fn max_iterations(&self) -> usize {
        self.stages.len()
    }

    pub fn constitution(&self) -> &RuleConstitution {
        &self.constitution
    }

    pub async fn run(&self, packet: ClaimPacket) -> Result<ValidationLoopReport, ValidationLoopError> {
        self.run_at(packet, Utc::now()).await
    }

    /// Runs the loop with `as_of` as the reference instant for every iteration.
    pub async fn run_at(
        &self,
        mut packet: ClaimPacket,
        as_of: DateTime<Utc>,
    ) -> Result<ValidationLoopReport, ValidationLoopError> {
        if self.stages.is_empty() {
            return Err(ValidationLoopError::NoStages);
        }

        let identity = packet.identity();
        let expected_rules = self.constitution.len();
        let mut history: Vec<IterationRecord> = Vec::with_capacity(self.stages.len());
        let mut previous_scores: Vec<f64> = Vec::new();
        let mut outcome = LoopOutcome::BudgetExhausted;

        info!(
            claim_id = %packet.claim_id,
            max_iterations = self.stages.len(),
            target = self.target_score,
            "starting progressive validation"
        );

        for (index, stage) in self.stages.iter().enumerate() {
            let iteration = index + 1;

            packet = stage.enhancer.enhance(packet).await;
            if packet.identity() != identity {
                return Err(ValidationLoopError::IdentityChanged {
                    stage: stage.enhancer.name(),
                });
            }

            let context = EvaluationContext {
                iteration,
                depth: stage.depth,
                previous_scores: &previous_scores,
                as_of,
            };
            let (validation, evaluation_mode) =
                match self.evaluator.evaluate(&packet, &context).await {
                    Ok(validation) => (validation, self.evaluator.mode()),
                    Err(err) => {
                        warn!(
                            claim_id = %packet.claim_id,
                            iteration,
                            error = %err,
                            "evaluator failed, using local rules for this iteration"
                        );
                        (
                            self.fallback.evaluate_at(&packet, stage.depth, as_of),
                            EvaluationMode::Local,
                        )
                    }
                };

            let total_rules = validation.rules_evaluated.len();
            if total_rules != expected_rules {
                return Err(ValidationLoopError::ConstitutionMismatch {
                    iteration,
                    expected: expected_rules,
                    actual: total_rules,
                });
            }

            let score = validation.overall_score;
            let improvement = previous_scores
                .last()
                .map(|previous| score - previous)
                .unwrap_or(0.0);
            let rules_passed = validation.rules_passed();

            info!(
                claim_id = %packet.claim_id,
                iteration,
                depth = stage.depth.label(),
                score,
                rules_passed,
                total_rules,
                improvement,
                "validation iteration complete"
            );

            history.push(IterationRecord {
                iteration,
                analysis_depth: stage.depth,
                evaluation_mode,
                score,
                rules_passed,
                total_rules,
                improvement,
                documents_processed: packet.documents.len(),
                validation,
            });

            if score >= self.target_score {
                outcome = LoopOutcome::TargetMet;
                break;
            }
            previous_scores.push(score);
        }

        let (first, last) = match (history.first(), history.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(ValidationLoopError::NoStages),
        };
        let total_improvement = if history.len() > 1 {
            last.score - first.score
        } else {
            0.0
        };
        let final_validation = last.validation.clone();
        let final_analysis_depth = last.analysis_depth;
        let iterations_completed = history.len();

        info!(
            claim_id = %packet.claim_id,
            outcome = ?outcome,
            iterations = iterations_completed,
            final_score = final_validation.overall_score,
            total_improvement,
            "progressive validation finished"
        );

        Ok(ValidationLoopReport {
            claim_id: packet.claim_id.clone(),
            outcome,
            final_validation,
            history,
            iterations_completed,
            total_improvement,
            final_analysis_depth,
            packet,
        })
    }
}
