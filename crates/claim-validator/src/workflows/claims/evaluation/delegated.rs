use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::super::constitution::RuleConstitution;
use super::super::domain::ClaimPacket;
use super::super::judgment::{ClaimSummary, ExternalJudgment, IterationContext, JudgmentAssessment};
use super::super::scoring::MAX_FINDINGS;
use super::config::EvaluationConfig;
use super::policy::is_approved;
use super::{
    AnalysisDepth, ClaimEvaluator, ClaimValidation, EvaluationContext, EvaluationError,
    EvaluationMode, ValidationRuleResult,
};

const RULE_RATIONALE_CHARS: usize = 100;

/// Evaluation backed by an external holistic judgment.
///
/// The assessment's overall score is authoritative. Per-rule pass/fail is derived
/// from it through the configured [`super::PassRatePolicy`] so that pass counts
/// stay consistent with the score; no rule is checked independently.
pub struct DelegatedEvaluator {
    judgment: Arc<dyn ExternalJudgment>,
    constitution: Arc<RuleConstitution>,
    config: EvaluationConfig,
    timeout: Duration,
}

impl DelegatedEvaluator {
    pub fn new(
        judgment: Arc<dyn ExternalJudgment>,
        constitution: Arc<RuleConstitution>,
        config: EvaluationConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            judgment,
            constitution,
            config,
            timeout,
        }
    }

    /// Spreads a holistic assessment over every constitution rule.
    pub fn distribute(
        &self,
        packet: &ClaimPacket,
        assessment: &JudgmentAssessment,
        depth: AnalysisDepth,
        as_of: DateTime<Utc>,
    ) -> ClaimValidation {
        let overall_score = assessment.overall_score.clamp(0.0, 1.0);
        let confidence = if assessment.confidence.is_finite() {
            assessment.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let narrative = if assessment.rationale.trim().is_empty() {
            "Analysis complete"
        } else {
            assessment.rationale.trim()
        };
        let rule_rationale: String = format!("{}: {narrative}", depth.label())
            .chars()
            .take(RULE_RATIONALE_CHARS)
            .collect();

        let policy = &self.config.pass_rate_policy;
        let rules_evaluated: Vec<ValidationRuleResult> = self
            .constitution
            .rules()
            .iter()
            .map(|rule| ValidationRuleResult {
                rule_id: rule.id.clone(),
                description: rule.description.clone(),
                weight: rule.weight,
                passed: policy.rule_passes(overall_score, rule),
                confidence,
                rationale: rule_rationale.clone(),
            })
            .collect();

        let fraud_indicators: Vec<String> = assessment
            .fraud_indicators
            .iter()
            .take(MAX_FINDINGS)
            .cloned()
            .collect();
        let missing_documents: Vec<String> = assessment
            .missing_documents
            .iter()
            .take(MAX_FINDINGS)
            .cloned()
            .collect();
        let approved = assessment.approved
            && is_approved(&self.config, overall_score, &fraud_indicators, &rules_evaluated);
        let rules_passed = rules_evaluated.iter().filter(|result| result.passed).count();

        ClaimValidation {
            claim_id: packet.claim_id.clone(),
            overall_score,
            confidence,
            approved,
            missing_documents,
            fraud_indicators,
            rationale: format!(
                "{narrative} | Analysis Depth: {} | Score: {:.1}% | Rules: {rules_passed}/{}",
                depth.label(),
                overall_score * 100.0,
                rules_evaluated.len()
            ),
            rules_evaluated,
            timestamp: as_of,
        }
    }
}

#[async_trait]
impl ClaimEvaluator for DelegatedEvaluator {
    fn mode(&self) -> EvaluationMode {
        EvaluationMode::Delegated
    }

    async fn evaluate(
        &self,
        packet: &ClaimPacket,
        context: &EvaluationContext<'_>,
    ) -> Result<ClaimValidation, EvaluationError> {
        let summary = ClaimSummary::from_packet(packet, context.as_of);
        let iteration = IterationContext::from(context);

        let assessment = tokio::time::timeout(self.timeout, self.judgment.assess(&summary, &iteration))
            .await
            .map_err(|_| EvaluationError::Timeout(self.timeout))??;

        if !assessment.overall_score.is_finite() {
            return Err(EvaluationError::InvalidAssessment(format!(
                "overall score {} is not a number",
                assessment.overall_score
            )));
        }

        Ok(self.distribute(packet, &assessment, context.depth, context.as_of))
    }
}
