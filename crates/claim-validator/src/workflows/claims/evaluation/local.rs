use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::super::constitution::RuleConstitution;
use super::super::domain::ClaimPacket;
use super::super::scoring::ScoreAggregator;
use super::config::EvaluationConfig;
use super::rules::evaluate_rules;
use super::{
    AnalysisDepth, ClaimEvaluator, ClaimValidation, EvaluationContext, EvaluationError,
    EvaluationMode,
};

/// Deterministic rule-by-rule evaluation over the packet's own evidence.
///
/// Used directly when no judgment source is configured and as the per-iteration
/// fallback when one fails.
#[derive(Debug, Clone)]
pub struct LocalRuleEvaluator {
    constitution: Arc<RuleConstitution>,
    aggregator: ScoreAggregator,
}

impl LocalRuleEvaluator {
    pub fn new(constitution: Arc<RuleConstitution>, config: EvaluationConfig) -> Self {
        Self {
            constitution,
            aggregator: ScoreAggregator::new(config),
        }
    }

    pub fn constitution(&self) -> &RuleConstitution {
        &self.constitution
    }

    pub fn evaluate_at(
        &self,
        packet: &ClaimPacket,
        depth: AnalysisDepth,
        as_of: DateTime<Utc>,
    ) -> ClaimValidation {
        let results = evaluate_rules(packet, &self.constitution, self.aggregator.config(), as_of);
        let label = format!("Local Evaluation ({})", depth.label());
        self.aggregator.assemble(packet, results, as_of, &label)
    }
}

#[async_trait]
impl ClaimEvaluator for LocalRuleEvaluator {
    fn mode(&self) -> EvaluationMode {
        EvaluationMode::Local
    }

    async fn evaluate(
        &self,
        packet: &ClaimPacket,
        context: &EvaluationContext<'_>,
    ) -> Result<ClaimValidation, EvaluationError> {
        Ok(self.evaluate_at(packet, context.depth, context.as_of))
    }
}
