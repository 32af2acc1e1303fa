//! Wildfire claim intake and progressive validation.
//!
//! A claim packet is scored against the versioned [`RuleConstitution`], enhanced
//! with purchase history and re-extracted documents, and re-scored until it meets
//! the target score or runs out of stages. Scores come either from an external
//! judgment spread across the rules or from local rule checks.

pub mod constitution;
pub mod domain;
pub mod enhancement;
pub mod evaluation;
pub mod judgment;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod validation_loop;

#[cfg(test)]
mod tests;

pub use constitution::{ConstitutionError, RuleCategory, RuleConstitution, RuleDefinition};
pub use domain::{
    ClaimId, ClaimIdentity, ClaimPacket, ClaimStatus, Document, DocumentType, ExtractedData,
    MerchantCategory, ReceiptTotal,
};
pub use enhancement::{
    ClaimEnhancer, CsvReceiptSource, DocumentReprocessor, FieldCompletenessReprocessor,
    NoEnhancement, ReceiptEnhancer, ReceiptRecord, ReceiptSource, ReprocessingEnhancer,
};
pub use evaluation::{
    AnalysisDepth, ClaimEvaluator, ClaimValidation, DelegatedEvaluator, EvaluationConfig,
    EvaluationContext, EvaluationError, EvaluationMode, LocalRuleEvaluator, PassRatePolicy,
    PassRatePolicyError, ValidationRuleResult,
};
pub use judgment::{ExternalJudgment, HttpJudgment, JudgmentAssessment, JudgmentError};
pub use repository::{
    ClaimRecord, ClaimRepository, ClaimStatusView, RepositoryError, TrustBadge,
};
pub use router::claim_router;
pub use scoring::{ScoreAggregator, ScoreSummary};
pub use service::{ClaimServiceError, ClaimValidationService};
pub use validation_loop::{
    standard_stages, IterationRecord, LoopOutcome, ValidationLoopController,
    ValidationLoopError, ValidationLoopReport, ValidationRecord, ValidationStage,
    DEFAULT_TARGET_SCORE,
};
