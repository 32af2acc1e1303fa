use serde::{Deserialize, Serialize};

use super::domain::{ClaimId, ClaimPacket, ClaimStatus};
use super::validation_loop::{LoopOutcome, ValidationRecord};

/// Repository record containing the packet, status, and latest loop outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub packet: ClaimPacket,
    pub status: ClaimStatus,
    pub validation: Option<ValidationRecord>,
}

impl ClaimRecord {
    pub fn submitted(packet: ClaimPacket) -> Self {
        Self {
            packet,
            status: ClaimStatus::Submitted,
            validation: None,
        }
    }

    pub fn status_view(&self) -> ClaimStatusView {
        let validation = self.validation.as_ref();
        let final_score = validation.map(|record| record.final_validation.overall_score);
        ClaimStatusView {
            claim_id: self.packet.claim_id.clone(),
            status: self.status.label(),
            documents: self.packet.documents.len(),
            outcome: validation.map(|record| record.outcome),
            iterations: validation.map(|record| record.history.len()),
            final_score,
            approved: validation.map(|record| record.final_validation.approved),
            trust_badge: final_score.map(|score| TrustBadge::for_score(score).label()),
        }
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ClaimRepository: Send + Sync {
    fn insert(&self, record: ClaimRecord) -> Result<ClaimRecord, RepositoryError>;
    fn update(&self, record: ClaimRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ClaimId) -> Result<Option<ClaimRecord>, RepositoryError>;
    fn list(&self, limit: usize, offset: usize) -> Result<Vec<ClaimRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Presentation tier derived from a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustBadge {
    GoldTrust,
    SilverTrust,
    BronzeTrust,
    ReviewRequired,
}

impl TrustBadge {
    pub fn for_score(score: f64) -> Self {
        if score >= 0.9 {
            TrustBadge::GoldTrust
        } else if score >= 0.8 {
            TrustBadge::SilverTrust
        } else if score >= 0.6 {
            TrustBadge::BronzeTrust
        } else {
            TrustBadge::ReviewRequired
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TrustBadge::GoldTrust => "GOLD_TRUST",
            TrustBadge::SilverTrust => "SILVER_TRUST",
            TrustBadge::BronzeTrust => "BRONZE_TRUST",
            TrustBadge::ReviewRequired => "REVIEW_REQUIRED",
        }
    }
}

/// Sanitized representation of a claim's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimStatusView {
    pub claim_id: ClaimId,
    pub status: &'static str,
    pub documents: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<LoopOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_badge: Option<&'static str>,
}
