use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use tracing::info;

use super::domain::{ClaimId, ClaimPacket, ClaimStatus};
use super::repository::{ClaimRecord, ClaimRepository, RepositoryError};
use super::validation_loop::{ValidationLoopController, ValidationLoopError, ValidationLoopReport};

const MAX_PAGE_SIZE: usize = 100;

/// Service composing the claim repository and the validation loop.
pub struct ClaimValidationService<R> {
    repository: Arc<R>,
    controller: Arc<ValidationLoopController>,
}

impl<R> ClaimValidationService<R>
where
    R: ClaimRepository + 'static,
{
    pub fn new(repository: Arc<R>, controller: Arc<ValidationLoopController>) -> Self {
        Self {
            repository,
            controller,
        }
    }

    pub fn controller(&self) -> &ValidationLoopController {
        &self.controller
    }

    /// Store a new claim packet awaiting validation.
    pub fn submit(&self, packet: ClaimPacket) -> Result<ClaimRecord, ClaimServiceError> {
        check_packet(&packet)?;
        let stored = self.repository.insert(ClaimRecord::submitted(packet))?;
        info!(
            claim_id = %stored.packet.claim_id,
            documents = stored.packet.documents.len(),
            "claim submitted"
        );
        Ok(stored)
    }

    /// Run the loop for a stored claim and persist the outcome.
    ///
    /// The stored packet stays as submitted; enhanced evidence lives only in
    /// the returned report so repeated runs start from the same documents.
    pub async fn validate(&self, claim_id: &ClaimId) -> Result<ValidationLoopReport, ClaimServiceError> {
        self.validate_at(claim_id, Utc::now()).await
    }

    pub async fn validate_at(
        &self,
        claim_id: &ClaimId,
        as_of: DateTime<Utc>,
    ) -> Result<ValidationLoopReport, ClaimServiceError> {
        let mut record = self
            .repository
            .fetch(claim_id)?
            .ok_or(RepositoryError::NotFound)?;

        let report = self.controller.run_at(record.packet.clone(), as_of).await?;

        record.status = ClaimStatus::Validated;
        record.validation = Some(report.persistence_record());
        self.repository.update(record)?;

        Ok(report)
    }

    /// Run the loop for a packet that is not stored.
    pub async fn validate_packet(
        &self,
        packet: ClaimPacket,
    ) -> Result<ValidationLoopReport, ClaimServiceError> {
        check_packet(&packet)?;
        Ok(self.controller.run(packet).await?)
    }

    pub fn get(&self, claim_id: &ClaimId) -> Result<ClaimRecord, ClaimServiceError> {
        let record = self
            .repository
            .fetch(claim_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn list(&self, limit: usize, offset: usize) -> Result<Vec<ClaimRecord>, ClaimServiceError> {
        Ok(self.repository.list(limit.min(MAX_PAGE_SIZE), offset)?)
    }
}

fn check_packet(packet: &ClaimPacket) -> Result<(), ClaimServiceError> {
    if packet.claim_id.as_str().trim().is_empty() {
        return Err(ClaimServiceError::InvalidPacket(
            "claim_id must not be empty".to_string(),
        ));
    }
    if let Some(damage) = packet.estimated_damage {
        if !damage.is_finite() || damage < 0.0 {
            return Err(ClaimServiceError::InvalidPacket(format!(
                "estimated_damage {damage} must be a non-negative amount"
            )));
        }
    }
    Ok(())
}

/// Error raised by the claim validation service.
#[derive(Debug, thiserror::Error)]
pub enum ClaimServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Loop(#[from] ValidationLoopError),
    #[error("invalid claim packet: {0}")]
    InvalidPacket(String),
}

impl ClaimServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClaimServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            ClaimServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            ClaimServiceError::InvalidPacket(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ClaimServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ClaimServiceError::Loop(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
