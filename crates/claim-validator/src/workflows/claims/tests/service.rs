use super::common::*;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::workflows::claims::domain::{ClaimId, ClaimStatus};
use crate::workflows::claims::repository::{RepositoryError, TrustBadge};
use crate::workflows::claims::service::{ClaimServiceError, ClaimValidationService};
use crate::workflows::claims::validation_loop::{
    LoopOutcome, ValidationLoopError, ValidationLoopReport,
};

#[test]
fn submit_stores_claim_as_submitted() {
    let (service, repository) = build_service();

    let stored = service.submit(documented_packet()).expect("submit succeeds");

    assert_eq!(stored.status, ClaimStatus::Submitted);
    assert!(stored.validation.is_none());
    let records = repository.records.lock().expect("lock");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].packet.claim_id.as_str(), "WF-DOCUMENTED");
}

#[test]
fn duplicate_submission_conflicts() {
    let (service, _) = build_service();
    service.submit(sparse_packet()).expect("first submit");

    let err = service.submit(sparse_packet()).expect_err("duplicate");

    assert!(matches!(
        err,
        ClaimServiceError::Repository(RepositoryError::Conflict)
    ));
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
}

#[test]
fn malformed_packets_are_rejected_before_storage() {
    let (service, repository) = build_service();

    let mut unnamed = sparse_packet();
    unnamed.claim_id = ClaimId::from("  ");
    let err = service.submit(unnamed).expect_err("empty id");
    assert!(matches!(err, ClaimServiceError::InvalidPacket(_)));
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let mut negative = sparse_packet();
    negative.estimated_damage = Some(-10.0);
    assert!(matches!(
        service.submit(negative),
        Err(ClaimServiceError::InvalidPacket(_))
    ));

    let mut unbounded = sparse_packet();
    unbounded.estimated_damage = Some(f64::INFINITY);
    assert!(matches!(
        service.submit(unbounded),
        Err(ClaimServiceError::InvalidPacket(_))
    ));

    let mut unpriced = sparse_packet();
    unpriced.estimated_damage = None;
    assert!(service.submit(unpriced).is_ok());

    assert_eq!(repository.records.lock().expect("lock").len(), 1);
}

#[tokio::test]
async fn validation_persists_outcome_and_keeps_submitted_packet() {
    let (service, _) = build_service();
    service.submit(documented_packet()).expect("submit");
    let claim_id = ClaimId::from("WF-DOCUMENTED");

    let report = service
        .validate_at(&claim_id, days_after_incident(10))
        .await
        .expect("validation succeeds");

    let stored = service.get(&claim_id).expect("claim stored");
    assert_eq!(stored.status, ClaimStatus::Validated);
    assert_eq!(stored.packet.documents.len(), 6);
    assert_eq!(report.packet.documents.len(), 10);
    let validation = stored.validation.as_ref().expect("validation recorded");
    assert_eq!(validation.outcome, report.outcome);
    assert_eq!(validation.history.len(), report.iterations_completed);
    assert_eq!(validation.final_validation, report.final_validation);

    let view = stored.status_view();
    assert_eq!(view.status, "validated");
    assert_eq!(view.iterations, Some(4));
    assert_eq!(view.outcome, Some(LoopOutcome::BudgetExhausted));
    assert_eq!(view.trust_badge, Some("BRONZE_TRUST"));
}

#[tokio::test]
async fn revalidating_a_stored_claim_gives_the_same_result() {
    let (service, _) = build_service();
    service.submit(documented_packet()).expect("submit");
    let claim_id = ClaimId::from("WF-DOCUMENTED");

    let first = service
        .validate_at(&claim_id, days_after_incident(10))
        .await
        .expect("first validation");
    let second = service
        .validate_at(&claim_id, days_after_incident(10))
        .await
        .expect("second validation");

    assert_eq!(
        second.final_validation.overall_score,
        first.final_validation.overall_score
    );
    assert_eq!(second.packet.documents.len(), first.packet.documents.len());
    assert_eq!(
        second
            .packet
            .documents
            .iter()
            .filter(|document| document.is_receipt_rollup())
            .count(),
        1
    );
    let fin_002 = |report: &ValidationLoopReport| {
        report
            .final_validation
            .rules_evaluated
            .iter()
            .find(|result| result.rule_id == "FIN_002")
            .map(|result| result.passed)
    };
    assert_eq!(fin_002(&second), fin_002(&first));
    let stored = service.get(&claim_id).expect("claim stored");
    assert_eq!(stored.packet.documents.len(), 6);
}

#[tokio::test]
async fn validating_unknown_claim_is_not_found() {
    let (service, _) = build_service();

    let err = service
        .validate(&ClaimId::from("WF-MISSING"))
        .await
        .expect_err("unknown claim");

    assert!(matches!(
        err,
        ClaimServiceError::Repository(RepositoryError::NotFound)
    ));
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    assert!(matches!(
        service.get(&ClaimId::from("WF-MISSING")),
        Err(ClaimServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[tokio::test]
async fn inline_packets_are_validated_without_storage() {
    let (service, repository) = build_service();

    let report = service
        .validate_packet(complete_packet())
        .await
        .expect("inline validation");

    assert_eq!(report.claim_id.as_str(), "WF-COMPLETE");
    assert_eq!(report.history.len(), report.iterations_completed);
    assert!(repository.records.lock().expect("lock").is_empty());

    let mut invalid = complete_packet();
    invalid.claim_id = ClaimId::from("");
    assert!(matches!(
        service.validate_packet(invalid).await,
        Err(ClaimServiceError::InvalidPacket(_))
    ));
}

#[test]
fn listing_pages_in_submission_order() {
    let (service, _) = build_service();
    for id in ["WF-1", "WF-2", "WF-3"] {
        service
            .submit(packet(id, vec![policy_document()]))
            .expect("submit");
    }

    let page = service.list(2, 1).expect("list");
    let ids: Vec<&str> = page
        .iter()
        .map(|record| record.packet.claim_id.as_str())
        .collect();
    assert_eq!(ids, vec!["WF-2", "WF-3"]);

    assert_eq!(service.list(1_000, 0).expect("list").len(), 3);
}

#[test]
fn unavailable_repository_maps_to_service_unavailable() {
    let service = service_with(UnavailableRepository);

    let err = service.submit(sparse_packet()).expect_err("offline");

    assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(err.to_string().contains("database offline"));
}

#[test]
fn loop_errors_map_to_internal_error() {
    let err = ClaimServiceError::from(ValidationLoopError::NoStages);
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn service_exposes_its_controller() {
    let repository = Arc::new(MemoryRepository::default());
    let controller = Arc::new(local_controller(Arc::new(StaticReceiptSource::default())));
    let service = ClaimValidationService::new(repository, controller);

    assert_eq!(service.controller().max_iterations(), 4);
    assert_eq!(service.controller().constitution().len(), 47);
}

#[test]
fn trust_badges_follow_score_tiers() {
    assert_eq!(TrustBadge::for_score(0.95), TrustBadge::GoldTrust);
    assert_eq!(TrustBadge::for_score(0.9), TrustBadge::GoldTrust);
    assert_eq!(TrustBadge::for_score(0.85), TrustBadge::SilverTrust);
    assert_eq!(TrustBadge::for_score(0.6), TrustBadge::BronzeTrust);
    assert_eq!(TrustBadge::for_score(0.59), TrustBadge::ReviewRequired);
    assert_eq!(TrustBadge::ReviewRequired.label(), "REVIEW_REQUIRED");
    assert_eq!(TrustBadge::SilverTrust.label(), "SILVER_TRUST");
}
