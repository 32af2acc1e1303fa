//! End-to-end scenarios for the wildfire claim validation loop.
//!
//! Everything here goes through the public service facade, the HTTP router, and a
//! judgment source reached over a real socket.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use claim_validator::workflows::claims::enhancement::{
        ReceiptQuery, ReceiptRecord, ReceiptSource, ReceiptSourceError,
    };
    use claim_validator::workflows::claims::{
        standard_stages, ClaimId, ClaimPacket, ClaimRecord, ClaimRepository, Document,
        DocumentType, EvaluationConfig, ExtractedData, FieldCompletenessReprocessor,
        LocalRuleEvaluator, ReceiptEnhancer, ReprocessingEnhancer, RepositoryError,
        RuleConstitution, ValidationLoopController,
    };

    pub(super) fn as_of(days_after_fire: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).single().expect("valid instant")
            + chrono::Duration::days(days_after_fire)
    }

    /// Claim for a home lost to the August 1 fire, with photos and one large receipt.
    pub(super) fn hillside_claim() -> ClaimPacket {
        ClaimPacket {
            claim_id: ClaimId::from("WF-HILLSIDE-7"),
            policy_number: "HO-3-55120".to_string(),
            claimant_name: "Morgan Ellery".to_string(),
            incident_date: "2025-08-01".to_string(),
            property_address: "77 Canyon View Rd, Lake Elsinore, CA 92530".to_string(),
            estimated_damage: Some(95_000.0),
            documents: vec![
                Document::new(
                    "policy",
                    "declarations.pdf",
                    DocumentType::Policy,
                    ExtractedData::new()
                        .with("policy_number", "HO-3-55120")
                        .with("coverage_limit", 250_000.0),
                    0.9,
                ),
                Document::new(
                    "photo-front",
                    "front.jpg",
                    DocumentType::Photo,
                    ExtractedData::new().with("description", "Fire damage to the front porch"),
                    0.87,
                ),
                Document::new(
                    "photo-roof",
                    "roof.jpg",
                    DocumentType::Photo,
                    ExtractedData::new().with("description", "Burned roof trusses"),
                    0.84,
                ),
                Document::new(
                    "receipt-contractor",
                    "contractor.pdf",
                    DocumentType::Receipt,
                    ExtractedData::new()
                        .with("merchant", "Canyon Builders")
                        .with("total_amount", 48_000.0)
                        .with("date", "2025-08-09")
                        .with("items", vec!["Roof framing".to_string()]),
                    0.9,
                ),
            ],
            created_at: as_of(2),
        }
    }

    #[derive(Default)]
    pub(super) struct PurchaseLedger {
        records: HashMap<String, Vec<ReceiptRecord>>,
    }

    impl PurchaseLedger {
        pub(super) fn with(mut self, company: &str, merchant: &str, amount: f64, day: u32) -> Self {
            self.records
                .entry(company.to_string())
                .or_default()
                .push(ReceiptRecord {
                    merchant: merchant.to_string(),
                    total_amount: amount,
                    date: NaiveDate::from_ymd_opt(2025, 8, day).expect("valid date"),
                    items: vec!["Tarps".to_string(), "Respirator masks".to_string()],
                    payment_method: None,
                });
            self
        }
    }

    #[async_trait]
    impl ReceiptSource for PurchaseLedger {
        async fn find(
            &self,
            query: &ReceiptQuery,
        ) -> Result<Vec<ReceiptRecord>, ReceiptSourceError> {
            Ok(self.records.get(&query.company).cloned().unwrap_or_default())
        }
    }

    pub(super) fn local_controller(ledger: PurchaseLedger) -> ValidationLoopController {
        let constitution = Arc::new(RuleConstitution::wildfire_v1());
        let local = LocalRuleEvaluator::new(constitution.clone(), EvaluationConfig::default());
        ValidationLoopController::new(
            constitution,
            Arc::new(local.clone()),
            local,
            standard_stages(
                Arc::new(ReceiptEnhancer::new(Arc::new(ledger))),
                Arc::new(ReprocessingEnhancer::new(Arc::new(
                    FieldCompletenessReprocessor,
                ))),
            ),
        )
    }

    #[derive(Default)]
    pub(super) struct InMemoryClaims {
        records: Mutex<Vec<ClaimRecord>>,
    }

    impl ClaimRepository for InMemoryClaims {
        fn insert(&self, record: ClaimRecord) -> Result<ClaimRecord, RepositoryError> {
            let mut guard = self.records.lock().expect("lock");
            if guard
                .iter()
                .any(|existing| existing.packet.claim_id == record.packet.claim_id)
            {
                return Err(RepositoryError::Conflict);
            }
            guard.push(record.clone());
            Ok(record)
        }

        fn update(&self, record: ClaimRecord) -> Result<(), RepositoryError> {
            let mut guard = self.records.lock().expect("lock");
            let slot = guard
                .iter_mut()
                .find(|existing| existing.packet.claim_id == record.packet.claim_id)
                .ok_or(RepositoryError::NotFound)?;
            *slot = record;
            Ok(())
        }

        fn fetch(&self, id: &ClaimId) -> Result<Option<ClaimRecord>, RepositoryError> {
            let guard = self.records.lock().expect("lock");
            Ok(guard.iter().find(|record| &record.packet.claim_id == id).cloned())
        }

        fn list(&self, limit: usize, offset: usize) -> Result<Vec<ClaimRecord>, RepositoryError> {
            let guard = self.records.lock().expect("lock");
            Ok(guard.iter().skip(offset).take(limit).cloned().collect())
        }
    }
}

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use claim_validator::workflows::claims::{
    claim_router, AnalysisDepth, ClaimId, ClaimStatus, ClaimValidationService, DelegatedEvaluator,
    EvaluationConfig, EvaluationMode, HttpJudgment, LocalRuleEvaluator, LoopOutcome,
    NoEnhancement, RuleConstitution, ValidationLoopController, ValidationStage,
};

use common::*;

#[tokio::test]
async fn purchase_history_lifts_claim_between_screening_and_review() {
    let ledger = PurchaseLedger::default()
        .with("home_depot", "Home Depot", 2_150.0, 3)
        .with("walmart", "Walmart", 410.0, 5);
    let controller = local_controller(ledger);

    let report = controller
        .run_at(hillside_claim(), as_of(12))
        .await
        .expect("loop completes");

    assert_eq!(report.history[0].analysis_depth, AnalysisDepth::BasicScreening);
    assert!(report.history.len() >= 2);
    assert!(report.history[1].score >= report.history[0].score);
    assert!(report.history[1].documents_processed > report.history[0].documents_processed);
    assert!(report
        .packet
        .documents
        .iter()
        .any(|document| document.is_receipt_rollup()));
    assert_eq!(
        report.final_validation.overall_score,
        report.history.last().expect("history").score
    );
}

#[tokio::test]
async fn stored_claim_is_validated_through_the_router() {
    let repository = Arc::new(common::InMemoryClaims::default());
    let service = Arc::new(ClaimValidationService::new(
        repository,
        Arc::new(local_controller(PurchaseLedger::default())),
    ));
    let router = claim_router(service.clone());

    let submit = router
        .clone()
        .oneshot(
            Request::post("/api/v1/claims")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&hillside_claim()).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(submit.status(), StatusCode::ACCEPTED);

    let validate = router
        .oneshot(
            Request::post("/api/v1/claims/WF-HILLSIDE-7/validation-loop")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(validate.status(), StatusCode::OK);

    let stored = service
        .get(&ClaimId::from("WF-HILLSIDE-7"))
        .expect("claim stored");
    assert_eq!(stored.status, ClaimStatus::Validated);
    assert!(stored.validation.is_some());
}

#[derive(Clone, Default)]
struct JudgmentLog {
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn evaluate_claim(
    State(log): State<JudgmentLog>,
    axum::Json(request): axum::Json<Value>,
) -> axum::Json<Value> {
    let iteration = request["context"]["iteration"].as_u64().unwrap_or(0);
    log.requests.lock().expect("lock").push(request);
    let score = if iteration >= 2 { 0.86 } else { 0.64 };
    axum::Json(json!({
        "overall_score": score,
        "confidence": 0.8,
        "approved": iteration >= 2,
        "detailed_rationale": "Damage photos match the reported fire perimeter",
        "missing_documents": ["Contractor estimate"],
    }))
}

#[tokio::test]
async fn http_judgment_drives_delegated_iterations() {
    let log = JudgmentLog::default();
    let app = Router::new()
        .route("/evaluate-claim", post(evaluate_claim))
        .with_state(log.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind judgment listener");
    let address = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let judgment = HttpJudgment::new(&format!("http://{address}/"), Duration::from_secs(5))
        .expect("client builds");
    assert_eq!(judgment.endpoint(), format!("http://{address}/evaluate-claim"));

    let constitution = Arc::new(RuleConstitution::wildfire_v1());
    let controller = ValidationLoopController::new(
        constitution.clone(),
        Arc::new(DelegatedEvaluator::new(
            Arc::new(judgment),
            constitution.clone(),
            EvaluationConfig::default(),
            Duration::from_secs(5),
        )),
        LocalRuleEvaluator::new(constitution, EvaluationConfig::default()),
        vec![
            ValidationStage::new(AnalysisDepth::BasicScreening, Arc::new(NoEnhancement)),
            ValidationStage::new(AnalysisDepth::ExpertReview, Arc::new(NoEnhancement)),
        ],
    );

    let report = controller
        .run_at(hillside_claim(), as_of(12))
        .await
        .expect("loop completes");

    assert_eq!(report.outcome, LoopOutcome::TargetMet);
    assert_eq!(report.iterations_completed, 2);
    assert!(report
        .history
        .iter()
        .all(|record| record.evaluation_mode == EvaluationMode::Delegated));
    assert_eq!(report.final_validation.overall_score, 0.86);
    assert_eq!(
        report.final_validation.missing_documents,
        vec!["Contractor estimate".to_string()]
    );

    let requests = log.requests.lock().expect("lock").clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["claim"]["claim_id"], "WF-HILLSIDE-7");
    assert_eq!(requests[0]["claim"]["days_since_incident"], 12);
    assert_eq!(requests[1]["context"]["previous_scores"], json!([0.64]));
    assert_eq!(requests[1]["context"]["analysis_depth"], "EXPERT_REVIEW");
}

#[tokio::test]
async fn unreachable_judgment_falls_back_to_local_rules() {
    let judgment = HttpJudgment::new("http://127.0.0.1:9", Duration::from_millis(500))
        .expect("client builds");
    let constitution = Arc::new(RuleConstitution::wildfire_v1());
    let controller = ValidationLoopController::new(
        constitution.clone(),
        Arc::new(DelegatedEvaluator::new(
            Arc::new(judgment),
            constitution.clone(),
            EvaluationConfig::default(),
            Duration::from_secs(1),
        )),
        LocalRuleEvaluator::new(constitution, EvaluationConfig::default()),
        vec![ValidationStage::new(
            AnalysisDepth::BasicScreening,
            Arc::new(NoEnhancement),
        )],
    );

    let report = controller
        .run_at(hillside_claim(), as_of(12))
        .await
        .expect("fallback completes");

    assert_eq!(report.history[0].evaluation_mode, EvaluationMode::Local);
    assert_eq!(report.history[0].total_rules, 47);
}
