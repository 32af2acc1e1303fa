use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Duration as Days, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::claims::constitution::RuleConstitution;
use crate::workflows::claims::domain::{ClaimId, ClaimPacket, Document, DocumentType, ExtractedData};
use crate::workflows::claims::enhancement::{
    ClaimEnhancer, FieldCompletenessReprocessor, ReceiptEnhancer, ReceiptQuery, ReceiptRecord,
    ReceiptSource, ReceiptSourceError, ReprocessingEnhancer,
};
use crate::workflows::claims::evaluation::{
    DelegatedEvaluator, EvaluationConfig, LocalRuleEvaluator,
};
use crate::workflows::claims::judgment::{
    ClaimSummary, ExternalJudgment, IterationContext, JudgmentAssessment, JudgmentError,
};
use crate::workflows::claims::repository::{ClaimRecord, ClaimRepository, RepositoryError};
use crate::workflows::claims::service::ClaimValidationService;
use crate::workflows::claims::validation_loop::{standard_stages, ValidationLoopController};

pub(super) const INCIDENT_DATE: &str = "2025-07-15";
pub(super) const PROPERTY_ADDRESS: &str = "1824 Ridgecrest Dr, Paradise, CA 95969";

pub(super) fn incident() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 15).expect("valid date")
}

/// Noon UTC `days` after the incident.
pub(super) fn days_after_incident(days: i64) -> DateTime<Utc> {
    let noon = incident().and_hms_opt(12, 0, 0).expect("valid time");
    Utc.from_utc_datetime(&noon) + Days::days(days)
}

pub(super) fn date_after_incident(days: i64) -> String {
    (incident() + Days::days(days)).format("%Y-%m-%d").to_string()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(super) fn photo(id: &str, description: &str, confidence: f64) -> Document {
    Document::new(
        id,
        format!("{id}.jpg"),
        DocumentType::Photo,
        ExtractedData::new().with("description", description),
        confidence,
    )
}

pub(super) fn dated_photo(id: &str, description: &str) -> Document {
    let mut document = photo(id, description, 0.9);
    document.extracted_data.insert("quality", "clear");
    document
        .extracted_data
        .insert("taken_at", date_after_incident(1));
    document
}

pub(super) fn receipt(
    id: &str,
    merchant: &str,
    amount: impl Into<Value>,
    days_after: i64,
    items: &[&str],
    confidence: f64,
) -> Document {
    Document::new(
        id,
        format!("{id}.pdf"),
        DocumentType::Receipt,
        ExtractedData::new()
            .with("merchant", merchant)
            .with("total_amount", amount)
            .with("date", date_after_incident(days_after))
            .with("items", strings(items)),
        confidence,
    )
}

pub(super) fn policy_document() -> Document {
    Document::new(
        "policy-1",
        "policy.pdf",
        DocumentType::Policy,
        ExtractedData::new()
            .with("policy_number", "WF-2025-118840")
            .with("insured_name", "Dana Whitfield")
            .with("property_address", PROPERTY_ADDRESS),
        0.92,
    )
}

pub(super) fn packet(claim_id: &str, documents: Vec<Document>) -> ClaimPacket {
    ClaimPacket {
        claim_id: ClaimId::from(claim_id),
        policy_number: "WF-2025-118840".to_string(),
        claimant_name: "Dana Whitfield".to_string(),
        incident_date: INCIDENT_DATE.to_string(),
        property_address: PROPERTY_ADDRESS.to_string(),
        estimated_damage: Some(150_000.0),
        documents,
        created_at: days_after_incident(1),
    }
}

/// $150,000 claim backed only by the policy declaration page.
pub(super) fn sparse_packet() -> ClaimPacket {
    packet("WF-SPARSE", vec![policy_document()])
}

/// Three damage photos and two receipts totalling $120,000.
pub(super) fn documented_packet() -> ClaimPacket {
    packet(
        "WF-DOCUMENTED",
        vec![
            policy_document(),
            photo("photo-1", "Fire damage to the living room", 0.88),
            photo("photo-2", "Burned exterior wall and charred siding", 0.9),
            photo("photo-3", "Fire damage along the garage roofline", 0.86),
            receipt(
                "receipt-1",
                "Golden State Builders",
                "$85,000.00",
                5,
                &["Debris removal", "Roof framing"],
                0.9,
            ),
            receipt(
                "receipt-2",
                "Sierra Home Furnishings",
                35_000.0,
                8,
                &["Sofa", "Dining table"],
                0.85,
            ),
        ],
    )
}

/// A packet that satisfies every local rule when evaluated 20 days after the fire.
pub(super) fn complete_packet() -> ClaimPacket {
    let policy = Document::new(
        "policy-1",
        "policy.pdf",
        DocumentType::Policy,
        ExtractedData::new()
            .with("policy_number", "WF-2025-118840")
            .with("insured_name", "Dana Whitfield")
            .with("property_address", PROPERTY_ADDRESS)
            .with("coverage_limit", 300_000.0)
            .with("deductible", 2_500.0)
            .with("effective_date", "2025-01-01")
            .with("expiration_date", "2026-01-01")
            .with("premium_status", "current")
            .with("ownership_proof", "Grant deed recorded 2012"),
        0.95,
    );
    let report = Document::new(
        "report-1",
        "incident_report.pdf",
        DocumentType::DamageReport,
        ExtractedData::new()
            .with("agency", "Butte County Fire Department")
            .with(
                "summary",
                "Incident 2025-CABTU-014233: structure inside the Ridge Fire perimeter at 1824 Ridgecrest Dr; evacuation order issued on July 15",
            ),
        0.93,
    );
    let estimate = Document::new(
        "estimate-1",
        "estimate.pdf",
        DocumentType::Other,
        ExtractedData::new()
            .with("document", "Contractor estimate")
            .with("contractor", "Ridgeline Builders")
            .with("estimate_date", date_after_incident(12))
            .with("estimated_cost", 148_500.0),
        0.88,
    );

    packet(
        "WF-COMPLETE",
        vec![
            policy,
            dated_photo("photo-1", "Severe fire damage, total loss of kitchen"),
            dated_photo(
                "photo-2",
                "Severe heat damage: charred beams and melted fixtures with smoke staining",
            ),
            dated_photo("photo-3", "Ash and debris covering the garage"),
            dated_photo("photo-4", "Before photo of the home taken in spring"),
            report,
            estimate,
            receipt(
                "receipt-1",
                "Home Depot",
                1_250.0,
                2,
                &["Tarps", "N95 masks", "Fire extinguisher"],
                0.9,
            ),
            receipt("receipt-2", "Paradise Inn", 1_400.0, 3, &["Lodging - 7 nights"], 0.9),
            receipt(
                "receipt-3",
                "Summit Restoration",
                80_000.0,
                10,
                &["Structural framing", "Roof replacement"],
                0.9,
            ),
        ],
    )
}

pub(super) fn constitution() -> Arc<RuleConstitution> {
    Arc::new(RuleConstitution::wildfire_v1())
}

pub(super) fn local_evaluator() -> LocalRuleEvaluator {
    LocalRuleEvaluator::new(constitution(), EvaluationConfig::default())
}

pub(super) fn record(merchant: &str, amount: f64, days_after: i64, items: &[&str]) -> ReceiptRecord {
    ReceiptRecord {
        merchant: merchant.to_string(),
        total_amount: amount,
        date: incident() + Days::days(days_after),
        items: strings(items),
        payment_method: None,
    }
}

/// Receipt source answering from fixed per-company purchase lists.
#[derive(Default)]
pub(super) struct StaticReceiptSource {
    records: HashMap<String, Vec<ReceiptRecord>>,
    failing: Vec<String>,
    delays: HashMap<String, Duration>,
    queries: Mutex<Vec<ReceiptQuery>>,
}

impl StaticReceiptSource {
    /// Home Depot, Amazon, and Walmart purchases in the week after the fire.
    pub(super) fn recovery_purchases() -> Self {
        let mut home_depot = record(
            "Home Depot",
            4_250.0,
            3,
            &["Tarps", "Respirator masks", "Shop vacuum"],
        );
        home_depot.payment_method = Some("Visa ending in 4421".to_string());

        Self::default()
            .with("home_depot", home_depot)
            .with(
                "amazon",
                record("Amazon", 1_180.50, 6, &["Air purifier", "Smoke detectors"]),
            )
            .with(
                "walmart",
                record("Walmart", 640.25, 4, &["Clothing", "Toiletries"]),
            )
    }

    pub(super) fn with(mut self, company: &str, record: ReceiptRecord) -> Self {
        self.records
            .entry(company.to_string())
            .or_default()
            .push(record);
        self
    }

    pub(super) fn failing_for(mut self, company: &str) -> Self {
        self.failing.push(company.to_string());
        self
    }

    pub(super) fn delayed_for(mut self, company: &str, delay: Duration) -> Self {
        self.delays.insert(company.to_string(), delay);
        self
    }

    pub(super) fn queries(&self) -> Vec<ReceiptQuery> {
        self.queries.lock().expect("query mutex poisoned").clone()
    }
}

#[async_trait]
impl ReceiptSource for StaticReceiptSource {
    async fn find(&self, query: &ReceiptQuery) -> Result<Vec<ReceiptRecord>, ReceiptSourceError> {
        self.queries
            .lock()
            .expect("query mutex poisoned")
            .push(query.clone());

        if let Some(delay) = self.delays.get(&query.company) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&query.company) {
            return Err(ReceiptSourceError::Unavailable(format!(
                "{} API offline",
                query.company
            )));
        }
        Ok(self.records.get(&query.company).cloned().unwrap_or_default())
    }
}

pub(super) fn assessment(score: f64, approved: bool) -> JudgmentAssessment {
    JudgmentAssessment {
        overall_score: score,
        confidence: 0.82,
        approved,
        rationale: "Photos and receipts are consistent with wildfire loss".to_string(),
        missing_documents: Vec::new(),
        fraud_indicators: Vec::new(),
    }
}

/// Judgment source replaying one assessment per call; the last one repeats.
pub(super) struct ScriptedJudgment {
    assessments: Vec<JudgmentAssessment>,
    calls: Mutex<Vec<IterationContext>>,
}

impl ScriptedJudgment {
    pub(super) fn new(assessments: Vec<JudgmentAssessment>) -> Self {
        Self {
            assessments,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn scores(scores: &[f64]) -> Self {
        Self::new(scores.iter().map(|score| assessment(*score, true)).collect())
    }

    pub(super) fn calls(&self) -> Vec<IterationContext> {
        self.calls.lock().expect("call mutex poisoned").clone()
    }
}

#[async_trait]
impl ExternalJudgment for ScriptedJudgment {
    async fn assess(
        &self,
        _summary: &ClaimSummary,
        context: &IterationContext,
    ) -> Result<JudgmentAssessment, JudgmentError> {
        let mut calls = self.calls.lock().expect("call mutex poisoned");
        let index = calls.len().min(self.assessments.len().saturating_sub(1));
        calls.push(context.clone());
        self.assessments
            .get(index)
            .cloned()
            .ok_or_else(|| JudgmentError::Unavailable("no scripted assessment".to_string()))
    }
}

pub(super) struct FailingJudgment;

#[async_trait]
impl ExternalJudgment for FailingJudgment {
    async fn assess(
        &self,
        _summary: &ClaimSummary,
        _context: &IterationContext,
    ) -> Result<JudgmentAssessment, JudgmentError> {
        Err(JudgmentError::Unavailable("model endpoint offline".to_string()))
    }
}

pub(super) struct StalledJudgment;

#[async_trait]
impl ExternalJudgment for StalledJudgment {
    async fn assess(
        &self,
        _summary: &ClaimSummary,
        _context: &IterationContext,
    ) -> Result<JudgmentAssessment, JudgmentError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(assessment(0.9, true))
    }
}

pub(super) fn delegated_evaluator(judgment: Arc<dyn ExternalJudgment>) -> DelegatedEvaluator {
    DelegatedEvaluator::new(
        judgment,
        constitution(),
        EvaluationConfig::default(),
        Duration::from_secs(2),
    )
}

/// Counts invocations and returns the packet untouched.
#[derive(Default)]
pub(super) struct CountingEnhancer {
    calls: AtomicUsize,
}

impl CountingEnhancer {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClaimEnhancer for CountingEnhancer {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn enhance(&self, packet: ClaimPacket) -> ClaimPacket {
        self.calls.fetch_add(1, Ordering::SeqCst);
        packet
    }
}

/// Rewrites the claimant name, which enhancement must never do.
pub(super) struct RenamingEnhancer;

#[async_trait]
impl ClaimEnhancer for RenamingEnhancer {
    fn name(&self) -> &'static str {
        "renaming"
    }

    async fn enhance(&self, mut packet: ClaimPacket) -> ClaimPacket {
        packet.claimant_name = "Someone Else".to_string();
        packet
    }
}

pub(super) fn receipt_stage(source: Arc<StaticReceiptSource>) -> Arc<ReceiptEnhancer> {
    Arc::new(ReceiptEnhancer::new(source))
}

pub(super) fn reprocessing_stage() -> Arc<ReprocessingEnhancer> {
    Arc::new(ReprocessingEnhancer::new(Arc::new(FieldCompletenessReprocessor)))
}

pub(super) fn local_controller(source: Arc<StaticReceiptSource>) -> ValidationLoopController {
    let local = local_evaluator();
    ValidationLoopController::new(
        constitution(),
        Arc::new(local.clone()),
        local,
        standard_stages(receipt_stage(source), reprocessing_stage()),
    )
}

pub(super) fn delegated_controller(judgment: Arc<dyn ExternalJudgment>) -> ValidationLoopController {
    ValidationLoopController::new(
        constitution(),
        Arc::new(delegated_evaluator(judgment)),
        local_evaluator(),
        standard_stages(
            receipt_stage(Arc::new(StaticReceiptSource::default())),
            reprocessing_stage(),
        ),
    )
}

pub(super) fn build_service() -> (ClaimValidationService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let controller = Arc::new(local_controller(Arc::new(
        StaticReceiptSource::recovery_purchases(),
    )));
    let service = ClaimValidationService::new(repository.clone(), controller);
    (service, repository)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<Vec<ClaimRecord>>>,
}

impl ClaimRepository for MemoryRepository {
    fn insert(&self, record: ClaimRecord) -> Result<ClaimRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
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
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let existing = guard
            .iter_mut()
            .find(|existing| existing.packet.claim_id == record.packet.claim_id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = record;
        Ok(())
    }

    fn fetch(&self, id: &ClaimId) -> Result<Option<ClaimRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .find(|record| &record.packet.claim_id == id)
            .cloned())
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<ClaimRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().skip(offset).take(limit).cloned().collect())
    }
}

pub(super) struct ConflictRepository;

impl ClaimRepository for ConflictRepository {
    fn insert(&self, _record: ClaimRecord) -> Result<ClaimRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update(&self, _record: ClaimRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn fetch(&self, _id: &ClaimId) -> Result<Option<ClaimRecord>, RepositoryError> {
        Ok(None)
    }

    fn list(&self, _limit: usize, _offset: usize) -> Result<Vec<ClaimRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl ClaimRepository for UnavailableRepository {
    fn insert(&self, _record: ClaimRecord) -> Result<ClaimRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: ClaimRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ClaimId) -> Result<Option<ClaimRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _limit: usize, _offset: usize) -> Result<Vec<ClaimRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn service_with<R>(repository: R) -> Arc<ClaimValidationService<R>>
where
    R: ClaimRepository + 'static,
{
    Arc::new(ClaimValidationService::new(
        Arc::new(repository),
        Arc::new(local_controller(Arc::new(StaticReceiptSource::default()))),
    ))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
