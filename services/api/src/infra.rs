use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use claim_validator::config::ValidationSettings;
use claim_validator::error::AppError;
use claim_validator::workflows::claims::enhancement::{
    ReceiptQuery, ReceiptRecord, ReceiptSource, ReceiptSourceError,
};
use claim_validator::workflows::claims::{
    standard_stages, ClaimEvaluator, ClaimId, ClaimRecord, ClaimRepository, CsvReceiptSource,
    DelegatedEvaluator, EvaluationConfig, FieldCompletenessReprocessor, HttpJudgment,
    LocalRuleEvaluator, ReceiptEnhancer, ReprocessingEnhancer, RepositoryError,
    RuleConstitution, ValidationLoopController,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct ClaimStore {
    order: Vec<ClaimId>,
    records: HashMap<ClaimId, ClaimRecord>,
}

/// Process-local claim storage; listing follows submission order.
#[derive(Default, Clone)]
pub(crate) struct InMemoryClaimRepository {
    store: Arc<Mutex<ClaimStore>>,
}

impl InMemoryClaimRepository {
    fn lock(&self) -> Result<MutexGuard<'_, ClaimStore>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("claim store lock poisoned".to_string()))
    }
}

impl ClaimRepository for InMemoryClaimRepository {
    fn insert(&self, record: ClaimRecord) -> Result<ClaimRecord, RepositoryError> {
        let mut guard = self.lock()?;
        let id = record.packet.claim_id.clone();
        if guard.records.contains_key(&id) {
            return Err(RepositoryError::Conflict);
        }
        guard.order.push(id.clone());
        guard.records.insert(id, record.clone());
        Ok(record)
    }

    fn update(&self, record: ClaimRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        match guard.records.get_mut(&record.packet.claim_id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ClaimId) -> Result<Option<ClaimRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.records.get(id).cloned())
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<ClaimRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .order
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| guard.records.get(id).cloned())
            .collect())
    }
}

/// Used when no purchase history export is configured.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NoPurchaseHistory;

#[async_trait]
impl ReceiptSource for NoPurchaseHistory {
    async fn find(&self, _query: &ReceiptQuery) -> Result<Vec<ReceiptRecord>, ReceiptSourceError> {
        Ok(Vec::new())
    }
}

/// Builds the loop controller, using `receipts` when given and the configured source otherwise.
pub(crate) fn build_controller(
    settings: &ValidationSettings,
    receipts: Option<Arc<dyn ReceiptSource>>,
) -> Result<ValidationLoopController, AppError> {
    let constitution = Arc::new(RuleConstitution::wildfire_v1());
    let config = EvaluationConfig::default();
    let local = LocalRuleEvaluator::new(constitution.clone(), config.clone());

    let evaluator: Arc<dyn ClaimEvaluator> = match &settings.judgment {
        Some(judgment) => {
            info!(endpoint = %judgment.base_url, "claims scored by external judgment");
            let client = HttpJudgment::new(&judgment.base_url, judgment.timeout)?;
            Arc::new(DelegatedEvaluator::new(
                Arc::new(client),
                constitution.clone(),
                config,
                judgment.timeout,
            ))
        }
        None => Arc::new(local.clone()),
    };

    let source: Arc<dyn ReceiptSource> = match (receipts, &settings.receipts.csv_path) {
        (Some(source), _) => source,
        (None, Some(path)) => {
            let export = CsvReceiptSource::from_path(path)?;
            info!(path = %path.display(), rows = export.len(), "loaded purchase history export");
            Arc::new(export)
        }
        (None, None) => Arc::new(NoPurchaseHistory),
    };

    let receipt_stage = ReceiptEnhancer::new(source)
        .with_companies(settings.receipts.companies.clone())
        .with_timeout(settings.receipts.timeout);
    let reprocessing_stage =
        ReprocessingEnhancer::new(Arc::new(FieldCompletenessReprocessor));

    Ok(ValidationLoopController::new(
        constitution,
        evaluator,
        local,
        standard_stages(Arc::new(receipt_stage), Arc::new(reprocessing_stage)),
    )
    .with_target_score(settings.target_score))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Noon UTC on `date`, so day counts do not shift with the caller's time zone.
pub(crate) fn noon_utc(date: NaiveDate) -> DateTime<Utc> {
    match date.and_hms_opt(12, 0, 0) {
        Some(noon) => Utc.from_utc_datetime(&noon),
        None => Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim_validator::workflows::claims::ClaimPacket;

    fn packet(id: &str) -> ClaimPacket {
        serde_json::from_value(serde_json::json!({
            "claim_id": id,
            "policy_number": "WF-1",
            "claimant_name": "Riley Navarro",
            "incident_date": "2025-07-15",
            "property_address": "12 Pine Hollow Rd, Magalia, CA 95954",
        }))
        .expect("packet parses")
    }

    #[test]
    fn repository_lists_in_submission_order_and_rejects_duplicates() {
        let repository = InMemoryClaimRepository::default();
        for id in ["WF-3", "WF-1", "WF-2"] {
            repository
                .insert(ClaimRecord::submitted(packet(id)))
                .expect("insert");
        }

        assert!(matches!(
            repository.insert(ClaimRecord::submitted(packet("WF-1"))),
            Err(RepositoryError::Conflict)
        ));
        let ids: Vec<String> = repository
            .list(2, 1)
            .expect("list")
            .into_iter()
            .map(|record| record.packet.claim_id.to_string())
            .collect();
        assert_eq!(ids, vec!["WF-1", "WF-2"]);
        assert!(matches!(
            repository.update(ClaimRecord::submitted(packet("WF-9"))),
            Err(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn controller_follows_validation_settings() {
        let mut settings = ValidationSettings::default();
        settings.target_score = 0.7;

        let controller = build_controller(&settings, None).expect("controller builds");

        assert_eq!(controller.target_score(), 0.7);
        assert_eq!(controller.max_iterations(), 4);
        assert_eq!(controller.constitution().len(), 47);
    }

    #[test]
    fn missing_receipt_export_is_reported() {
        let mut settings = ValidationSettings::default();
        settings.receipts.csv_path = Some("/nonexistent/receipts.csv".into());

        let err = build_controller(&settings, None).expect_err("export missing");

        assert!(matches!(err, AppError::Receipts(_)));
    }

    #[test]
    fn dates_parse_to_noon_utc() {
        let date = parse_date("2025-07-25").expect("date parses");
        assert_eq!(noon_utc(date).to_rfc3339(), "2025-07-25T12:00:00+00:00");
        assert!(parse_date("07/25/2025").is_err());
    }
}
