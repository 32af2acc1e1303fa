use crate::infra::{build_controller, noon_utc};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use clap::Args;
use claim_validator::config::{AppConfig, ValidationSettings};
use claim_validator::error::AppError;
use claim_validator::workflows::claims::enhancement::{
    ReceiptQuery, ReceiptRecord, ReceiptSource, ReceiptSourceError,
};
use claim_validator::workflows::claims::{
    ClaimId, ClaimPacket, ClaimServiceError, Document, DocumentType, EvaluationMode,
    ExtractedData, LoopOutcome, TrustBadge, ValidationLoopReport,
};
use std::path::PathBuf;
use std::sync::Arc;

const SAMPLE_INCIDENT_DATE: &str = "2025-07-15";

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Claim packet JSON file
    pub(crate) packet: PathBuf,
    /// Reference date for elapsed-time rules (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Print the full report as JSON instead of the iteration table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date (YYYY-MM-DD). Defaults to ten days after the sample fire.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Run without the sample purchase history
    #[arg(long)]
    pub(crate) skip_receipts: bool,
    /// Print the full report as JSON instead of the iteration table
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let raw = std::fs::read_to_string(&args.packet)?;
    let packet: ClaimPacket = serde_json::from_str(&raw)?;

    let controller = build_controller(&config.validation, None)?;
    let report = match args.as_of {
        Some(date) => controller.run_at(packet, noon_utc(date)).await,
        None => controller.run(packet).await,
    }
    .map_err(ClaimServiceError::from)?;

    print_report(&report, args.json)
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let report = demo_report(&args).await?;
    print_report(&report, args.json)
}

async fn demo_report(args: &DemoArgs) -> Result<ValidationLoopReport, AppError> {
    let incident = sample_incident();
    let receipts: Arc<dyn ReceiptSource> = if args.skip_receipts {
        Arc::new(crate::infra::NoPurchaseHistory)
    } else {
        Arc::new(SamplePurchaseHistory { incident })
    };
    let controller = build_controller(&ValidationSettings::default(), Some(receipts))?;
    let as_of = args
        .as_of
        .unwrap_or_else(|| incident + Duration::days(10));

    let report = controller
        .run_at(sample_claim(), noon_utc(as_of))
        .await
        .map_err(ClaimServiceError::from)?;
    Ok(report)
}

fn print_report(report: &ValidationLoopReport, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_report(report));
    }
    Ok(())
}

pub(crate) fn render_report(report: &ValidationLoopReport) -> String {
    let mut out = String::new();
    let outcome = match report.outcome {
        LoopOutcome::TargetMet => "target met",
        LoopOutcome::BudgetExhausted => "budget exhausted",
    };
    out.push_str(&format!(
        "Claim {}: {} after {} iteration(s)\n",
        report.claim_id, outcome, report.iterations_completed
    ));

    for record in &report.history {
        let mode = match record.evaluation_mode {
            EvaluationMode::Delegated => "delegated",
            EvaluationMode::Local => "local",
        };
        out.push_str(&format!(
            "  #{} {:<24} {:<9} score {:>5.1}%  rules {:>2}/{}  documents {:>2}  ({:+.1}%)\n",
            record.iteration,
            record.analysis_depth.label(),
            mode,
            record.score * 100.0,
            record.rules_passed,
            record.total_rules,
            record.documents_processed,
            record.improvement * 100.0,
        ));
    }

    let validation = &report.final_validation;
    out.push_str(&format!(
        "Final score {:.1}% | approved: {} | trust: {} | total improvement {:+.1}%\n",
        validation.overall_score * 100.0,
        if validation.approved { "yes" } else { "no" },
        TrustBadge::for_score(validation.overall_score).label(),
        report.total_improvement * 100.0,
    ));
    if !validation.missing_documents.is_empty() {
        out.push_str(&format!(
            "Missing documents: {}\n",
            validation.missing_documents.join("; ")
        ));
    }
    if !validation.fraud_indicators.is_empty() {
        out.push_str(&format!(
            "Fraud indicators: {}\n",
            validation.fraud_indicators.join("; ")
        ));
    }
    out
}

fn sample_incident() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 15).unwrap_or(NaiveDate::MIN)
}

fn sample_claim() -> ClaimPacket {
    let incident = sample_incident();
    let day = |offset: i64| (incident + Duration::days(offset)).format("%Y-%m-%d").to_string();

    ClaimPacket {
        claim_id: ClaimId::from("WF-DEMO-0042"),
        policy_number: "WF-2025-204417".to_string(),
        claimant_name: "Riley Navarro".to_string(),
        incident_date: SAMPLE_INCIDENT_DATE.to_string(),
        property_address: "12 Pine Hollow Rd, Magalia, CA 95954".to_string(),
        estimated_damage: Some(128_000.0),
        documents: vec![
            Document::new(
                "policy",
                "declarations.pdf",
                DocumentType::Policy,
                ExtractedData::new()
                    .with("policy_number", "WF-2025-204417")
                    .with("insured_name", "Riley Navarro"),
                0.91,
            ),
            Document::new(
                "photo-kitchen",
                "kitchen.jpg",
                DocumentType::Photo,
                ExtractedData::new().with("description", "Fire damage to kitchen cabinets"),
                0.89,
            ),
            Document::new(
                "photo-roof",
                "roof.jpg",
                DocumentType::Photo,
                ExtractedData::new().with("description", "Burned roof decking over the garage"),
                0.72,
            ),
            Document::new(
                "receipt-debris",
                "debris_removal.pdf",
                DocumentType::Receipt,
                ExtractedData::new()
                    .with("merchant", "Foothill Hauling")
                    .with("total_amount", 6_800.0)
                    .with("date", day(6))
                    .with("items", vec!["Debris removal".to_string()]),
                0.88,
            ),
        ],
        created_at: noon_utc(incident + Duration::days(2)),
    }
}

/// Recovery purchases for the sample claimant.
struct SamplePurchaseHistory {
    incident: NaiveDate,
}

#[async_trait]
impl ReceiptSource for SamplePurchaseHistory {
    async fn find(&self, query: &ReceiptQuery) -> Result<Vec<ReceiptRecord>, ReceiptSourceError> {
        let purchase = |merchant: &str, amount: f64, offset: i64, items: &[&str]| ReceiptRecord {
            merchant: merchant.to_string(),
            total_amount: amount,
            date: self.incident + Duration::days(offset),
            items: items.iter().map(|item| item.to_string()).collect(),
            payment_method: Some("Visa ending in 7310".to_string()),
        };

        let records = match query.company.as_str() {
            "home_depot" => vec![purchase(
                "Home Depot",
                3_420.0,
                2,
                &["Tarps", "Respirator masks", "Plywood"],
            )],
            "amazon" => vec![purchase("Amazon", 940.0, 4, &["Air purifier"])],
            "walmart" => vec![purchase("Walmart", 515.75, 3, &["Clothing", "Toiletries"])],
            _ => Vec::new(),
        };
        Ok(records)
    }
}
