use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::super::domain::{
    is_recovery_purchase, ClaimId, ClaimPacket, Document, DocumentType, ExtractedData,
};
use super::ClaimEnhancer;

pub const DEFAULT_RECEIPT_COMPANIES: [&str; 3] = ["home_depot", "amazon", "walmart"];

const LOOKBACK_DAYS: i64 = 30;
const LOOKAHEAD_DAYS: i64 = 60;
const MAX_INDIVIDUAL_RECEIPTS: usize = 3;
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);
const RECEIPT_CONFIDENCE: f64 = 0.95;
const ROLLUP_CONFIDENCE: f64 = 0.98;

/// Inclusive date range for purchase lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn around(incident: NaiveDate, days_before: i64, days_after: i64) -> Self {
        Self {
            start: incident - Days::days(days_before),
            end: incident + Days::days(days_after),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptQuery {
    pub company: String,
    pub claimant_name: String,
    pub property_address: String,
    pub window: DateWindow,
}

/// A purchase as reported by a receipt source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub merchant: String,
    pub total_amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiptSourceError {
    #[error("receipt source unavailable: {0}")]
    Unavailable(String),
    #[error("receipt source rejected query for {company}: {reason}")]
    Rejected { company: String, reason: String },
}

/// Purchase-history lookup for one merchant category at a time.
#[async_trait]
pub trait ReceiptSource: Send + Sync {
    async fn find(&self, query: &ReceiptQuery) -> Result<Vec<ReceiptRecord>, ReceiptSourceError>;
}

struct FetchedReceipt {
    company_index: usize,
    company: String,
    record: ReceiptRecord,
}

/// Adds purchase history around the incident date as receipt documents.
///
/// Each company is queried concurrently with its own deadline. A failed or slow
/// company only loses its own receipts. Which receipts are kept is decided by a
/// stable sort, never by arrival order.
pub struct ReceiptEnhancer {
    source: Arc<dyn ReceiptSource>,
    companies: Vec<String>,
    timeout: Duration,
}

impl ReceiptEnhancer {
    pub fn new(source: Arc<dyn ReceiptSource>) -> Self {
        Self {
            source,
            companies: DEFAULT_RECEIPT_COMPANIES
                .iter()
                .map(|company| company.to_string())
                .collect(),
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_companies(mut self, companies: Vec<String>) -> Self {
        self.companies = companies;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn collect(&self, packet: &ClaimPacket, window: DateWindow) -> Vec<FetchedReceipt> {
        let mut queries = JoinSet::new();
        for (company_index, company) in self.companies.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let timeout = self.timeout;
            let query = ReceiptQuery {
                company: company.clone(),
                claimant_name: packet.claimant_name.clone(),
                property_address: packet.property_address.clone(),
                window,
            };
            queries.spawn(async move {
                let outcome = tokio::time::timeout(timeout, source.find(&query)).await;
                (company_index, query.company, outcome)
            });
        }

        let mut fetched = Vec::new();
        while let Some(joined) = queries.join_next().await {
            match joined {
                Ok((company_index, company, Ok(Ok(records)))) => {
                    debug!(company = %company, receipts = records.len(), "receipt query returned");
                    fetched.extend(records.into_iter().map(|record| FetchedReceipt {
                        company_index,
                        company: company.clone(),
                        record,
                    }));
                }
                Ok((_, company, Ok(Err(err)))) => {
                    warn!(company = %company, error = %err, "receipt query failed");
                }
                Ok((_, company, Err(_))) => {
                    warn!(company = %company, timeout = ?self.timeout, "receipt query timed out");
                }
                Err(err) => warn!(error = %err, "receipt query task did not complete"),
            }
        }
        fetched
    }
}

#[async_trait]
impl ClaimEnhancer for ReceiptEnhancer {
    fn name(&self) -> &'static str {
        "receipt_enhancement"
    }

    async fn enhance(&self, mut packet: ClaimPacket) -> ClaimPacket {
        let Some(incident) = packet.incident_on() else {
            warn!(
                claim_id = %packet.claim_id,
                incident_date = %packet.incident_date,
                "incident date unreadable, skipping receipt lookup"
            );
            return packet;
        };
        let window = DateWindow::around(incident, LOOKBACK_DAYS, LOOKAHEAD_DAYS);

        let mut fetched = self.collect(&packet, window).await;
        fetched.retain(|receipt| {
            let record = &receipt.record;
            record.total_amount.is_finite()
                && record.total_amount > 0.0
                && window.contains(record.date)
                && is_recovery_purchase(&record.merchant, &record.items)
        });
        fetched.sort_by(|left, right| {
            left.company_index
                .cmp(&right.company_index)
                .then_with(|| left.record.date.cmp(&right.record.date))
                .then_with(|| left.record.merchant.cmp(&right.record.merchant))
                .then_with(|| left.record.total_amount.total_cmp(&right.record.total_amount))
        });
        let mut seen = HashSet::new();
        fetched.retain(|receipt| {
            seen.insert((
                receipt.record.merchant.to_lowercase(),
                receipt.record.date,
                cents(receipt.record.total_amount),
            ))
        });

        if fetched.is_empty() {
            info!(claim_id = %packet.claim_id, "no purchase history found for claim");
            return packet;
        }

        let rollup = rollup_document(&packet.claim_id, &fetched, window);
        let total = rollup.extracted_data.get_number("total_amount").unwrap_or_default();

        let mut ranked: Vec<(usize, &FetchedReceipt)> = fetched.iter().enumerate().collect();
        ranked.sort_by(|(_, left), (_, right)| {
            right
                .record
                .total_amount
                .total_cmp(&left.record.total_amount)
                .then_with(|| left.record.date.cmp(&right.record.date))
                .then_with(|| left.record.merchant.cmp(&right.record.merchant))
                .then_with(|| left.company_index.cmp(&right.company_index))
        });

        packet.documents.push(rollup);
        packet.documents.extend(
            ranked
                .into_iter()
                .take(MAX_INDIVIDUAL_RECEIPTS)
                .map(|(position, receipt)| receipt_document(position, receipt)),
        );

        info!(
            claim_id = %packet.claim_id,
            receipts = fetched.len(),
            total_amount = total,
            documents = packet.documents.len(),
            "claim enhanced with purchase history"
        );
        packet
    }
}

fn cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn round_cents(amount: f64) -> f64 {
    cents(amount) as f64 / 100.0
}

fn receipt_document(position: usize, receipt: &FetchedReceipt) -> Document {
    let record = &receipt.record;
    let date = record.date.format("%Y-%m-%d").to_string();
    let mut data = ExtractedData::new()
        .with("merchant", record.merchant.clone())
        .with("total_amount", round_cents(record.total_amount))
        .with("date", date.clone())
        .with("items", record.items.clone())
        .with("source_company", receipt.company.clone())
        .with("auto_fetched", true);
    if let Some(method) = &record.payment_method {
        data.insert("payment_method", method.clone());
    }

    let mut document = Document::new(
        format!("receipt-{}-{}", receipt.company, position + 1),
        format!("{}_receipt_{date}.json", receipt.company),
        DocumentType::Receipt,
        data,
        RECEIPT_CONFIDENCE,
    );
    document.file_size = serialized_len(&document.extracted_data);
    document
}

fn rollup_document(claim_id: &ClaimId, fetched: &[FetchedReceipt], window: DateWindow) -> Document {
    let total: f64 = fetched.iter().map(|receipt| receipt.record.total_amount).sum();
    let merchants: BTreeSet<&str> = fetched
        .iter()
        .map(|receipt| receipt.record.merchant.as_str())
        .collect();
    let receipts: Vec<serde_json::Value> = fetched
        .iter()
        .map(|receipt| {
            json!({
                "merchant": receipt.record.merchant,
                "amount": round_cents(receipt.record.total_amount),
                "date": receipt.record.date.format("%Y-%m-%d").to_string(),
            })
        })
        .collect();

    let data = ExtractedData::new()
        .with("merged_receipts", true)
        .with("total_receipts", fetched.len())
        .with("total_amount", round_cents(total))
        .with(
            "merchants",
            merchants.into_iter().map(str::to_string).collect::<Vec<_>>(),
        )
        .with("window_start", window.start.format("%Y-%m-%d").to_string())
        .with("window_end", window.end.format("%Y-%m-%d").to_string())
        .with("receipts", receipts);

    let mut document = Document::new(
        format!("receipt-rollup-{claim_id}"),
        format!("purchase_history_{claim_id}.json"),
        DocumentType::Receipt,
        data,
        ROLLUP_CONFIDENCE,
    );
    document.file_size = serialized_len(&document.extracted_data);
    document
}

fn serialized_len(data: &ExtractedData) -> u64 {
    serde_json::to_vec(data)
        .map(|bytes| bytes.len() as u64)
        .unwrap_or_default()
}
