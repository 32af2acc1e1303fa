//! External holistic judgment of a claim.
//!
//! The judgment source receives a condensed [`ClaimSummary`] rather than raw
//! documents and answers with a single [`JudgmentAssessment`]; the delegated
//! evaluator spreads that assessment across the constitution.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::domain::{ClaimId, ClaimPacket, DocumentType, ExtractedData};
use super::evaluation::{AnalysisDepth, EvaluationContext};

const EVALUATE_PATH: &str = "evaluate-claim";

#[derive(Debug, thiserror::Error)]
pub enum JudgmentError {
    #[error("judgment source unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("judgment source answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse judgment response: {0}")]
    Parse(String),
}

/// Holistic verdict returned by a judgment source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentAssessment {
    pub overall_score: f64,
    #[serde(default = "default_assessment_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub approved: bool,
    #[serde(default, alias = "detailed_rationale")]
    pub rationale: String,
    #[serde(default)]
    pub missing_documents: Vec<String>,
    #[serde(default)]
    pub fraud_indicators: Vec<String>,
}

fn default_assessment_confidence() -> f64 {
    0.8
}

/// Per-document slice of the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub document_type: DocumentType,
    pub confidence: f64,
    pub extracted_data: ExtractedData,
}

/// Condensed claim view sent to the judgment source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimSummary {
    pub claim_id: ClaimId,
    pub claimant_name: String,
    pub policy_number: String,
    pub incident_date: String,
    pub property_address: String,
    pub estimated_damage: Option<f64>,
    pub days_since_incident: Option<i64>,
    pub document_count: usize,
    pub documents: Vec<DocumentSummary>,
    pub receipt_total: f64,
    pub receipt_coverage: Option<f64>,
}

impl ClaimSummary {
    pub fn from_packet(packet: &ClaimPacket, as_of: DateTime<Utc>) -> Self {
        let receipts = packet.documented_receipt_total();
        Self {
            claim_id: packet.claim_id.clone(),
            claimant_name: packet.claimant_name.clone(),
            policy_number: packet.policy_number.clone(),
            incident_date: packet.incident_date.clone(),
            property_address: packet.property_address.clone(),
            estimated_damage: packet.estimated_damage,
            days_since_incident: packet.days_since_incident(as_of),
            document_count: packet.documents.len(),
            documents: packet
                .documents
                .iter()
                .map(|document| DocumentSummary {
                    filename: document.filename.clone(),
                    document_type: document.document_type,
                    confidence: document.confidence_score,
                    extracted_data: document.extracted_data.clone(),
                })
                .collect(),
            receipt_total: receipts.amount,
            receipt_coverage: packet
                .estimated_damage
                .and_then(|amount| receipts.coverage_of(amount)),
        }
    }
}

/// Where the loop is when the judgment is requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationContext {
    pub iteration: usize,
    pub analysis_depth: AnalysisDepth,
    pub previous_scores: Vec<f64>,
}

impl From<&EvaluationContext<'_>> for IterationContext {
    fn from(context: &EvaluationContext<'_>) -> Self {
        Self {
            iteration: context.iteration,
            analysis_depth: context.depth,
            previous_scores: context.previous_scores.to_vec(),
        }
    }
}

#[async_trait]
pub trait ExternalJudgment: Send + Sync {
    async fn assess(
        &self,
        summary: &ClaimSummary,
        context: &IterationContext,
    ) -> Result<JudgmentAssessment, JudgmentError>;
}

#[derive(Serialize)]
struct JudgmentRequest<'a> {
    claim: &'a ClaimSummary,
    context: &'a IterationContext,
}

/// Judgment source reached over HTTP at `{base_url}/evaluate-claim`.
pub struct HttpJudgment {
    client: Client,
    endpoint: String,
}

impl HttpJudgment {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, JudgmentError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/{}", base_url.trim_end_matches('/'), EVALUATE_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExternalJudgment for HttpJudgment {
    async fn assess(
        &self,
        summary: &ClaimSummary,
        context: &IterationContext,
    ) -> Result<JudgmentAssessment, JudgmentError> {
        tracing::debug!(
            claim_id = %summary.claim_id,
            iteration = context.iteration,
            depth = context.analysis_depth.label(),
            endpoint = %self.endpoint,
            "requesting claim judgment"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&JudgmentRequest {
                claim: summary,
                context,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(JudgmentError::Status { status, body });
        }

        response
            .json::<JudgmentAssessment>()
            .await
            .map_err(|err| JudgmentError::Parse(err.to_string()))
    }
}
