use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::super::domain::{ClaimPacket, Document};
use super::ClaimEnhancer;

const DEFAULT_QUALITY_THRESHOLD: f64 = 0.8;
const DEFAULT_REPROCESS_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ReprocessError {
    #[error("document processor unavailable: {0}")]
    Unavailable(String),
    #[error("document {document_id} could not be re-extracted: {reason}")]
    Extraction { document_id: String, reason: String },
}

/// Re-extraction of a single document's fields.
#[async_trait]
pub trait DocumentReprocessor: Send + Sync {
    async fn reprocess(&self, document: &Document) -> Result<Document, ReprocessError>;
}

/// Scores a document by how many of its extracted fields carry a value.
///
/// Documents flagged with an `error` field score 0.1 and empty extractions
/// score 0.5.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldCompletenessReprocessor;

impl FieldCompletenessReprocessor {
    pub fn confidence_for(document: &Document) -> f64 {
        let data = &document.extracted_data;
        if data.contains_key("error") {
            return 0.1;
        }
        if data.is_empty() {
            return 0.5;
        }
        let filled = data.iter().filter(|(_, value)| has_value(value)).count();
        filled as f64 / data.len() as f64
    }
}

fn has_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(values) => !values.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

#[async_trait]
impl DocumentReprocessor for FieldCompletenessReprocessor {
    async fn reprocess(&self, document: &Document) -> Result<Document, ReprocessError> {
        let mut refreshed = document.clone();
        refreshed.confidence_score = Self::confidence_for(document);
        Ok(refreshed)
    }
}

/// Re-extracts low-confidence documents, keeping only strict improvements.
pub struct ReprocessingEnhancer {
    reprocessor: Arc<dyn DocumentReprocessor>,
    quality_threshold: f64,
    timeout: Duration,
}

impl ReprocessingEnhancer {
    pub fn new(reprocessor: Arc<dyn DocumentReprocessor>) -> Self {
        Self {
            reprocessor,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            timeout: DEFAULT_REPROCESS_TIMEOUT,
        }
    }

    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ClaimEnhancer for ReprocessingEnhancer {
    fn name(&self) -> &'static str {
        "document_reprocessing"
    }

    async fn enhance(&self, mut packet: ClaimPacket) -> ClaimPacket {
        let mut attempted = 0;
        let mut improved = 0;

        for document in packet.documents.iter_mut() {
            if document.confidence_score >= self.quality_threshold {
                continue;
            }
            attempted += 1;

            let outcome =
                tokio::time::timeout(self.timeout, self.reprocessor.reprocess(document)).await;
            match outcome {
                Ok(Ok(candidate))
                    if (0.0..=1.0).contains(&candidate.confidence_score)
                        && candidate.confidence_score > document.confidence_score =>
                {
                    debug!(
                        document_id = %document.id,
                        before = document.confidence_score,
                        after = candidate.confidence_score,
                        "document re-extracted with higher confidence"
                    );
                    document.extracted_data = candidate.extracted_data;
                    document.confidence_score = candidate.confidence_score;
                    improved += 1;
                }
                Ok(Ok(_)) => {
                    debug!(document_id = %document.id, "re-extraction did not improve confidence");
                }
                Ok(Err(err)) => {
                    warn!(document_id = %document.id, error = %err, "document re-extraction failed");
                }
                Err(_) => {
                    warn!(document_id = %document.id, timeout = ?self.timeout, "document re-extraction timed out");
                }
            }
        }

        info!(
            claim_id = %packet.claim_id,
            attempted,
            improved,
            "low-confidence documents reprocessed"
        );
        packet
    }
}
