use chrono::{DateTime, Utc};

use super::domain::{mentions_any, ClaimPacket, DocumentType};
use super::evaluation::{is_approved, ClaimValidation, EvaluationConfig, ValidationRuleResult};

/// Upper bound on reported fraud indicators and missing documents.
pub const MAX_FINDINGS: usize = 5;

const SEVERE_TERMS: [&str; 2] = ["severe", "total"];
const MINOR_TERMS: [&str; 2] = ["minor", "light"];

/// Weighted roll-up of per-rule results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub overall_score: f64,
    pub confidence: f64,
    pub rules_passed: usize,
    pub total_rules: usize,
}

/// Turns rule results and claim metadata into a [`ClaimValidation`].
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    config: EvaluationConfig,
}

impl ScoreAggregator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Weighted pass rate and weighted confidence; both are 0.0 when the total weight is zero.
    pub fn summarize(&self, results: &[ValidationRuleResult]) -> ScoreSummary {
        let total_weight: f64 = results.iter().map(|result| result.weight).sum();
        let rules_passed = results.iter().filter(|result| result.passed).count();

        if total_weight <= 0.0 || !total_weight.is_finite() {
            return ScoreSummary {
                overall_score: 0.0,
                confidence: 0.0,
                rules_passed,
                total_rules: results.len(),
            };
        }

        let passed_weight: f64 = results
            .iter()
            .filter(|result| result.passed)
            .map(|result| result.weight)
            .sum();
        let weighted_confidence: f64 = results
            .iter()
            .map(|result| result.weight * result.confidence)
            .sum();

        ScoreSummary {
            overall_score: (passed_weight / total_weight).clamp(0.0, 1.0),
            confidence: (weighted_confidence / total_weight).clamp(0.0, 1.0),
            rules_passed,
            total_rules: results.len(),
        }
    }

    pub fn is_approved(
        &self,
        overall_score: f64,
        fraud_indicators: &[String],
        results: &[ValidationRuleResult],
    ) -> bool {
        is_approved(&self.config, overall_score, fraud_indicators, results)
    }

    /// Deterministic metadata scan, reported in a fixed priority order.
    pub fn fraud_indicators(&self, packet: &ClaimPacket, as_of: DateTime<Utc>) -> Vec<String> {
        let config = &self.config;
        let mut indicators = Vec::new();

        if let Some(amount) = packet.estimated_damage {
            if amount > config.max_plausible_damage {
                indicators.push(format!("Unusually high claim amount: ${amount:.2}"));
            } else if amount < config.min_plausible_damage {
                indicators.push(format!("Suspiciously low claim amount: ${amount:.2}"));
            }
        }

        match packet.days_since_incident(as_of) {
            Some(days) if days < 1 => {
                indicators.push("Claim filed same day as incident - unusually fast".to_string())
            }
            Some(days) if days > config.late_filing_days => indicators.push(format!(
                "Claim filed {days} days after incident - delayed reporting"
            )),
            Some(_) => {}
            None => indicators.push("Invalid or suspicious incident date".to_string()),
        }

        let photos: Vec<String> = packet
            .documents_of(DocumentType::Photo)
            .map(|photo| photo.searchable_text())
            .collect();
        if photos.is_empty() {
            indicators.push("No photographic evidence provided".to_string());
        } else if photos.len() > config.max_photo_count {
            indicators.push(format!("Excessive number of photos: {}", photos.len()));
        }

        let high_value = |threshold: f64| {
            packet
                .estimated_damage
                .map(|amount| amount > threshold)
                .unwrap_or(false)
        };

        let describes_severe = photos.iter().any(|text| mentions_any(text, &SEVERE_TERMS));
        let describes_minor = photos
            .iter()
            .any(|text| !mentions_any(text, &SEVERE_TERMS) && mentions_any(text, &MINOR_TERMS));
        if describes_severe && describes_minor && high_value(config.severity_check_above) {
            indicators.push(
                "Inconsistent damage severity descriptions for high-value claim".to_string(),
            );
        }

        if high_value(config.documentation_review_above) {
            if packet.count_of(DocumentType::Receipt) == 0 {
                indicators.push("High-value claim missing receipts/proof of purchase".to_string());
            }
            if packet.count_of(DocumentType::Policy) == 0 {
                indicators.push("No policy documentation provided".to_string());
            }
        }

        indicators.truncate(MAX_FINDINGS);
        indicators
    }

    /// Absent document types first, then high-confidence photo or receipt failures.
    pub fn missing_documents(
        &self,
        packet: &ClaimPacket,
        results: &[ValidationRuleResult],
    ) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();

        if packet.count_of(DocumentType::Photo) == 0 {
            missing.push("Property damage photos".to_string());
        }
        let receipts_expected = packet
            .estimated_damage
            .map(|amount| amount > self.config.missing_receipts_above)
            .unwrap_or(false);
        if receipts_expected && packet.count_of(DocumentType::Receipt) == 0 {
            missing.push("Receipts for high-value items".to_string());
        }
        if packet.count_of(DocumentType::Policy) == 0 {
            missing.push("Insurance policy documentation".to_string());
        }

        for result in results.iter().filter(|result| !result.passed && result.confidence > 0.8) {
            let description = result.description.to_lowercase();
            let entry = if description.contains("photo") {
                "Additional property photos"
            } else if description.contains("receipt") {
                "Purchase receipts"
            } else {
                continue;
            };
            let keyword = if entry.contains("photo") { "photo" } else { "receipt" };
            let already_listed = missing
                .iter()
                .any(|existing| existing.to_lowercase().contains(keyword));
            if !already_listed {
                missing.push(entry.to_string());
            }
        }

        missing.truncate(MAX_FINDINGS);
        missing
    }

    pub fn rationale(
        &self,
        packet: &ClaimPacket,
        results: &[ValidationRuleResult],
        overall_score: f64,
        fraud_indicators: &[String],
    ) -> String {
        let passed: Vec<&str> = results
            .iter()
            .filter(|result| result.passed)
            .map(|result| result.rule_id.as_str())
            .collect();
        let failed: Vec<&ValidationRuleResult> =
            results.iter().filter(|result| !result.passed).collect();

        let mut parts = vec![format!(
            "Claim validation completed with overall score: {:.1}%",
            overall_score * 100.0
        )];
        if !passed.is_empty() {
            parts.push(format!(
                "{} rules passed: {}",
                passed.len(),
                passed.iter().take(3).copied().collect::<Vec<_>>().join(", ")
            ));
        }
        if !failed.is_empty() {
            parts.push(format!(
                "{} rules failed: {}",
                failed.len(),
                failed
                    .iter()
                    .take(3)
                    .map(|result| result.rule_id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        if let Some(critical) = failed.iter().find(|result| result.confidence > 0.8) {
            parts.push(format!("Critical issues: {}", critical.rationale));
        }
        if !fraud_indicators.is_empty() {
            parts.push(format!("{} fraud indicators detected", fraud_indicators.len()));
        }
        parts.push(format!(
            "Evidence: {} photos, {} total documents",
            packet.count_of(DocumentType::Photo),
            packet.documents.len()
        ));

        parts.join(" | ")
    }

    /// Full validation from locally evaluated rule results.
    pub fn assemble(
        &self,
        packet: &ClaimPacket,
        results: Vec<ValidationRuleResult>,
        as_of: DateTime<Utc>,
        label: &str,
    ) -> ClaimValidation {
        let summary = self.summarize(&results);
        let fraud_indicators = self.fraud_indicators(packet, as_of);
        let missing_documents = self.missing_documents(packet, &results);
        let approved = self.is_approved(summary.overall_score, &fraud_indicators, &results);
        let rationale = format!(
            "{label}: {}",
            self.rationale(packet, &results, summary.overall_score, &fraud_indicators)
        );

        ClaimValidation {
            claim_id: packet.claim_id.clone(),
            overall_score: summary.overall_score,
            confidence: summary.confidence,
            approved,
            rules_evaluated: results,
            missing_documents,
            fraud_indicators,
            rationale,
            timestamp: as_of,
        }
    }
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::new(EvaluationConfig::default())
    }
}
