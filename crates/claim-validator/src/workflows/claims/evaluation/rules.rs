use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::super::constitution::RuleConstitution;
use super::super::domain::{
    mentions_any, ClaimPacket, Document, DocumentType, MerchantCategory,
};
use super::config::EvaluationConfig;
use super::ValidationRuleResult;

const UNREADABLE_INCIDENT: &str = "Incident date could not be parsed";

const DAMAGE_TERMS: [&str; 6] = ["damage", "fire", "burn", "charr", "smoke", "destroy"];
const WILDFIRE_TERMS: [&str; 8] = [
    "fire", "wildfire", "burn", "charr", "smoke", "ash", "ember", "scorch",
];
const SEVERE_TERMS: [&str; 5] = ["severe", "total", "complete", "destroy", "collapse"];
const SMOKE_TERMS: [&str; 2] = ["smoke", "soot"];
const HEAT_TERMS: [&str; 5] = ["heat", "melt", "warp", "scorch", "blister"];
const ASH_TERMS: [&str; 4] = ["ash", "debris", "cinder", "ember"];
const PREEXISTING_TERMS: [&str; 5] = [
    "pre-existing",
    "preexisting",
    "prior damage",
    "previous damage",
    "old damage",
];
const ARSON_TERMS: [&str; 4] = ["arson", "accelerant", "intentional", "deliberately set"];
const REPORT_TERMS: [&str; 4] = ["fire department", "incident", "cal fire", "fire marshal"];
const EVACUATION_TERMS: [&str; 1] = ["evacuat"];
const OWNERSHIP_TERMS: [&str; 4] = ["deed", "ownership", "title", "mortgage"];
const PROFESSIONAL_TERMS: [&str; 6] = [
    "contractor",
    "estimate",
    "adjuster",
    "assessment",
    "appraisal",
    "inspection",
];
const BEFORE_TERMS: [&str; 3] = ["before", "pre-fire", "prefire"];
const EXCLUDED_PERIL_TERMS: [&str; 4] = ["flood", "earthquake", "mudslide", "landslide"];
const CURRENT_PREMIUM_TERMS: [&str; 3] = ["current", "paid", "active"];
const GOOD_QUALITY_TERMS: [&str; 5] = ["clear", "good", "adequate", "high", "sharp"];
const POOR_QUALITY_TERMS: [&str; 5] = ["blurry", "poor", "low", "unclear", "dark"];

const RECEIPT_DATE_KEYS: [&str; 3] = ["date", "purchase_date", "transaction_date"];
const PHOTO_DATE_KEYS: [&str; 5] = ["taken_at", "captured_at", "date_taken", "date", "timestamp"];
const PROFESSIONAL_DATE_KEYS: [&str; 4] = ["estimate_date", "inspection_date", "report_date", "date"];
const QUALITY_KEYS: [&str; 2] = ["quality", "image_quality"];
const LIMIT_KEYS: [&str; 4] = [
    "coverage_limit",
    "dwelling_coverage",
    "policy_limit",
    "coverage_amount",
];
const EFFECTIVE_KEYS: [&str; 3] = ["effective_date", "policy_start", "start_date"];
const EXPIRATION_KEYS: [&str; 3] = ["expiration_date", "policy_end", "end_date"];
const PREMIUM_KEYS: [&str; 3] = ["premium_status", "payment_status", "status"];

/// Evaluates every constitution rule in order against the packet's evidence.
pub(crate) fn evaluate_rules(
    packet: &ClaimPacket,
    constitution: &RuleConstitution,
    config: &EvaluationConfig,
    as_of: DateTime<Utc>,
) -> Vec<ValidationRuleResult> {
    let evidence = Evidence::gather(packet, config, as_of);

    constitution
        .rules()
        .iter()
        .map(|rule| {
            let check = check_rule(&rule.id, &evidence);
            ValidationRuleResult {
                rule_id: rule.id.clone(),
                description: rule.description.clone(),
                weight: rule.weight,
                passed: check.passed,
                confidence: check.confidence.clamp(0.0, 1.0),
                rationale: check.rationale,
            }
        })
        .collect()
}

fn check_rule(rule_id: &str, evidence: &Evidence<'_>) -> RuleCheck {
    match rule_id {
        "COMP_001" => photo_completeness(evidence),
        "COMP_002" => receipt_requirement(evidence),
        "COMP_003" => expenses_in_coverage_period(evidence),
        "COMP_004" => policy_on_file(evidence),
        "COMP_005" => incident_report(evidence),
        "COMP_006" => keyword_presence(
            evidence.all_texts(),
            &EVACUATION_TERMS,
            (0.75, "Evacuation order documented"),
            (0.6, "No evacuation order or warning found"),
        ),
        "COMP_007" => keyword_presence(
            evidence.all_texts(),
            &OWNERSHIP_TERMS,
            (0.7, "Ownership documentation found"),
            (0.6, "No deed or proof of ownership found"),
        ),
        "COMP_009" => temporary_housing(evidence),
        "COMP_010" => keyword_presence(
            evidence.all_texts(),
            &PROFESSIONAL_TERMS,
            (0.8, "Professional assessment or contractor estimate provided"),
            (0.7, "No professional assessment or contractor estimate provided"),
        ),
        "COMP_011" => personal_property_inventory(evidence),
        "DAMAGE_001" => wildfire_causation(evidence),
        "DAMAGE_003" => severity_consistency(evidence),
        "DAMAGE_004" => keyword_presence(
            evidence.scene_texts(),
            &SMOKE_TERMS,
            (0.75, "Smoke damage documented"),
            (0.6, "No smoke damage documented"),
        ),
        "DAMAGE_005" => keyword_absence(
            evidence.incident_texts(),
            &PREEXISTING_TERMS,
            (0.7, "No pre-existing damage referenced"),
            (0.85, "Evidence references pre-existing damage"),
        ),
        "DAMAGE_006" => damage_timeline(evidence),
        "DAMAGE_007" => keyword_presence(
            evidence.photo_texts(),
            &HEAT_TERMS,
            (0.7, "Heat damage visible in photos"),
            (0.6, "No heat damage patterns described in photos"),
        ),
        "DAMAGE_008" => keyword_presence(
            evidence.scene_texts(),
            &ASH_TERMS,
            (0.7, "Ash and debris documented"),
            (0.6, "No ash or debris documented"),
        ),
        "DAMAGE_010" => keyword_absence(
            evidence.incident_texts(),
            &ARSON_TERMS,
            (0.75, "No indication of arson or intentional ignition"),
            (0.85, "Evidence references arson or intentional ignition"),
        ),
        "DOC_001" => photo_quality(evidence),
        "DOC_002" => receipt_legibility(evidence),
        "DOC_003" => extraction_confidence(evidence),
        "DOC_004" => photo_metadata(evidence),
        "DOC_005" => photo_angles(evidence),
        "DOC_006" => keyword_presence(
            evidence.photo_texts(),
            &BEFORE_TERMS,
            (0.65, "Pre-fire photos provided"),
            (0.6, "No pre-fire photos provided"),
        ),
        "TIME_001" => filing_window(evidence),
        "TIME_002" => purchases_after_incident(evidence),
        "TIME_003" => emergency_expenses(evidence),
        "TIME_004" => contractor_timing(evidence),
        "TIME_005" => pre_incident_activity(evidence),
        "GEO_001" => fire_perimeter(evidence),
        "GEO_002" => address_match(evidence),
        "POLICY_001" => policy_limit(evidence),
        "POLICY_002" => deductible(evidence),
        "POLICY_003" => coverage_period(evidence),
        "POLICY_004" => keyword_absence(
            evidence.scene_texts(),
            &EXCLUDED_PERIL_TERMS,
            (0.7, "No excluded perils referenced"),
            (0.7, "Evidence references a peril excluded from wildfire coverage"),
        ),
        "POLICY_005" => premium_status(evidence),
        "FIN_001" => documented_amounts(evidence),
        "FIN_002" => duplicate_receipts(evidence),
        "FIN_005" => supplier_pricing(evidence),
        _ => document_presence(evidence),
    }
}

struct RuleCheck {
    passed: bool,
    confidence: f64,
    rationale: String,
}

impl RuleCheck {
    fn pass(confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            passed: true,
            confidence,
            rationale: rationale.into(),
        }
    }

    fn fail(confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            passed: false,
            confidence,
            rationale: rationale.into(),
        }
    }

    fn outcome(passed: bool, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            passed,
            confidence,
            rationale: rationale.into(),
        }
    }

    /// Lowers confidence for fields that were present but unreadable.
    fn degraded(mut self, unreadable: usize) -> Self {
        if unreadable > 0 {
            self.confidence = (self.confidence - 0.1 * unreadable as f64).max(0.1);
            self.rationale
                .push_str(&format!(" ({unreadable} unreadable field(s) ignored)"));
        }
        self
    }
}

struct Observed<'a> {
    document: &'a Document,
    text: String,
}

struct ReceiptEvidence<'a> {
    document: &'a Document,
    text: String,
    merchant: Option<&'a str>,
    amount: Option<f64>,
    date: Option<NaiveDate>,
    items: Vec<String>,
    category: MerchantCategory,
    unreadable: usize,
}

impl<'a> ReceiptEvidence<'a> {
    fn new(document: &'a Document) -> Self {
        let data = &document.extracted_data;
        let merchant = data.get_text("merchant");
        let amount = data.get_number("total_amount");
        let date = data.first_date(&RECEIPT_DATE_KEYS);
        let items = data.get_string_list("items").unwrap_or_default();

        let mut unreadable = 0;
        if amount.is_none() && data.contains_key("total_amount") {
            unreadable += 1;
        }
        if date.is_none() && RECEIPT_DATE_KEYS.iter().any(|key| data.contains_key(key)) {
            unreadable += 1;
        }

        Self {
            document,
            text: document.searchable_text(),
            merchant,
            amount,
            date,
            category: MerchantCategory::classify(merchant.unwrap_or_default(), &items),
            items,
            unreadable,
        }
    }
}

struct Evidence<'a> {
    packet: &'a ClaimPacket,
    config: &'a EvaluationConfig,
    today: NaiveDate,
    incident: Option<NaiveDate>,
    days_since_incident: Option<i64>,
    photos: Vec<Observed<'a>>,
    reports: Vec<Observed<'a>>,
    policies: Vec<Observed<'a>>,
    others: Vec<Observed<'a>>,
    receipts: Vec<ReceiptEvidence<'a>>,
}

impl<'a> Evidence<'a> {
    fn gather(packet: &'a ClaimPacket, config: &'a EvaluationConfig, as_of: DateTime<Utc>) -> Self {
        let mut evidence = Self {
            packet,
            config,
            today: as_of.date_naive(),
            incident: packet.incident_on(),
            days_since_incident: packet.days_since_incident(as_of),
            photos: Vec::new(),
            reports: Vec::new(),
            policies: Vec::new(),
            others: Vec::new(),
            receipts: Vec::new(),
        };

        for document in &packet.documents {
            let observed = || Observed {
                document,
                text: document.searchable_text(),
            };
            match document.document_type {
                DocumentType::Photo => evidence.photos.push(observed()),
                DocumentType::DamageReport => evidence.reports.push(observed()),
                DocumentType::Policy => evidence.policies.push(observed()),
                DocumentType::Other => evidence.others.push(observed()),
                DocumentType::Receipt if document.is_receipt_rollup() => {}
                DocumentType::Receipt => evidence.receipts.push(ReceiptEvidence::new(document)),
            }
        }

        evidence
    }

    fn photo_texts(&self) -> Vec<&str> {
        self.photos.iter().map(|photo| photo.text.as_str()).collect()
    }

    /// Photos and incident reports.
    fn scene_texts(&self) -> Vec<&str> {
        self.photos
            .iter()
            .chain(&self.reports)
            .map(|observed| observed.text.as_str())
            .collect()
    }

    /// Evidence describing the loss itself, excluding policy and purchase records.
    fn incident_texts(&self) -> Vec<&str> {
        self.photos
            .iter()
            .chain(&self.reports)
            .chain(&self.others)
            .map(|observed| observed.text.as_str())
            .collect()
    }

    fn all_texts(&self) -> Vec<&str> {
        self.photos
            .iter()
            .chain(&self.reports)
            .chain(&self.policies)
            .chain(&self.others)
            .map(|observed| observed.text.as_str())
            .chain(self.receipts.iter().map(|receipt| receipt.text.as_str()))
            .collect()
    }

    fn dated_receipts(&self) -> Vec<NaiveDate> {
        self.receipts.iter().filter_map(|receipt| receipt.date).collect()
    }

    fn unreadable_receipt_fields(&self) -> usize {
        self.receipts.iter().map(|receipt| receipt.unreadable).sum()
    }

    fn photo_share(&self, keywords: &[&str]) -> f64 {
        if self.photos.is_empty() {
            return 0.0;
        }
        let matching = self
            .photos
            .iter()
            .filter(|photo| mentions_any(&photo.text, keywords))
            .count();
        matching as f64 / self.photos.len() as f64
    }
}

fn keyword_presence(
    texts: Vec<&str>,
    keywords: &[&str],
    found: (f64, &str),
    missing: (f64, &str),
) -> RuleCheck {
    if texts.iter().any(|text| mentions_any(text, keywords)) {
        RuleCheck::pass(found.0, found.1)
    } else {
        RuleCheck::fail(missing.0, missing.1)
    }
}

fn keyword_absence(
    texts: Vec<&str>,
    keywords: &[&str],
    clean: (f64, &str),
    flagged: (f64, &str),
) -> RuleCheck {
    if texts.iter().any(|text| mentions_any(text, keywords)) {
        RuleCheck::fail(flagged.0, flagged.1)
    } else {
        RuleCheck::pass(clean.0, clean.1)
    }
}

fn document_presence(evidence: &Evidence<'_>) -> RuleCheck {
    let count = evidence.packet.documents.len();
    RuleCheck::outcome(
        count > 0,
        0.7,
        format!("Basic document presence: {count} documents"),
    )
}

fn photo_completeness(evidence: &Evidence<'_>) -> RuleCheck {
    let count = evidence.photos.len();
    let minimum = evidence.config.minimum_photos;
    if count < minimum {
        return RuleCheck::fail(
            0.95,
            format!("Only {count} photos provided, need at least {minimum}"),
        );
    }

    if evidence
        .photos
        .iter()
        .any(|photo| mentions_any(&photo.text, &DAMAGE_TERMS))
    {
        RuleCheck::pass(0.9, format!("{count} photos with visible damage evidence"))
    } else {
        RuleCheck::fail(
            0.3,
            format!("{count} photos provided but none describe fire damage"),
        )
    }
}

fn receipt_requirement(evidence: &Evidence<'_>) -> RuleCheck {
    let receipts = evidence.receipts.len();
    match evidence.packet.estimated_damage {
        Some(amount) if amount > evidence.config.receipt_required_above => {
            if receipts > 0 {
                RuleCheck::pass(
                    0.9,
                    format!("{receipts} receipts provided for ${amount:.0} claim"),
                )
            } else {
                RuleCheck::fail(
                    0.95,
                    format!("Claim of ${amount:.0} requires receipts but none were provided"),
                )
            }
        }
        Some(amount) => RuleCheck::pass(
            1.0,
            format!("Claim of ${amount:.0} is below the receipt threshold"),
        ),
        None => RuleCheck::outcome(
            receipts > 0,
            0.6,
            format!("Estimated damage not provided; {receipts} receipts attached"),
        ),
    }
}

fn expenses_in_coverage_period(evidence: &Evidence<'_>) -> RuleCheck {
    let Some(incident) = evidence.incident else {
        return RuleCheck::fail(0.5, UNREADABLE_INCIDENT);
    };
    if evidence.receipts.is_empty() {
        return RuleCheck::fail(0.8, "No expenses submitted to check against the coverage period");
    }

    let unreadable = evidence.unreadable_receipt_fields();
    let dated = evidence.dated_receipts();
    if dated.is_empty() {
        return RuleCheck::fail(0.6, "No receipt carries a readable date").degraded(unreadable);
    }

    let earliest = incident - Duration::days(evidence.config.receipt_lookback_days);
    let outside = dated
        .iter()
        .filter(|date| **date < earliest || **date > evidence.today)
        .count();
    let dated_share = dated.len() as f64 / evidence.receipts.len() as f64;

    let check = if outside == 0 {
        RuleCheck::pass(
            0.9 * (0.5 + 0.5 * dated_share),
            format!(
                "{} dated expenses fall between {earliest} and {}",
                dated.len(),
                evidence.today
            ),
        )
    } else {
        RuleCheck::fail(
            0.85,
            format!(
                "{outside} of {} dated expenses fall outside {earliest} to {}",
                dated.len(),
                evidence.today
            ),
        )
    };
    check.degraded(unreadable)
}

fn policy_on_file(evidence: &Evidence<'_>) -> RuleCheck {
    let count = evidence.policies.len();
    if count > 0 {
        RuleCheck::pass(0.9, format!("Policy documentation present ({count})"))
    } else {
        RuleCheck::fail(0.9, "No policy documentation provided")
    }
}

fn incident_report(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.reports.is_empty() {
        return RuleCheck::fail(0.9, "No fire department incident report provided");
    }
    keyword_presence(
        evidence
            .reports
            .iter()
            .map(|report| report.text.as_str())
            .collect(),
        &REPORT_TERMS,
        (0.85, "Fire department incident report provided"),
        (0.6, "Damage report does not reference a fire department incident"),
    )
}

fn temporary_housing(evidence: &Evidence<'_>) -> RuleCheck {
    let lodging = evidence
        .receipts
        .iter()
        .filter(|receipt| receipt.category == MerchantCategory::TemporaryHousing)
        .count();
    if lodging > 0 {
        RuleCheck::pass(0.8, format!("{lodging} temporary housing receipts"))
    } else {
        RuleCheck::fail(0.6, "No temporary housing receipts provided")
    }
}

fn personal_property_inventory(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence
        .all_texts()
        .iter()
        .any(|text| mentions_any(text, &["inventory"]))
    {
        return RuleCheck::pass(0.8, "Personal property inventory provided");
    }

    let items: usize = evidence.receipts.iter().map(|receipt| receipt.items.len()).sum();
    if items >= 5 {
        RuleCheck::pass(0.75, format!("{items} itemized purchases document personal property"))
    } else {
        RuleCheck::fail(
            0.65,
            format!("No inventory list and only {items} itemized purchases"),
        )
    }
}

fn wildfire_causation(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.photos.is_empty() {
        return RuleCheck::fail(0.9, "No photos to attribute damage to wildfire");
    }
    let share = evidence.photo_share(&WILDFIRE_TERMS);
    RuleCheck::outcome(
        share >= 0.5,
        0.8,
        format!("Wildfire indicators in {:.0}% of photos", share * 100.0),
    )
}

fn severity_consistency(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.photos.is_empty() {
        return RuleCheck::fail(0.9, "No photos to assess damage severity");
    }
    let Some(amount) = evidence.packet.estimated_damage else {
        return RuleCheck::fail(0.5, "Estimated damage not provided");
    };

    let severe_share = evidence.photo_share(&SEVERE_TERMS);
    if amount > evidence.config.severity_check_above && severe_share < 0.3 {
        RuleCheck::fail(
            0.8,
            format!(
                "${amount:.0} claim but only {:.0}% of photos describe severe damage",
                severe_share * 100.0
            ),
        )
    } else if amount < evidence.config.minor_claim_below && severe_share > 0.7 {
        RuleCheck::fail(
            0.7,
            format!("Severe damage described for a ${amount:.0} claim"),
        )
    } else {
        RuleCheck::pass(0.85, "Damage severity consistent with claimed amount")
    }
}

fn damage_timeline(evidence: &Evidence<'_>) -> RuleCheck {
    let Some(incident) = evidence.incident else {
        return RuleCheck::fail(0.5, UNREADABLE_INCIDENT);
    };
    let earliest = incident - Duration::days(evidence.config.receipt_lookback_days);
    let early = evidence
        .dated_receipts()
        .iter()
        .filter(|date| **date < earliest)
        .count();
    if early > 0 {
        RuleCheck::fail(0.75, format!("{early} purchases predate the fire by more than {} days", evidence.config.receipt_lookback_days))
    } else {
        RuleCheck::pass(0.7, "No purchases predate the fire window")
    }
}

fn photo_quality(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.photos.is_empty() {
        return RuleCheck::fail(0.9, "No photos to assess");
    }
    let total: f64 = evidence
        .photos
        .iter()
        .map(|photo| {
            match photo
                .document
                .extracted_data
                .first_text(&QUALITY_KEYS)
                .map(str::to_lowercase)
            {
                Some(quality) if mentions_any(&quality, &GOOD_QUALITY_TERMS) => 1.0,
                Some(quality) if mentions_any(&quality, &POOR_QUALITY_TERMS) => 0.0,
                _ => 0.5,
            }
        })
        .sum();
    let ratio = total / evidence.photos.len() as f64;
    RuleCheck::outcome(
        ratio >= 0.6,
        0.8,
        format!("Photo quality ratio {ratio:.2}"),
    )
}

fn receipt_legibility(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.receipts.is_empty() {
        return RuleCheck::fail(0.9, "No receipts to review");
    }
    let legible = evidence
        .receipts
        .iter()
        .filter(|receipt| receipt.merchant.is_some() && receipt.date.is_some() && receipt.amount.is_some())
        .count();
    let ratio = legible as f64 / evidence.receipts.len() as f64;
    let rationale = format!(
        "{legible} of {} receipts show merchant, date and amount",
        evidence.receipts.len()
    );
    let check = if ratio >= 0.8 {
        RuleCheck::pass(0.85, rationale)
    } else {
        RuleCheck::fail(0.8, rationale)
    };
    check.degraded(evidence.unreadable_receipt_fields())
}

fn extraction_confidence(evidence: &Evidence<'_>) -> RuleCheck {
    let documents = &evidence.packet.documents;
    if documents.is_empty() {
        return RuleCheck::fail(0.9, "No documents submitted");
    }
    let average = documents
        .iter()
        .map(|document| document.confidence_score)
        .sum::<f64>()
        / documents.len() as f64;
    RuleCheck::outcome(
        average >= 0.7,
        0.7,
        format!("Average extraction confidence {average:.2}"),
    )
}

fn photo_metadata(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.photos.is_empty() {
        return RuleCheck::fail(0.85, "No photos to verify");
    }
    let dated = evidence
        .photos
        .iter()
        .filter(|photo| photo.document.extracted_data.first_date(&PHOTO_DATE_KEYS).is_some())
        .count();
    let ratio = dated as f64 / evidence.photos.len() as f64;
    RuleCheck::outcome(
        ratio >= 0.5,
        0.7,
        format!("{dated} of {} photos carry capture dates", evidence.photos.len()),
    )
}

fn photo_angles(evidence: &Evidence<'_>) -> RuleCheck {
    let count = evidence.photos.len();
    let needed = evidence.config.multiple_angle_photos;
    RuleCheck::outcome(
        count >= needed,
        0.85,
        format!("{count} photos provided, {needed} needed for multiple angles"),
    )
}

fn filing_window(evidence: &Evidence<'_>) -> RuleCheck {
    let Some(days) = evidence.days_since_incident else {
        return RuleCheck::fail(0.5, UNREADABLE_INCIDENT);
    };
    let window = evidence.config.filing_window_days;
    if days < 0 {
        RuleCheck::fail(0.8, "Incident date is in the future")
    } else if days <= window {
        RuleCheck::pass(0.95, format!("Claim filed {days} days after incident"))
    } else {
        RuleCheck::fail(
            0.95,
            format!("Claim filed {days} days after incident, beyond the {window}-day window"),
        )
    }
}

fn purchases_after_incident(evidence: &Evidence<'_>) -> RuleCheck {
    let Some(incident) = evidence.incident else {
        return RuleCheck::fail(0.5, UNREADABLE_INCIDENT);
    };
    let dated = evidence.dated_receipts();
    if dated.is_empty() {
        return RuleCheck::fail(0.6, "No dated purchases to review")
            .degraded(evidence.unreadable_receipt_fields());
    }
    let after = dated.iter().filter(|date| **date >= incident).count();
    let share = after as f64 / dated.len() as f64;
    RuleCheck::outcome(
        share >= 0.5,
        0.8,
        format!("{after} of {} purchases made on or after the incident", dated.len()),
    )
    .degraded(evidence.unreadable_receipt_fields())
}

fn emergency_expenses(evidence: &Evidence<'_>) -> RuleCheck {
    let Some(incident) = evidence.incident else {
        return RuleCheck::fail(0.5, UNREADABLE_INCIDENT);
    };
    let days = evidence.config.emergency_expense_days;
    let deadline = incident + Duration::days(days);
    if evidence
        .dated_receipts()
        .iter()
        .any(|date| *date >= incident && *date <= deadline)
    {
        RuleCheck::pass(0.8, format!("Emergency expenses incurred within {days} days"))
    } else {
        RuleCheck::fail(0.6, format!("No expenses within {days} days of the incident"))
    }
}

fn contractor_timing(evidence: &Evidence<'_>) -> RuleCheck {
    let Some(incident) = evidence.incident else {
        return RuleCheck::fail(0.5, UNREADABLE_INCIDENT);
    };
    let deadline = incident + Duration::days(evidence.config.emergency_expense_days);

    let professional: Vec<&Document> = evidence
        .photos
        .iter()
        .chain(&evidence.reports)
        .chain(&evidence.others)
        .filter(|observed| mentions_any(&observed.text, &PROFESSIONAL_TERMS))
        .map(|observed| observed.document)
        .chain(
            evidence
                .receipts
                .iter()
                .filter(|receipt| mentions_any(&receipt.text, &PROFESSIONAL_TERMS))
                .map(|receipt| receipt.document),
        )
        .collect();

    if professional.is_empty() {
        return RuleCheck::fail(0.6, "No contractor estimate on file");
    }
    let timely = professional.iter().any(|document| {
        document
            .extracted_data
            .first_date(&PROFESSIONAL_DATE_KEYS)
            .map(|date| date >= incident && date <= deadline)
            .unwrap_or(false)
    });
    if timely {
        RuleCheck::pass(0.75, "Contractor estimate obtained promptly")
    } else {
        RuleCheck::fail(0.65, "Contractor estimate undated or outside the first 30 days")
    }
}

fn pre_incident_activity(evidence: &Evidence<'_>) -> RuleCheck {
    let Some(incident) = evidence.incident else {
        return RuleCheck::fail(0.5, UNREADABLE_INCIDENT);
    };
    let dated = evidence.dated_receipts();
    if dated.is_empty() {
        return RuleCheck::pass(0.6, "No purchase history to review");
    }
    let before = dated.iter().filter(|date| **date < incident).count();
    let share = before as f64 / dated.len() as f64;
    RuleCheck::outcome(
        share <= 0.5,
        0.75,
        format!("{before} of {} purchases predate the incident", dated.len()),
    )
}

fn fire_perimeter(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.reports.is_empty() {
        return RuleCheck::fail(0.7, "No incident report places the property in a fire area");
    }
    keyword_presence(
        evidence
            .reports
            .iter()
            .map(|report| report.text.as_str())
            .collect(),
        &WILDFIRE_TERMS,
        (0.75, "Incident report confirms fire activity at the property"),
        (0.6, "Incident report does not mention fire activity"),
    )
}

fn address_match(evidence: &Evidence<'_>) -> RuleCheck {
    let street = evidence
        .packet
        .property_address
        .split(',')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let key: Vec<&str> = street.split_whitespace().take(2).collect();
    if key.is_empty() {
        return RuleCheck::fail(0.5, "Property address not provided");
    }
    let key = key.join(" ");

    if evidence.all_texts().iter().any(|text| text.contains(&key)) {
        RuleCheck::pass(0.75, format!("Documents reference the property at {key}"))
    } else {
        RuleCheck::fail(0.6, "No document references the property address")
    }
}

fn policy_limit(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.policies.is_empty() {
        return RuleCheck::fail(0.85, "No policy to check limits against");
    }
    let Some(amount) = evidence.packet.estimated_damage else {
        return RuleCheck::fail(0.5, "Estimated damage not provided");
    };
    let limit = evidence
        .policies
        .iter()
        .find_map(|policy| policy.document.extracted_data.first_number(&LIMIT_KEYS));
    match limit {
        Some(limit) if amount <= limit => RuleCheck::pass(
            0.9,
            format!("Claim of ${amount:.0} within ${limit:.0} limit"),
        ),
        Some(limit) => RuleCheck::fail(
            0.9,
            format!("Claim of ${amount:.0} exceeds ${limit:.0} limit"),
        ),
        None => RuleCheck::fail(0.5, "Coverage limit not found in policy documents"),
    }
}

fn deductible(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.policies.is_empty() {
        return RuleCheck::fail(0.85, "No policy to read the deductible from");
    }
    let Some(deductible) = evidence
        .policies
        .iter()
        .find_map(|policy| policy.document.extracted_data.get_number("deductible"))
    else {
        return RuleCheck::fail(0.6, "Deductible not found in policy documents");
    };
    match evidence.packet.estimated_damage {
        Some(amount) if deductible < amount => RuleCheck::pass(
            0.8,
            format!("Deductible ${deductible:.0} applies to ${amount:.0} claim"),
        ),
        Some(amount) => RuleCheck::fail(
            0.8,
            format!("Deductible ${deductible:.0} exceeds the ${amount:.0} claim"),
        ),
        None => RuleCheck::pass(0.55, format!("Deductible ${deductible:.0} on file")),
    }
}

fn coverage_period(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.policies.is_empty() {
        return RuleCheck::fail(0.85, "No policy to confirm coverage dates");
    }
    let Some(incident) = evidence.incident else {
        return RuleCheck::fail(0.5, UNREADABLE_INCIDENT);
    };
    let effective = evidence
        .policies
        .iter()
        .find_map(|policy| policy.document.extracted_data.first_date(&EFFECTIVE_KEYS));
    let expiration = evidence
        .policies
        .iter()
        .find_map(|policy| policy.document.extracted_data.first_date(&EXPIRATION_KEYS));
    if effective.is_none() && expiration.is_none() {
        return RuleCheck::fail(0.5, "Policy effective dates not found");
    }

    let started = effective.map(|date| date <= incident).unwrap_or(true);
    let not_expired = expiration.map(|date| incident <= date).unwrap_or(true);
    if started && not_expired {
        RuleCheck::pass(0.9, format!("Coverage in force on {incident}"))
    } else {
        RuleCheck::fail(0.9, format!("Coverage not in force on {incident}"))
    }
}

fn premium_status(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.policies.is_empty() {
        return RuleCheck::fail(0.8, "No policy to confirm premium status");
    }
    let status = evidence
        .policies
        .iter()
        .find_map(|policy| policy.document.extracted_data.first_text(&PREMIUM_KEYS))
        .map(str::to_lowercase);
    match status {
        Some(status) if mentions_any(&status, &CURRENT_PREMIUM_TERMS) => {
            RuleCheck::pass(0.85, format!("Premium status: {status}"))
        }
        Some(status) => RuleCheck::fail(0.8, format!("Premium status: {status}")),
        None => RuleCheck::fail(0.5, "Premium status not found in policy documents"),
    }
}

fn documented_amounts(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.packet.count_of(DocumentType::Receipt) == 0 {
        return RuleCheck::fail(0.9, "No receipts support the claimed amount");
    }
    let Some(amount) = evidence.packet.estimated_damage else {
        return RuleCheck::fail(0.5, "Estimated damage not provided");
    };

    let total = evidence.packet.documented_receipt_total();
    let check = match total.coverage_of(amount) {
        Some(coverage) => RuleCheck::outcome(
            coverage >= evidence.config.receipt_coverage_ratio,
            0.85,
            format!(
                "Receipts document ${:.0} of ${amount:.0} ({:.0}%)",
                total.amount,
                coverage * 100.0
            ),
        ),
        None => RuleCheck::fail(0.5, "Claimed amount must be positive"),
    };
    check.degraded(total.malformed)
}

fn duplicate_receipts(evidence: &Evidence<'_>) -> RuleCheck {
    if evidence.receipts.is_empty() {
        return RuleCheck::pass(0.6, "No receipts to cross-check");
    }
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    for receipt in &evidence.receipts {
        let (Some(merchant), Some(date), Some(amount)) =
            (receipt.merchant, receipt.date, receipt.amount)
        else {
            continue;
        };
        let key = (
            merchant.to_lowercase(),
            date,
            (amount * 100.0).round() as i64,
        );
        if !seen.insert(key) {
            duplicates += 1;
        }
    }
    if duplicates == 0 {
        RuleCheck::pass(0.75, "No duplicate receipts")
    } else {
        RuleCheck::fail(0.8, format!("{duplicates} duplicate receipts submitted"))
    }
}

fn supplier_pricing(evidence: &Evidence<'_>) -> RuleCheck {
    let suppliers: Vec<&str> = evidence
        .receipts
        .iter()
        .filter(|receipt| receipt.category == MerchantCategory::HomeImprovement)
        .filter_map(|receipt| receipt.merchant)
        .collect();
    if suppliers.is_empty() {
        RuleCheck::fail(0.6, "No purchases from recognised building suppliers")
    } else {
        RuleCheck::pass(
            0.75,
            format!("Material pricing available from {}", suppliers.join(", ")),
        )
    }
}
