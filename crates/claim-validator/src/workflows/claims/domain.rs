use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier wrapper for submitted claims.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub String);

impl ClaimId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClaimId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Kind of evidence attached to a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Policy,
    Receipt,
    Photo,
    DamageReport,
    Other,
}

impl DocumentType {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::Policy => "policy",
            DocumentType::Receipt => "receipt",
            DocumentType::Photo => "photo",
            DocumentType::DamageReport => "damage_report",
            DocumentType::Other => "other",
        }
    }
}

/// Schema-less extraction output keyed by field name.
///
/// Fields arrive from OCR and vision extractors with inconsistent shapes, so every
/// accessor is tolerant: a value that cannot be read as the requested type is
/// reported as absent instead of failing the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedData(BTreeMap<String, Value>);

impl ExtractedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Numeric field, accepting JSON numbers and currency strings such as `"$1,250.00"`.
    pub fn get_number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(number) => number.as_f64().filter(|value| value.is_finite()),
            Value::String(raw) => parse_amount(raw),
            _ => None,
        }
    }

    /// First numeric field among `keys`.
    pub fn first_number(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|key| self.get_number(key))
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            Value::String(raw) => {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    pub fn first_text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get_text(key))
    }

    pub fn get_date(&self, key: &str) -> Option<NaiveDate> {
        self.get_text(key).and_then(parse_date)
    }

    pub fn first_date(&self, keys: &[&str]) -> Option<NaiveDate> {
        keys.iter().find_map(|key| self.get_date(key))
    }

    /// List field, accepting a JSON array of strings or a comma separated string.
    pub fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.0.get(key)? {
            Value::Array(values) => Some(
                values
                    .iter()
                    .filter_map(|value| value.as_str())
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .collect(),
            ),
            Value::String(raw) => Some(
                raw.split(',')
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(flag) => Some(*flag),
            Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Lower-cased concatenation of every scalar value, used for keyword checks.
    pub fn searchable_text(&self) -> String {
        let mut text = String::new();
        for value in self.0.values() {
            push_scalars(value, &mut text);
        }
        text
    }
}

impl FromIterator<(String, Value)> for ExtractedData {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn push_scalars(value: &Value, text: &mut String) {
    match value {
        Value::String(raw) => {
            text.push_str(&raw.to_lowercase());
            text.push(' ');
        }
        Value::Number(number) => {
            text.push_str(&number.to_string());
            text.push(' ');
        }
        Value::Array(values) => values.iter().for_each(|value| push_scalars(value, text)),
        Value::Object(map) => map.values().for_each(|value| push_scalars(value, text)),
        Value::Bool(_) | Value::Null => {}
    }
}

const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y"];

/// Parses the date shapes seen in claim packets and extracted fields.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(timestamp.date_naive());
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|timestamp| timestamp.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        })
}

/// Parses a monetary amount, ignoring currency symbols, separators and whitespace.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !matches!(ch, '$' | ',' | ' ' | '\t'))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
}

fn default_confidence() -> f64 {
    0.5
}

/// A single piece of evidence and what extraction made of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub document_type: DocumentType,
    #[serde(default)]
    pub extracted_data: ExtractedData,
    #[serde(default = "default_confidence")]
    pub confidence_score: f64,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default = "Utc::now")]
    pub upload_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        document_type: DocumentType,
        extracted_data: ExtractedData,
        confidence_score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            document_type,
            extracted_data,
            confidence_score,
            file_size: 0,
            upload_timestamp: Utc::now(),
            file_path: None,
            content: None,
        }
    }

    pub fn is(&self, document_type: DocumentType) -> bool {
        self.document_type == document_type
    }

    /// Consolidated purchase-history document produced by receipt enhancement.
    pub fn is_receipt_rollup(&self) -> bool {
        self.is(DocumentType::Receipt)
            && self.extracted_data.get_bool("merged_receipts") == Some(true)
    }

    pub fn is_auto_fetched(&self) -> bool {
        self.extracted_data.get_bool("auto_fetched") == Some(true)
    }

    pub fn searchable_text(&self) -> String {
        let mut text = self.extracted_data.searchable_text();
        if let Some(content) = &self.content {
            text.push_str(&content.to_lowercase());
        }
        text
    }
}

/// Lifecycle of a stored claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Submitted,
    Validated,
}

impl ClaimStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::Validated => "validated",
        }
    }
}

/// A submitted wildfire claim and its evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimPacket {
    pub claim_id: ClaimId,
    pub policy_number: String,
    pub claimant_name: String,
    /// Kept as submitted; see [`ClaimPacket::incident_on`].
    pub incident_date: String,
    pub property_address: String,
    #[serde(default)]
    pub estimated_damage: Option<f64>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Fields enhancement stages must never alter.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimIdentity {
    pub claim_id: ClaimId,
    pub policy_number: String,
    pub claimant_name: String,
    pub incident_date: String,
    pub property_address: String,
    pub estimated_damage: Option<f64>,
}

impl ClaimPacket {
    pub fn incident_on(&self) -> Option<NaiveDate> {
        parse_date(&self.incident_date)
    }

    pub fn days_since_incident(&self, as_of: DateTime<Utc>) -> Option<i64> {
        self.incident_on()
            .map(|incident| (as_of.date_naive() - incident).num_days())
    }

    pub fn documents_of(&self, document_type: DocumentType) -> impl Iterator<Item = &Document> {
        self.documents
            .iter()
            .filter(move |document| document.is(document_type))
    }

    pub fn count_of(&self, document_type: DocumentType) -> usize {
        self.documents_of(document_type).count()
    }

    /// Individual receipts, excluding consolidated rollups.
    pub fn itemized_receipts(&self) -> impl Iterator<Item = &Document> {
        self.documents_of(DocumentType::Receipt)
            .filter(|document| !document.is_receipt_rollup())
    }

    /// Documented spend, counting a rollup in place of the fetched receipts it summarizes.
    pub fn documented_receipt_total(&self) -> ReceiptTotal {
        let has_rollup = self
            .documents_of(DocumentType::Receipt)
            .any(Document::is_receipt_rollup);
        let mut total = ReceiptTotal::default();

        for document in self.documents_of(DocumentType::Receipt) {
            if has_rollup && !document.is_receipt_rollup() && document.is_auto_fetched() {
                continue;
            }
            match document.extracted_data.get_number("total_amount") {
                Some(amount) => {
                    total.amount += amount;
                    total.counted += 1;
                }
                None if document.extracted_data.contains_key("total_amount") => {
                    total.malformed += 1
                }
                None => total.missing += 1,
            }
        }
        total
    }

    pub fn identity(&self) -> ClaimIdentity {
        ClaimIdentity {
            claim_id: self.claim_id.clone(),
            policy_number: self.policy_number.clone(),
            claimant_name: self.claimant_name.clone(),
            incident_date: self.incident_date.clone(),
            property_address: self.property_address.clone(),
            estimated_damage: self.estimated_damage,
        }
    }
}

/// Result of summing receipt amounts across a packet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReceiptTotal {
    pub amount: f64,
    pub counted: usize,
    pub malformed: usize,
    pub missing: usize,
}

impl ReceiptTotal {
    /// Share of the estimated damage backed by receipts.
    pub fn coverage_of(&self, estimated_damage: f64) -> Option<f64> {
        (estimated_damage > 0.0).then(|| self.amount / estimated_damage)
    }
}

/// Spending category inferred from a receipt's merchant and line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MerchantCategory {
    HomeImprovement,
    TemporaryHousing,
    Clothing,
    Electronics,
    Furniture,
    Necessities,
    Other,
}

const HOME_IMPROVEMENT_MERCHANTS: [&str; 7] = [
    "home depot",
    "lowes",
    "lowe's",
    "hardware",
    "menards",
    "84 lumber",
    "ferguson",
];
const HOME_IMPROVEMENT_ITEMS: [&str; 5] = ["lumber", "paint", "tools", "roofing", "drywall"];
const LODGING_MERCHANTS: [&str; 6] = ["hotel", "motel", "inn", "airbnb", "lodging", "extended stay"];
const CLOTHING_MERCHANTS: [&str; 3] = ["clothing", "apparel", "fashion"];
const CLOTHING_ITEMS: [&str; 4] = ["shirt", "pants", "shoes", "jacket"];
const ELECTRONICS_MERCHANTS: [&str; 3] = ["best buy", "electronics", "apple"];
const ELECTRONICS_ITEMS: [&str; 4] = ["laptop", "phone", "tv", "computer"];
const FURNITURE_ITEMS: [&str; 5] = ["furniture", "chair", "table", "bed", "sofa"];
const NECESSITY_MERCHANTS: [&str; 4] = ["grocery", "supermarket", "walmart", "target"];

const RECOVERY_ITEMS: [&str; 33] = [
    "lumber", "plywood", "drywall", "paint", "primer", "roofing", "shingles", "insulation",
    "tools", "generator", "tarp", "plastic sheeting", "cleaning", "detergent", "bleach",
    "disinfectant", "vacuum", "trash bags", "gloves", "mask", "respirator", "purifier",
    "clothing", "shoes", "laptop", "phone", "mattress", "furniture", "cookware", "dishes",
    "toiletries", "medication", "smoke detector",
];
const RECOVERY_MERCHANTS: [&str; 5] = ["home depot", "lowes", "amazon", "walmart", "target"];

impl MerchantCategory {
    pub fn classify(merchant: &str, items: &[String]) -> Self {
        let merchant = merchant.to_lowercase();
        let items = items.join(" ").to_lowercase();

        if mentions_any(&merchant, &HOME_IMPROVEMENT_MERCHANTS)
            || mentions_any(&items, &HOME_IMPROVEMENT_ITEMS)
        {
            MerchantCategory::HomeImprovement
        } else if mentions_any(&merchant, &LODGING_MERCHANTS) {
            MerchantCategory::TemporaryHousing
        } else if mentions_any(&merchant, &CLOTHING_MERCHANTS)
            || mentions_any(&items, &CLOTHING_ITEMS)
        {
            MerchantCategory::Clothing
        } else if mentions_any(&merchant, &ELECTRONICS_MERCHANTS)
            || mentions_any(&items, &ELECTRONICS_ITEMS)
        {
            MerchantCategory::Electronics
        } else if mentions_any(&items, &FURNITURE_ITEMS) {
            MerchantCategory::Furniture
        } else if mentions_any(&merchant, &NECESSITY_MERCHANTS) {
            MerchantCategory::Necessities
        } else {
            MerchantCategory::Other
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            MerchantCategory::HomeImprovement => "home_improvement",
            MerchantCategory::TemporaryHousing => "temporary_housing",
            MerchantCategory::Clothing => "clothing",
            MerchantCategory::Electronics => "electronics",
            MerchantCategory::Furniture => "furniture",
            MerchantCategory::Necessities => "necessities",
            MerchantCategory::Other => "other",
        }
    }
}

/// Whether a purchase plausibly belongs to wildfire recovery spending.
pub fn is_recovery_purchase(merchant: &str, items: &[String]) -> bool {
    let category = MerchantCategory::classify(merchant, items);
    matches!(
        category,
        MerchantCategory::HomeImprovement
            | MerchantCategory::TemporaryHousing
            | MerchantCategory::Clothing
            | MerchantCategory::Electronics
    ) || mentions_any(&merchant.to_lowercase(), &RECOVERY_MERCHANTS)
        || mentions_any(&items.join(" ").to_lowercase(), &RECOVERY_ITEMS)
}

/// Keyword match over lower-cased text.
///
/// Single-word keywords match word prefixes, so `burn` matches `burned` but `inn`
/// does not match `dinner`. Keywords containing spaces or punctuation match as
/// substrings.
pub fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| {
        if keyword.chars().all(char::is_alphanumeric) {
            text.split(|ch: char| !ch.is_alphanumeric())
                .any(|word| word.starts_with(keyword))
        } else {
            text.contains(keyword)
        }
    })
}
