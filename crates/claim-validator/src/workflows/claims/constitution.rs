use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Grouping used for reporting and for the category-ordered evaluation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Completeness,
    DamageAssessment,
    DocumentationQuality,
    TemporalValidation,
    GeographicValidation,
    PolicyCompliance,
    FinancialValidation,
}

impl RuleCategory {
    pub const ORDERED: [RuleCategory; 7] = [
        RuleCategory::Completeness,
        RuleCategory::DamageAssessment,
        RuleCategory::DocumentationQuality,
        RuleCategory::TemporalValidation,
        RuleCategory::GeographicValidation,
        RuleCategory::PolicyCompliance,
        RuleCategory::FinancialValidation,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RuleCategory::Completeness => "completeness",
            RuleCategory::DamageAssessment => "damage_assessment",
            RuleCategory::DocumentationQuality => "documentation_quality",
            RuleCategory::TemporalValidation => "temporal_validation",
            RuleCategory::GeographicValidation => "geographic_validation",
            RuleCategory::PolicyCompliance => "policy_compliance",
            RuleCategory::FinancialValidation => "financial_validation",
        }
    }
}

/// Static definition of a single weighted rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    pub description: String,
    pub weight: f64,
    pub required: bool,
    pub category: RuleCategory,
}

/// Immutable, versioned rule set every evaluation is measured against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleConstitution {
    version: String,
    rules: Vec<RuleDefinition>,
    fraud_indicators: Vec<String>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConstitutionError {
    #[error("constitution must define at least one rule")]
    Empty,
    #[error("rule {0} is defined more than once")]
    DuplicateRule(String),
    #[error("rule {rule_id} has weight {weight}, expected a value in (0, 1]")]
    InvalidWeight { rule_id: String, weight: f64 },
}

type RuleRow = (&'static str, RuleCategory, &'static str, f64, bool);

const WILDFIRE_RULES: [RuleRow; 47] = {
    use RuleCategory::*;
    [
        ("COMP_001", Completeness, "Property photos must show both pre-fire condition AND post-fire damage", 0.15, true),
        ("COMP_002", Completeness, "All replacement items >$100 require receipt or proof of purchase", 0.12, true),
        ("COMP_003", Completeness, "All expenses must be within policy coverage period", 0.18, true),
        ("COMP_004", Completeness, "Policy documentation must be present and valid", 0.10, true),
        ("COMP_005", Completeness, "Fire department incident report must be provided", 0.08, true),
        ("COMP_006", Completeness, "Evacuation orders or warnings must be documented", 0.06, false),
        ("COMP_007", Completeness, "Property deed or ownership proof required", 0.05, true),
        ("COMP_008", Completeness, "Utility disconnection notices if applicable", 0.03, false),
        ("COMP_009", Completeness, "Temporary housing receipts for additional living expenses", 0.04, false),
        ("COMP_010", Completeness, "Professional damage assessment or contractor estimates", 0.07, true),
        ("COMP_011", Completeness, "Inventory list of damaged/destroyed personal property", 0.06, true),
        ("COMP_012", Completeness, "Weather reports confirming fire conditions on incident date", 0.04, false),
        ("DAMAGE_001", DamageAssessment, "Damage must be directly attributable to wildfire", 0.20, true),
        ("DAMAGE_002", DamageAssessment, "Replacement costs must align with local market rates", 0.08, false),
        ("DAMAGE_003", DamageAssessment, "Structural damage consistent with fire/heat exposure", 0.12, true),
        ("DAMAGE_004", DamageAssessment, "Smoke damage patterns must be consistent with wildfire", 0.08, false),
        ("DAMAGE_005", DamageAssessment, "No evidence of pre-existing damage being claimed", 0.10, true),
        ("DAMAGE_006", DamageAssessment, "Damage timeline consistent with fire progression", 0.06, true),
        ("DAMAGE_007", DamageAssessment, "Heat damage patterns match wildfire characteristics", 0.05, false),
        ("DAMAGE_008", DamageAssessment, "Ash and debris evidence consistent with wildfire", 0.04, false),
        ("DAMAGE_009", DamageAssessment, "Neighboring property damage supports claim", 0.03, false),
        ("DAMAGE_010", DamageAssessment, "No evidence of arson or intentional fire setting", 0.15, true),
        ("DOC_001", DocumentationQuality, "Photos must be clear, dated, and show full context", 0.07, false),
        ("DOC_002", DocumentationQuality, "Receipts must be legible with clear merchant, date, and items", 0.10, true),
        ("DOC_003", DocumentationQuality, "Documents must be original or certified copies", 0.05, true),
        ("DOC_004", DocumentationQuality, "Photo metadata must be intact and verifiable", 0.04, false),
        ("DOC_005", DocumentationQuality, "Multiple angles of damage must be documented", 0.06, true),
        ("DOC_006", DocumentationQuality, "Before and after photos must show same perspectives", 0.05, false),
        ("TIME_001", TemporalValidation, "Claim filed within policy-specified timeframe", 0.12, true),
        ("TIME_002", TemporalValidation, "Purchases made after incident date are valid", 0.08, true),
        ("TIME_003", TemporalValidation, "Emergency expenses incurred within reasonable timeframe", 0.05, false),
        ("TIME_004", TemporalValidation, "Contractor estimates obtained within 30 days of incident", 0.04, false),
        ("TIME_005", TemporalValidation, "No suspicious pre-incident activity patterns", 0.10, true),
        ("GEO_001", GeographicValidation, "Property location within confirmed fire perimeter", 0.15, true),
        ("GEO_002", GeographicValidation, "Evacuation zone matches property address", 0.08, false),
        ("GEO_003", GeographicValidation, "Wind patterns support fire spread to property", 0.05, false),
        ("GEO_004", GeographicValidation, "Topography consistent with fire behavior", 0.04, false),
        ("POLICY_001", PolicyCompliance, "Claim amount within policy limits", 0.12, true),
        ("POLICY_002", PolicyCompliance, "Deductible properly calculated and applied", 0.08, true),
        ("POLICY_003", PolicyCompliance, "Coverage effective on incident date", 0.15, true),
        ("POLICY_004", PolicyCompliance, "No policy exclusions apply to claimed damages", 0.10, true),
        ("POLICY_005", PolicyCompliance, "Premium payments current at time of loss", 0.08, true),
        ("FIN_001", FinancialValidation, "Claimed amounts supported by documentation", 0.12, true),
        ("FIN_002", FinancialValidation, "No duplicate claims across multiple policies", 0.10, true),
        ("FIN_003", FinancialValidation, "Depreciation properly calculated for personal property", 0.06, false),
        ("FIN_004", FinancialValidation, "Labor costs align with local market rates", 0.05, false),
        ("FIN_005", FinancialValidation, "Material costs verified against supplier pricing", 0.04, false),
    ]
};

const WILDFIRE_FRAUD_INDICATORS: [&str; 15] = [
    "Receipts dated before incident date",
    "Duplicate receipts across multiple claims",
    "Unusual purchasing patterns",
    "Mismatched locations and incident area",
    "Excessive luxury item purchases",
    "Multiple claims filed simultaneously",
    "Inconsistent damage descriptions",
    "Suspicious contractor relationships",
    "Inflated replacement cost estimates",
    "Missing or altered photo metadata",
    "Claim filed immediately after policy purchase",
    "Previous fraud history on record",
    "Inconsistent witness statements",
    "Unusual payment method patterns",
    "Backdated receipts or invoices",
];

impl RuleConstitution {
    pub const WILDFIRE_V1: &'static str = "wildfire-v1";

    /// The 47-rule wildfire constitution.
    pub fn wildfire_v1() -> Self {
        Self {
            version: Self::WILDFIRE_V1.to_string(),
            rules: WILDFIRE_RULES
                .iter()
                .map(|(id, category, description, weight, required)| RuleDefinition {
                    id: (*id).to_string(),
                    description: (*description).to_string(),
                    weight: *weight,
                    required: *required,
                    category: *category,
                })
                .collect(),
            fraud_indicators: WILDFIRE_FRAUD_INDICATORS
                .iter()
                .map(|indicator| (*indicator).to_string())
                .collect(),
        }
    }

    pub fn new(
        version: impl Into<String>,
        rules: Vec<RuleDefinition>,
        fraud_indicators: Vec<String>,
    ) -> Result<Self, ConstitutionError> {
        if rules.is_empty() {
            return Err(ConstitutionError::Empty);
        }

        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(ConstitutionError::DuplicateRule(rule.id.clone()));
            }
            if !(rule.weight > 0.0 && rule.weight <= 1.0) {
                return Err(ConstitutionError::InvalidWeight {
                    rule_id: rule.id.clone(),
                    weight: rule.weight,
                });
            }
        }

        Ok(Self {
            version: version.into(),
            rules,
            fraud_indicators,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule(&self, id: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub fn rules_in(&self, category: RuleCategory) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.iter().filter(move |rule| rule.category == category)
    }

    pub fn total_weight(&self) -> f64 {
        self.rules.iter().map(|rule| rule.weight).sum()
    }

    /// Reference catalog of fraud patterns, shared with external judgment prompts.
    pub fn fraud_indicator_catalog(&self) -> &[String] {
        &self.fraud_indicators
    }
}
