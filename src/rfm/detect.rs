//! Heuristic column-role detection for RFM analysis.
//!
//! Detection is a pure function of the column-name list
//! (case-insensitive). Pre-computed R/F/M columns always win over
//! raw-order detection; otherwise each role is resolved by scanning its
//! pattern tiers in order, pattern by pattern across all columns, first
//! match wins.

use serde::{Deserialize, Serialize};

use super::patterns::{
    PatternTier, AMOUNT_EXACT_PATTERNS, AMOUNT_EXCLUDE_FRAGMENTS, AMOUNT_EXCLUDE_SUFFIXES,
    AMOUNT_FUZZY_PATTERNS, CUSTOMER_ID_TIERS, CUSTOMER_WORDS, ID_SUFFIXES, ORDER_DATE_TIERS,
    ORDER_ID_TIERS, PRECOMPUTED_RFM, TIME_PATTERNS,
};
use super::{RfmError, RfmResult};

// ============================================================================
// Schema input
// ============================================================================

/// Column metadata as reported by the engine (DESCRIBE or
/// information_schema). Only the name participates in detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(default)]
    pub data_type: Option<String>,
}

/// Table metadata handed to detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnMeta>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            columns: columns
                .iter()
                .map(|name| ColumnMeta {
                    name: (*name).to_string(),
                    data_type: None,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Detection result
// ============================================================================

/// Pre-computed R/F/M column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecomputedRfm {
    pub recency: String,
    pub frequency: String,
    pub monetary: String,
}

/// Per-field detection confidence, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConfidence {
    pub customer_id: f64,
    pub order_id: f64,
    pub order_date: f64,
    pub order_amount: f64,
}

/// Detected column roles. Produced fresh per inspection, immutable once
/// returned, never merged across tables.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RfmColumns {
    pub customer_id: Option<String>,
    pub order_id: Option<String>,
    pub order_date: Option<String>,
    pub order_amount: Option<String>,
    pub confidence: FieldConfidence,
    /// Populated only when all three pre-computed columns were found, in
    /// which case the raw-order fields above stay `None`.
    pub precomputed: Option<PrecomputedRfm>,
}

impl RfmColumns {
    pub fn is_precomputed(&self) -> bool {
        self.precomputed.is_some()
    }
}

// ============================================================================
// Detection
// ============================================================================

/// Detect RFM column roles from table metadata.
pub fn detect_rfm_columns(schema: &TableSchema) -> RfmColumns {
    // (lowercased, original) pairs, scanned in schema order.
    let columns: Vec<(String, &str)> = schema
        .columns
        .iter()
        .map(|c| (c.name.to_lowercase(), c.name.as_str()))
        .collect();

    let mut detected = RfmColumns::default();

    // The fetch path needs an id to zip cluster assignments, so customer
    // id is resolved on both paths.
    if let Some((name, confidence)) = detect_customer_id(&columns) {
        detected.customer_id = Some(name);
        detected.confidence.customer_id = confidence;
    }

    // Step 1: pre-computed R/F/M wins over raw-order detection, even
    // when raw order columns are also present.
    if let Some(precomputed) = detect_precomputed(&columns) {
        detected.precomputed = Some(precomputed);
        return detected;
    }

    // Step 2: raw-order roles.
    if let Some((name, confidence)) = match_tiers(&columns, ORDER_ID_TIERS) {
        detected.order_id = Some(name);
        detected.confidence.order_id = confidence;
    }
    if let Some((name, confidence)) = match_tiers(&columns, ORDER_DATE_TIERS) {
        detected.order_date = Some(name);
        detected.confidence.order_date = confidence;
    }
    if let Some((name, confidence)) = detect_amount(&columns) {
        detected.order_amount = Some(name);
        detected.confidence.order_amount = confidence;
    }

    detected
}

/// Validate that detection found enough to run RFM analysis. All three
/// pre-computed columns always validate; otherwise customer id, order
/// date and order amount are required and the error names exactly the
/// missing ones.
pub fn validate_rfm_columns(columns: &RfmColumns) -> RfmResult<()> {
    if columns.is_precomputed() {
        return Ok(());
    }

    let mut missing = Vec::new();
    if columns.customer_id.is_none() {
        missing.push("customer_id");
    }
    if columns.order_date.is_none() {
        missing.push("order_date");
    }
    if columns.order_amount.is_none() {
        missing.push("order_amount");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(RfmError::MissingRequiredColumns(missing))
    }
}

fn detect_precomputed(columns: &[(String, &str)]) -> Option<PrecomputedRfm> {
    let find = |feature: &str| {
        columns
            .iter()
            .find(|(lower, _)| lower == feature || lower.contains(feature))
            .map(|(_, original)| (*original).to_string())
    };

    Some(PrecomputedRfm {
        recency: find(PRECOMPUTED_RFM[0])?,
        frequency: find(PRECOMPUTED_RFM[1])?,
        monetary: find(PRECOMPUTED_RFM[2])?,
    })
}

/// Scan tiers in order; within a tier, each pattern is searched across
/// all columns before the next pattern is tried.
fn match_tiers(columns: &[(String, &str)], tiers: &[PatternTier]) -> Option<(String, f64)> {
    for tier in tiers {
        for pattern in tier.patterns {
            for (lower, original) in columns {
                if lower.contains(pattern) {
                    return Some(((*original).to_string(), tier.confidence));
                }
            }
        }
    }
    None
}

fn detect_customer_id(columns: &[(String, &str)]) -> Option<(String, f64)> {
    if let Some(found) = match_tiers(columns, CUSTOMER_ID_TIERS) {
        return Some(found);
    }

    // Generic tier: a customer-like word combined with an id-like suffix.
    for word in CUSTOMER_WORDS {
        for (lower, original) in columns {
            if lower.contains(word) && ID_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
                return Some(((*original).to_string(), 0.6));
            }
        }
    }
    None
}

fn detect_amount(columns: &[(String, &str)]) -> Option<(String, f64)> {
    // Tier 1: precise terms, equality match, short-circuit at 1.0.
    for pattern in AMOUNT_EXACT_PATTERNS {
        for (lower, original) in columns {
            if lower == pattern {
                return Some(((*original).to_string(), 1.0));
            }
        }
    }

    // Tier 2: fuzzy fragments filtered by the exclusion lists.
    for pattern in AMOUNT_FUZZY_PATTERNS {
        for (lower, original) in columns {
            if lower.contains(pattern) && !is_amount_excluded(lower) {
                return Some(((*original).to_string(), 0.8));
            }
        }
    }

    None
}

fn is_amount_excluded(lower: &str) -> bool {
    AMOUNT_EXCLUDE_SUFFIXES.iter().any(|s| lower.ends_with(s))
        || AMOUNT_EXCLUDE_FRAGMENTS.iter().any(|f| lower.contains(f))
        || TIME_PATTERNS.iter().any(|t| lower.contains(t))
}
