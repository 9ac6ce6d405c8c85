//! Hybrid query-type classification.
//!
//! Two methods composed by one router: weighted keyword scoring over the
//! static tables in [`super::keywords`], and an optional external-model
//! fallback that only runs when the keyword result is weak. The router
//! holds no state beyond the optional model handle - classification is a
//! pure function of its input.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::keywords::{
    CHINESE_NUMERALS, GENERAL_DOMAIN_TERMS, INDUSTRY_DOMAIN_TERMS, KEYWORD_TABLE,
    TOP_N_DIGIT_PATTERNS,
};
use super::model::{classify_by_model, ModelClient};
use super::thresholds;

// ============================================================================
// Classification result
// ============================================================================

/// The closed set of analytic intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    KpiSingle,
    KpiGrouped,
    TrendTime,
    Distribution,
    TopN,
    Comparison,
    Unknown,
}

impl QueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::KpiSingle => "kpi_single",
            QueryType::KpiGrouped => "kpi_grouped",
            QueryType::TrendTime => "trend_time",
            QueryType::Distribution => "distribution",
            QueryType::TopN => "topn",
            QueryType::Comparison => "comparison",
            QueryType::Unknown => "unknown",
        }
    }

    /// Parse a model-reported type name, mapping anything unrecognized
    /// to `unknown` rather than failing.
    pub fn parse_lenient(s: &str) -> QueryType {
        match s.trim() {
            "kpi_single" => QueryType::KpiSingle,
            "kpi_grouped" => QueryType::KpiGrouped,
            "trend_time" => QueryType::TrendTime,
            "distribution" => QueryType::Distribution,
            "topn" => QueryType::TopN,
            "comparison" => QueryType::Comparison,
            _ => QueryType::Unknown,
        }
    }
}

/// Which method produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMethod {
    Keyword,
    Model,
}

/// A finished classification. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct QueryTypeClassification {
    pub query_type: QueryType,
    pub confidence: f64,
    pub matched_keywords: Vec<String>,
    pub method: ClassificationMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<u32>,
}

impl QueryTypeClassification {
    pub(crate) fn unknown(method: ClassificationMethod, confidence: f64) -> Self {
        Self {
            query_type: QueryType::Unknown,
            confidence,
            matched_keywords: vec![],
            method,
            top_n: None,
        }
    }
}

// ============================================================================
// Keyword classification
// ============================================================================

/// Classify by weighted keyword scoring.
///
/// Primary hits weigh 2, secondary hits 1, and `kpi_grouped` gets a +0.5
/// boost when it has both kinds of hit (breaking its chronic tie against
/// `kpi_single` over shared stats words). Score ties keep the first type
/// in table-declaration order.
pub fn classify_by_keywords(input: &str, industry: Option<&str>) -> QueryTypeClassification {
    let haystack = input.to_lowercase();

    let mut best_score = 0.0f64;
    let mut best: Option<(QueryType, Vec<String>)> = None;

    for entry in KEYWORD_TABLE {
        let mut score = 0.0;
        let mut matched: Vec<String> = Vec::new();
        let mut primary_hit = false;
        let mut secondary_hit = false;

        for kw in entry.primary {
            if haystack.contains(kw) {
                score += thresholds::PRIMARY_WEIGHT;
                primary_hit = true;
                matched.push((*kw).to_string());
            }
        }
        for kw in entry.secondary {
            if haystack.contains(kw) {
                score += thresholds::SECONDARY_WEIGHT;
                secondary_hit = true;
                matched.push((*kw).to_string());
            }
        }

        if entry.query_type == QueryType::KpiGrouped && primary_hit && secondary_hit {
            score += thresholds::GROUPED_TIEBREAK_BOOST;
        }

        if score > best_score {
            best_score = score;
            best = Some((entry.query_type, matched));
        }
    }

    let (query_type, matched_keywords) = match best {
        Some(found) if best_score > 0.0 => found,
        _ => return QueryTypeClassification::unknown(ClassificationMethod::Keyword, 0.0),
    };

    let domain_hit = has_domain_term(&haystack, industry);
    let confidence = keyword_confidence(best_score, domain_hit);

    let top_n = if query_type == QueryType::TopN {
        extract_top_n(input)
    } else {
        None
    };

    QueryTypeClassification {
        query_type,
        confidence,
        matched_keywords,
        method: ClassificationMethod::Keyword,
        top_n,
    }
}

fn keyword_confidence(score: f64, domain_hit: bool) -> f64 {
    if score >= thresholds::STRONG_SCORE || (score >= thresholds::MODERATE_SCORE && domain_hit) {
        if domain_hit {
            1.0
        } else {
            0.9
        }
    } else if score >= thresholds::MODERATE_SCORE {
        0.75
    } else {
        0.6
    }
}

fn has_domain_term(haystack: &str, industry: Option<&str>) -> bool {
    let industry_hit = match industry {
        Some(name) => {
            let name = name.to_lowercase();
            INDUSTRY_DOMAIN_TERMS
                .iter()
                .filter(|(key, _)| *key == name)
                .any(|(_, terms)| terms.iter().any(|t| haystack.contains(t)))
        }
        // No industry given: search every industry's terms.
        None => INDUSTRY_DOMAIN_TERMS
            .iter()
            .any(|(_, terms)| terms.iter().any(|t| haystack.contains(t))),
    };

    industry_hit || GENERAL_DOMAIN_TERMS.iter().any(|t| haystack.contains(t))
}

/// Extract a literal count from a top-N query. Digit forms (`top N`,
/// `前N`) take priority over the Chinese numeral table; the first match
/// wins and multiple numerals are never aggregated.
pub fn extract_top_n(input: &str) -> Option<u32> {
    for pattern in TOP_N_DIGIT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(input) {
            if let Ok(n) = caps[1].parse::<u32>() {
                return Some(n);
            }
        }
    }

    for (word, value) in CHINESE_NUMERALS {
        if input.contains(word) {
            return Some(*value);
        }
    }

    None
}

// ============================================================================
// Router
// ============================================================================

/// Composes keyword classification with the optional model fallback.
pub struct QueryTypeRouter {
    model: Option<Arc<dyn ModelClient>>,
    confidence_floor: f64,
}

impl Default for QueryTypeRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryTypeRouter {
    /// Keyword-only router.
    pub fn new() -> Self {
        Self {
            model: None,
            confidence_floor: thresholds::MODEL_FLOOR,
        }
    }

    /// Router with a model fallback for weak keyword results.
    pub fn with_model(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model: Some(model),
            confidence_floor: thresholds::MODEL_FLOOR,
        }
    }

    /// Classify a natural-language query.
    ///
    /// The keyword result is final when it is confident enough or no
    /// model is configured. Otherwise both methods run and the higher
    /// confidence wins, with the keyword result winning ties - a model
    /// answer must be strictly better to replace it.
    pub async fn classify(
        &self,
        input: &str,
        industry: Option<&str>,
        schema_digest: Option<&str>,
    ) -> QueryTypeClassification {
        let keyword = classify_by_keywords(input, industry);

        let model = match &self.model {
            Some(model) if keyword.confidence < self.confidence_floor => model,
            _ => return keyword,
        };

        let fallback = classify_by_model(model.as_ref(), input, schema_digest).await;
        if fallback.confidence > keyword.confidence {
            fallback
        } else {
            keyword
        }
    }
}
