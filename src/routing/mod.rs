//! Query-type routing: keyword scoring with an optional model fallback.
//!
//! The router decides which SQL template family a natural-language
//! question belongs to. Keyword classification is cheap, deterministic
//! and reproducible; the external model only runs when the keyword score
//! is weak, and its answer must be strictly more confident to win.

pub mod keywords;
pub mod model;
pub mod router;

pub use model::{classify_by_model, ChatMessage, ModelClient, ModelError};
pub use router::{
    classify_by_keywords, extract_top_n, ClassificationMethod, QueryType, QueryTypeClassification,
    QueryTypeRouter,
};

/// Centralized scoring weights and confidence thresholds.
///
/// Named constants instead of magic numbers, so the classifier can be
/// tuned without hunting through control flow.
pub mod thresholds {
    /// Weight of a primary keyword hit.
    pub const PRIMARY_WEIGHT: f64 = 2.0;
    /// Weight of a secondary keyword hit.
    pub const SECONDARY_WEIGHT: f64 = 1.0;
    /// Tie-break boost for `kpi_grouped` when it has both a primary and
    /// a secondary hit.
    pub const GROUPED_TIEBREAK_BOOST: f64 = 0.5;

    /// Score at which a keyword result is confident on its own.
    pub const STRONG_SCORE: f64 = 4.0;
    /// Score at which a keyword result is moderately confident.
    pub const MODERATE_SCORE: f64 = 2.0;

    /// Keyword confidence below which the model fallback is consulted.
    pub const MODEL_FLOOR: f64 = 0.7;
    /// Confidence assigned when the model fails or returns garbage.
    pub const MODEL_FAILURE_CONFIDENCE: f64 = 0.3;
    /// Schema-digest characters included in the model prompt.
    pub const MODEL_DIGEST_CHARS: usize = 500;
    /// Sampling temperature for classification calls.
    pub const MODEL_TEMPERATURE: f32 = 0.1;
    /// Completion budget for classification calls.
    pub const MODEL_MAX_TOKENS: u32 = 256;
}
