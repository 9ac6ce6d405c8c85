//! Injection-safe SQL fragment compilation.
//!
//! This module turns declarative filter and metric definitions into SQL
//! fragments for the embedded analytical engine:
//!
//! - [`token`] - typed tokens and the stream they serialize from
//! - [`filter`] - atomic filter conditions (column / operator / value)
//! - [`metric`] - named aggregations, optionally filtered
//!
//! Two rules keep the output injection-safe: identifiers must pass the
//! identifier gate before they are ever rendered, and every user value
//! goes through a literal token that owns its escaping.

pub mod filter;
pub mod metric;
pub mod token;

pub use filter::{
    compile_filter, compile_filters, FilterExpr, FilterOp, FilterValue, RelativeTime, ScalarValue,
    TimeDirection, TimeUnit,
};
pub use metric::{
    compile_metric, compile_metrics, merge_metrics, metric_source, Aggregation, CompiledMetric,
    MetricDefinition, MetricSource,
};
pub use token::{Token, TokenStream};

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while compiling a filter or metric.
///
/// Every variant is fatal to the single compilation call that raised it;
/// compilation is never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// Identifier failed the identifier gate and was never interpolated.
    #[error("invalid identifier '{0}': only letters, digits, underscores and CJK characters are allowed")]
    InvalidColumn(String),

    /// Operator received a value of the wrong shape.
    #[error("type mismatch for operator '{op}': {expected}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
    },

    /// Operator/value combination outside the supported set.
    #[error("unsupported operator '{op}' for {value_kind} value")]
    UnsupportedOperator {
        op: &'static str,
        value_kind: &'static str,
    },

    /// Aggregation requires a column but the definition has none.
    #[error("aggregation '{0}' requires a column")]
    MissingColumn(&'static str),
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// Identifier gate
// ============================================================================

/// Accepts ASCII alphanumerics, underscores and CJK ideographs. Nothing
/// else ever reaches the generated SQL as an identifier.
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\x{4e00}-\x{9fa5}]+$").expect("identifier regex"));

/// Check a single identifier against the gate.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Validate an identifier, returning it for interpolation.
pub fn ensure_identifier(name: &str) -> CompileResult<&str> {
    if is_valid_identifier(name) {
        Ok(name)
    } else {
        Err(CompileError::InvalidColumn(name.to_string()))
    }
}

/// Validate a table reference. Each dot-separated segment must pass the
/// identifier gate, so `analytics.orders` is accepted but a segment with
/// quotes or whitespace is not.
pub fn ensure_table_name(name: &str) -> CompileResult<&str> {
    if !name.is_empty() && name.split('.').all(is_valid_identifier) {
        Ok(name)
    } else {
        Err(CompileError::InvalidColumn(name.to_string()))
    }
}
