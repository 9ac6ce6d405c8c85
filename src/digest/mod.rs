//! Bounded textual digest of a table's skill configuration.
//!
//! The digest is injected into an LLM prompt, so it has a hard character
//! budget. The field mapping is always rendered in full (small,
//! high-value); filters and metrics are cut to their Top-N/Top-K in
//! insertion order with a `+K more...` line; and the final assembled
//! string is hard-truncated as a whole - a long field mapping can starve
//! the other sections, which is the intended precedence.

use serde::{Deserialize, Serialize};

use crate::sql::filter::{FilterExpr, FilterValue, RelativeTime, ScalarValue, TimeDirection};
use crate::sql::metric::MetricDefinition;

/// Marker appended when the digest was cut at the character budget.
const TRUNCATION_MARKER: &str = "... (truncated)";

// ============================================================================
// Configuration shapes
// ============================================================================

/// One field-mapping entry: a physical column and its business meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapEntry {
    pub column: String,
    pub meaning: String,
}

/// A table's skill configuration: field mapping, default filters and
/// metric definitions, all in user insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillConfig {
    #[serde(default)]
    pub field_mapping: Vec<FieldMapEntry>,
    #[serde(default)]
    pub filters: Vec<FilterExpr>,
    #[serde(default)]
    pub metrics: Vec<(String, MetricDefinition)>,
}

/// Digest budget knobs, loaded from the `[digest]` settings section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestLimits {
    /// Hard character budget for the assembled digest.
    pub max_chars: usize,
    /// Filters kept before the `+K more...` cutoff.
    pub max_filters: usize,
    /// Metrics kept before the `+K more...` cutoff.
    pub max_metrics: usize,
}

impl Default for DigestLimits {
    fn default() -> Self {
        Self {
            max_chars: 2000,
            max_filters: 5,
            max_metrics: 10,
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render the configuration digest, honoring the Top-N/Top-K cutoffs and
/// the whole-string character budget.
pub fn render_digest(config: &SkillConfig, limits: &DigestLimits) -> String {
    let mut out = String::new();

    if !config.field_mapping.is_empty() {
        out.push_str("[Field Mapping]\n");
        for entry in &config.field_mapping {
            out.push_str(&format!("  {}: {}\n", entry.column, entry.meaning));
        }
    }

    if !config.filters.is_empty() {
        out.push_str("[Filters]\n");
        for filter in config.filters.iter().take(limits.max_filters) {
            out.push_str(&format!("  {}\n", describe_filter(filter)));
        }
        if config.filters.len() > limits.max_filters {
            out.push_str(&format!(
                "  +{} more...\n",
                config.filters.len() - limits.max_filters
            ));
        }
    }

    if !config.metrics.is_empty() {
        out.push_str("[Metrics]\n");
        for (name, metric) in config.metrics.iter().take(limits.max_metrics) {
            out.push_str(&format!("  {}: {}\n", name, describe_metric(metric)));
        }
        if config.metrics.len() > limits.max_metrics {
            out.push_str(&format!(
                "  +{} more...\n",
                config.metrics.len() - limits.max_metrics
            ));
        }
    }

    truncate_digest(out, limits.max_chars)
}

/// Pure budget predicate: does the digest fit `limit` characters?
pub fn check_digest_budget(digest: &str, limit: usize) -> bool {
    digest.chars().count() <= limit
}

/// Hard-truncate the assembled digest, appending the marker only when a
/// cut actually happened. Operates on characters, not bytes - the digest
/// is routinely CJK.
fn truncate_digest(digest: String, max_chars: usize) -> String {
    if check_digest_budget(&digest, max_chars) {
        return digest;
    }
    let mut cut: String = digest.chars().take(max_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Human-readable one-liner for a filter. This is a description for the
/// prompt, not compiled SQL - the digest depends on the shapes only.
fn describe_filter(filter: &FilterExpr) -> String {
    format!(
        "{} {} {}",
        filter.column,
        filter.op.as_str(),
        describe_value(&filter.value)
    )
}

fn describe_value(value: &FilterValue) -> String {
    match value {
        FilterValue::Scalar(s) => describe_scalar(s),
        FilterValue::List(items) => {
            let parts: Vec<String> = items.iter().map(describe_scalar).collect();
            format!("[{}]", parts.join(", "))
        }
        FilterValue::Relative(rt) => describe_relative(rt),
    }
}

fn describe_scalar(scalar: &ScalarValue) -> String {
    match scalar {
        ScalarValue::Int(n) => n.to_string(),
        ScalarValue::Float(f) => f.to_string(),
        ScalarValue::Bool(b) => b.to_string(),
        ScalarValue::String(s) => format!("'{}'", s),
    }
}

fn describe_relative(rt: &RelativeTime) -> String {
    let direction = match rt.direction {
        TimeDirection::Past => "last",
        TimeDirection::Future => "next",
    };
    format!("{} {} {:?}", direction, rt.amount, rt.unit).to_lowercase()
}

fn describe_metric(metric: &MetricDefinition) -> String {
    let base = match &metric.column {
        Some(column) => format!("{}({})", metric.aggregation.as_str(), column),
        None => format!("{}(*)", metric.aggregation.as_str()),
    };
    match metric.filters.len() {
        0 => base,
        1 => format!("{}, 1 condition", base),
        n => format!("{}, {} conditions", base, n),
    }
}
