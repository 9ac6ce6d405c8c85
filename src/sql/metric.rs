//! Metric compilation - one named aggregation to one SELECT expression.
//!
//! Metrics come from two places: system defaults shipped with an industry
//! template, and user skill configurations. A user metric with the same
//! name overrides the system one; [`metric_source`] reports which side a
//! name resolves to.

use serde::{Deserialize, Serialize};

use super::filter::{compile_filters, FilterExpr};
use super::token::{Token, TokenStream};
use super::{ensure_identifier, CompileError, CompileResult};

// ============================================================================
// Metric model
// ============================================================================

/// The closed aggregation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    pub fn as_str(self) -> &'static str {
        match self {
            Aggregation::Count => "count",
            Aggregation::CountDistinct => "count_distinct",
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }

    fn function_name(self) -> &'static str {
        match self {
            Aggregation::Count | Aggregation::CountDistinct => "COUNT",
            Aggregation::Sum => "SUM",
            Aggregation::Avg => "AVG",
            Aggregation::Min => "MIN",
            Aggregation::Max => "MAX",
        }
    }

    /// `count` is the only aggregation that works without a column.
    fn requires_column(self) -> bool {
        !matches!(self, Aggregation::Count)
    }
}

/// One named aggregation, optionally filtered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Display label; also the source of the derived alias.
    pub label: String,
    pub aggregation: Aggregation,
    /// Required unless the aggregation is `count`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Conditions folded into the aggregation as `CASE WHEN ... THEN ... END`.
    #[serde(default, rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterExpr>,
}

/// Where a metric name resolves from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricSource {
    /// Defined by the user (overrides a system metric of the same name).
    User,
    /// Defined only by the system template.
    System,
    /// Not defined anywhere.
    None,
}

/// A compiled metric ready for a SELECT list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledMetric {
    pub name: String,
    pub sql: String,
}

// ============================================================================
// Compilation
// ============================================================================

/// Compile one metric into a SQL SELECT expression.
///
/// The alias is the explicit one when given, otherwise the label
/// lowercased with whitespace runs collapsed to `_`. Either way it must
/// pass the identifier gate - the alias is interpolated like any other
/// identifier.
pub fn compile_metric(metric: &MetricDefinition, alias: Option<&str>) -> CompileResult<String> {
    let alias = match alias {
        Some(explicit) => ensure_identifier(explicit)?.to_string(),
        None => {
            let derived = derive_alias(&metric.label);
            ensure_identifier(&derived)?;
            derived
        }
    };

    let column = match (&metric.column, metric.aggregation.requires_column()) {
        (Some(column), requires) => {
            // A plain count aggregates rows, not a column; a supplied
            // column is still validated but never rendered.
            ensure_identifier(column)?;
            requires.then(|| column.clone())
        }
        (None, false) => None,
        (None, true) => return Err(CompileError::MissingColumn(metric.aggregation.as_str())),
    };

    let condition = compile_filters(&metric.filters)?;

    let mut ts = TokenStream::new();
    ts.push(Token::FunctionName(
        metric.aggregation.function_name().into(),
    ))
    .lparen();

    // DISTINCT stays outside the CASE so conditional distinct counts
    // still deduplicate across the surviving rows.
    if metric.aggregation == Aggregation::CountDistinct {
        ts.push(Token::Distinct).space();
    }

    match condition {
        Some(cond) => {
            ts.push(Token::Case)
                .space()
                .push(Token::When)
                .space()
                .push(Token::Raw(cond))
                .space()
                .push(Token::Then)
                .space();
            match &column {
                Some(column) => ts.push(Token::Ident(column.clone())),
                None => ts.push(Token::LitInt(1)),
            };
            ts.space().push(Token::End);
        }
        None => {
            match &column {
                Some(column) => ts.push(Token::Ident(column.clone())),
                None => ts.push(Token::Star),
            };
        }
    }

    ts.rparen()
        .space()
        .push(Token::As)
        .space()
        .push(Token::Ident(alias));
    Ok(ts.serialize())
}

/// Compile a name-ordered metric list, truncating to the first `limit`
/// entries when given. A single failing metric aborts the whole batch.
pub fn compile_metrics(
    metrics: &[(String, MetricDefinition)],
    limit: Option<usize>,
) -> CompileResult<Vec<CompiledMetric>> {
    let cutoff = limit.unwrap_or(metrics.len());
    metrics
        .iter()
        .take(cutoff)
        .map(|(name, metric)| {
            Ok(CompiledMetric {
                name: name.clone(),
                sql: compile_metric(metric, None)?,
            })
        })
        .collect()
}

/// Report which side a metric name resolves from. A name present in both
/// maps is an override and reports as `user`.
pub fn metric_source(
    name: &str,
    system: &[(String, MetricDefinition)],
    user: &[(String, MetricDefinition)],
) -> MetricSource {
    let in_user = user.iter().any(|(n, _)| n == name);
    let in_system = system.iter().any(|(n, _)| n == name);
    if in_user {
        MetricSource::User
    } else if in_system {
        MetricSource::System
    } else {
        MetricSource::None
    }
}

/// Merge system and user metrics: system order is preserved, user
/// definitions replace same-named system ones in place, and user-only
/// metrics are appended in their own order.
pub fn merge_metrics(
    system: &[(String, MetricDefinition)],
    user: &[(String, MetricDefinition)],
) -> Vec<(String, MetricDefinition)> {
    let mut merged: Vec<(String, MetricDefinition)> = system
        .iter()
        .map(|(name, metric)| {
            let resolved = user
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, m)| m)
                .unwrap_or(metric);
            (name.clone(), resolved.clone())
        })
        .collect();

    for (name, metric) in user {
        if !merged.iter().any(|(n, _)| n == name) {
            merged.push((name.clone(), metric.clone()));
        }
    }
    merged
}

fn derive_alias(label: &str) -> String {
    label
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}
