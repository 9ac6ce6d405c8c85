//! Filter compilation - one atomic condition to one SQL boolean fragment.
//!
//! A [`FilterExpr`] is the declarative form a skill configuration stores:
//! a column, a closed operator, and a literal or relative-time value. The
//! compiler rejects anything outside that closed set instead of guessing.

use serde::{Deserialize, Serialize};

use super::token::{Token, TokenStream};
use super::{ensure_identifier, CompileError, CompileResult};

// ============================================================================
// Filter model
// ============================================================================

/// One atomic filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    /// Column the condition applies to. Must pass the identifier gate.
    pub column: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Literal or relative-time value.
    pub value: FilterValue,
}

/// The closed operator set. Every variant must be handled at every
/// compile site - there is no fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
    #[serde(rename = "contains")]
    Contains,
}

impl FilterOp {
    /// The six plain comparison operators.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            FilterOp::Eq | FilterOp::Ne | FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte
        )
    }

    /// Operator spelling as it appears in filter definitions.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::In => "in",
            FilterOp::NotIn => "not_in",
            FilterOp::Contains => "contains",
        }
    }
}

/// A single literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

/// The value side of a filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// "N units ago/hence" relative to evaluation time. Never a literal
    /// date: the engine resolves `CURRENT_TIMESTAMP` at query time.
    Relative(RelativeTime),
    Scalar(ScalarValue),
    List(Vec<ScalarValue>),
}

/// Relative-time value, tagged `"kind": "relative_time"` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "relative_time")]
pub struct RelativeTime {
    pub unit: TimeUnit,
    pub amount: u32,
    pub direction: TimeDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeUnit {
    fn interval_keyword(self) -> &'static str {
        match self {
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Quarter => "quarter",
            TimeUnit::Year => "year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeDirection {
    Past,
    Future,
}

// ============================================================================
// Compilation
// ============================================================================

/// Compile one filter into a SQL boolean fragment.
///
/// # Errors
///
/// - [`CompileError::InvalidColumn`] when the column fails the
///   identifier gate.
/// - [`CompileError::TypeMismatch`] when `in`/`not_in` receives a
///   non-array (or empty) value, or `contains` a non-string.
/// - [`CompileError::UnsupportedOperator`] for every other illegal
///   operator/value combination.
pub fn compile_filter(filter: &FilterExpr) -> CompileResult<String> {
    let column = ensure_identifier(&filter.column)?;

    match (filter.op, &filter.value) {
        (op, FilterValue::Relative(rt)) => {
            if op.is_comparison() {
                compile_relative(column, rt)
            } else {
                Err(CompileError::UnsupportedOperator {
                    op: op.as_str(),
                    value_kind: "relative time",
                })
            }
        }
        (FilterOp::In, FilterValue::List(items)) => compile_in_list(column, items, false),
        (FilterOp::NotIn, FilterValue::List(items)) => compile_in_list(column, items, true),
        (FilterOp::In, _) | (FilterOp::NotIn, _) => Err(CompileError::TypeMismatch {
            op: filter.op.as_str(),
            expected: "an array value",
        }),
        (FilterOp::Contains, FilterValue::Scalar(ScalarValue::String(s))) => {
            Ok(compile_contains(column, s))
        }
        (FilterOp::Contains, _) => Err(CompileError::TypeMismatch {
            op: "contains",
            expected: "a string value",
        }),
        (op, FilterValue::Scalar(v)) => compile_comparison(column, op, v),
        (op, FilterValue::List(_)) => Err(CompileError::UnsupportedOperator {
            op: op.as_str(),
            value_kind: "array",
        }),
    }
}

/// Compile a list of filters joined with `AND`. Empty input compiles to
/// nothing (`None`), not to an always-true clause.
pub fn compile_filters(filters: &[FilterExpr]) -> CompileResult<Option<String>> {
    if filters.is_empty() {
        return Ok(None);
    }
    let parts = filters
        .iter()
        .map(compile_filter)
        .collect::<CompileResult<Vec<_>>>()?;
    Ok(Some(parts.join(" AND ")))
}

fn scalar_token(op: FilterOp, value: &ScalarValue) -> CompileResult<Token> {
    match value {
        ScalarValue::Int(n) => Ok(Token::LitInt(*n)),
        ScalarValue::Float(f) => {
            if f.is_finite() {
                Ok(Token::LitFloat(*f))
            } else {
                Err(CompileError::TypeMismatch {
                    op: op.as_str(),
                    expected: "a finite number",
                })
            }
        }
        ScalarValue::Bool(b) => Ok(Token::LitBool(*b)),
        ScalarValue::String(s) => Ok(Token::LitString(s.clone())),
    }
}

fn comparison_token(op: FilterOp) -> Token {
    match op {
        FilterOp::Eq => Token::Eq,
        FilterOp::Ne => Token::Ne,
        FilterOp::Gt => Token::Gt,
        FilterOp::Gte => Token::Gte,
        FilterOp::Lt => Token::Lt,
        FilterOp::Lte => Token::Lte,
        // Callers dispatch in/not_in/contains before reaching here.
        FilterOp::In | FilterOp::NotIn | FilterOp::Contains => {
            unreachable!("not a comparison operator")
        }
    }
}

fn compile_comparison(column: &str, op: FilterOp, value: &ScalarValue) -> CompileResult<String> {
    let mut ts = TokenStream::new();
    ts.push(Token::Ident(column.to_string()))
        .space()
        .push(comparison_token(op))
        .space()
        .push(scalar_token(op, value)?);
    Ok(ts.serialize())
}

fn compile_in_list(column: &str, items: &[ScalarValue], negated: bool) -> CompileResult<String> {
    let op = if negated { FilterOp::NotIn } else { FilterOp::In };
    if items.is_empty() {
        return Err(CompileError::TypeMismatch {
            op: op.as_str(),
            expected: "a non-empty array value",
        });
    }

    let mut ts = TokenStream::new();
    ts.push(Token::Ident(column.to_string())).space();
    if negated {
        ts.push(Token::Not).space();
    }
    ts.push(Token::In).space().lparen();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        ts.push(scalar_token(op, item)?);
    }
    ts.rparen();
    Ok(ts.serialize())
}

fn compile_contains(column: &str, needle: &str) -> String {
    let mut ts = TokenStream::new();
    ts.push(Token::Ident(column.to_string()))
        .space()
        .push(Token::Like)
        .space()
        .push(Token::LitString(format!("%{}%", needle)));
    ts.serialize()
}

/// The comparator is decided by `direction`, not by the supplied
/// operator: past means "on or after now minus the interval", future
/// means "on or before now plus the interval". The operator has already
/// been validated to be one of the six comparison operators.
fn compile_relative(column: &str, rt: &RelativeTime) -> CompileResult<String> {
    if rt.amount == 0 {
        return Err(CompileError::TypeMismatch {
            op: "relative_time",
            expected: "a positive amount",
        });
    }

    let interval = format!("INTERVAL '{} {}'", rt.amount, rt.unit.interval_keyword());
    let mut ts = TokenStream::new();
    ts.push(Token::Raw("CAST(".into()))
        .push(Token::Ident(column.to_string()))
        .push(Token::Raw(" AS TIMESTAMP)".into()))
        .space();
    match rt.direction {
        TimeDirection::Past => {
            ts.push(Token::Gte)
                .space()
                .push(Token::Raw("CURRENT_TIMESTAMP".into()))
                .space()
                .push(Token::Minus);
        }
        TimeDirection::Future => {
            ts.push(Token::Lte)
                .space()
                .push(Token::Raw("CURRENT_TIMESTAMP".into()))
                .space()
                .push(Token::Plus);
        }
    }
    ts.space().push(Token::Raw(interval));
    Ok(ts.serialize())
}
