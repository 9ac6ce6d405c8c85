//! RFM SQL generation.
//!
//! Two paths: pass through pre-computed R/F/M columns, or compute the
//! features from raw order rows. Every identifier interpolated here has
//! passed the identifier gate; literal values are typed (integers,
//! `chrono` dates), so the assembled text cannot carry user input.

use chrono::NaiveDate;
use serde::Serialize;

use super::detect::RfmColumns;
use super::{limits, RfmError, RfmResult};
use crate::sql::{ensure_identifier, ensure_table_name, CompileError, CompileResult};

/// A generated RFM query plus how it was built.
#[derive(Debug, Clone, Serialize)]
pub struct RfmQuery {
    pub sql: String,
    pub is_precomputed: bool,
    /// Whether the query carries the sampling clause. The clause guards
    /// itself with the population threshold, so small datasets keep
    /// every customer.
    pub is_sampled: bool,
    /// Effective sample cap when the clause is present.
    pub sample_size: usize,
}

/// Generate the RFM feature query for a table.
///
/// `sample_size` overrides the configured cap; `baseline_date` replaces
/// the table-wide `MAX(order_date)` recency baseline.
pub fn generate_rfm_sql(
    table: &str,
    columns: &RfmColumns,
    sample_size: Option<usize>,
    baseline_date: Option<NaiveDate>,
) -> CompileResult<RfmQuery> {
    let table = ensure_table_name(table)?;

    if let Some(precomputed) = &columns.precomputed {
        let recency = ensure_identifier(&precomputed.recency)?;
        let frequency = ensure_identifier(&precomputed.frequency)?;
        let monetary = ensure_identifier(&precomputed.monetary)?;

        // No physical id column means the worker still needs stable ids
        // to zip assignments against, so derive one per row.
        let id_expr = match &columns.customer_id {
            Some(id) => format!("CAST({} AS VARCHAR)", ensure_identifier(id)?),
            None => "CAST(ROW_NUMBER() OVER () AS VARCHAR)".to_string(),
        };

        // Monetary and recency must be present and non-negative;
        // frequency is deliberately not filtered.
        let sql = format!(
            "SELECT\n    {id_expr} AS customer_id,\n    CAST({recency} AS DOUBLE) AS recency,\n    CAST({frequency} AS DOUBLE) AS frequency,\n    CAST({monetary} AS DOUBLE) AS monetary\nFROM {table}\nWHERE {recency} IS NOT NULL\n  AND CAST({recency} AS DOUBLE) >= 0\n  AND {monetary} IS NOT NULL\n  AND CAST({monetary} AS DOUBLE) >= 0\nORDER BY customer_id",
        );

        return Ok(RfmQuery {
            sql,
            is_precomputed: true,
            // Sampling never modifies the pre-computed path.
            is_sampled: false,
            sample_size: 0,
        });
    }

    let customer_id = required_identifier(&columns.customer_id, "customer_id")?;
    let order_date = required_identifier(&columns.order_date, "order_date")?;
    let amount = required_identifier(&columns.order_amount, "order_amount")?;

    // Frequency counts distinct orders when an order id was detected,
    // otherwise raw rows.
    let frequency_expr = match &columns.order_id {
        Some(order_id) => format!("COUNT(DISTINCT {})", ensure_identifier(order_id)?),
        None => "COUNT(*)".to_string(),
    };

    let baseline_expr = match baseline_date {
        Some(date) => format!("CAST('{}' AS TIMESTAMP)", date.format("%Y-%m-%d")),
        None => format!("MAX(CAST({order_date} AS TIMESTAMP))"),
    };

    let cap = sample_size.unwrap_or(limits::MAX_SAMPLE_SIZE);
    let threshold = limits::LARGE_DATASET_THRESHOLD;

    let sql = format!(
        "WITH customer_orders AS (\n    SELECT\n        CAST({customer_id} AS VARCHAR) AS customer_id,\n        MAX(CAST({order_date} AS TIMESTAMP)) AS last_order_date,\n        {frequency_expr} AS frequency,\n        SUM(CAST({amount} AS DOUBLE)) AS monetary\n    FROM {table}\n    WHERE {customer_id} IS NOT NULL\n      AND {order_date} IS NOT NULL\n      AND {amount} IS NOT NULL\n      AND CAST({amount} AS DOUBLE) >= 0\n    GROUP BY CAST({customer_id} AS VARCHAR)\n),\nbaseline AS (\n    SELECT {baseline_expr} AS baseline_date FROM {table}\n),\nrfm_clean AS (\n    SELECT\n        c.customer_id,\n        CAST(DATE_DIFF('day', c.last_order_date, b.baseline_date) AS DOUBLE) AS recency,\n        CAST(c.frequency AS DOUBLE) AS frequency,\n        c.monetary AS monetary\n    FROM customer_orders c\n    CROSS JOIN baseline b\n    WHERE CAST(DATE_DIFF('day', c.last_order_date, b.baseline_date) AS DOUBLE) >= 0\n      AND c.monetary >= 0\n),\nsampled AS (\n    SELECT customer_id FROM rfm_clean ORDER BY RANDOM() LIMIT {cap}\n)\nSELECT r.customer_id, r.recency, r.frequency, r.monetary\nFROM rfm_clean r\nWHERE (SELECT COUNT(*) FROM rfm_clean) <= {threshold}\n   OR r.customer_id IN (SELECT customer_id FROM sampled)\nORDER BY r.customer_id",
    );

    Ok(RfmQuery {
        sql,
        is_precomputed: false,
        is_sampled: true,
        sample_size: cap,
    })
}

/// Companion query counting eligible customers, used to gate the full
/// RFM query.
pub fn generate_customer_count_sql(table: &str, columns: &RfmColumns) -> CompileResult<String> {
    let table = ensure_table_name(table)?;

    if let Some(precomputed) = &columns.precomputed {
        let recency = ensure_identifier(&precomputed.recency)?;
        return Ok(format!(
            "SELECT COUNT(*) AS customer_count FROM {table} WHERE {recency} IS NOT NULL"
        ));
    }

    let customer_id = required_identifier(&columns.customer_id, "customer_id")?;
    Ok(format!(
        "SELECT COUNT(DISTINCT {customer_id}) AS customer_count FROM {table} WHERE {customer_id} IS NOT NULL"
    ))
}

/// Check the eligible population against the default minimum.
pub fn validate_customer_count(actual: u64) -> RfmResult<()> {
    validate_customer_count_with(actual, limits::MIN_CUSTOMERS)
}

/// Check the eligible population against an explicit minimum.
pub fn validate_customer_count_with(actual: u64, required: u64) -> RfmResult<()> {
    if actual < required {
        Err(RfmError::InsufficientData { actual, required })
    } else {
        Ok(())
    }
}

fn required_identifier<'a>(
    column: &'a Option<String>,
    role: &'static str,
) -> CompileResult<&'a str> {
    match column {
        Some(name) => ensure_identifier(name),
        None => Err(CompileError::MissingColumn(role)),
    }
}
