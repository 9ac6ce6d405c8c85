//! RFM feature extraction: column-role detection and SQL generation.
//!
//! - [`patterns`] - static, versioned pattern tables (data only)
//! - [`detect`] - tiered first-match role detection
//! - [`sql`] - pass-through or computed RFM queries with deterministic
//!   sampling
//!
//! RFM features are per-customer: recency (days since last order),
//! frequency (order count) and monetary (total spend).

pub mod detect;
pub mod patterns;
pub mod sql;

pub use detect::{
    detect_rfm_columns, validate_rfm_columns, ColumnMeta, FieldConfidence, PrecomputedRfm,
    RfmColumns, TableSchema,
};
pub use sql::{
    generate_customer_count_sql, generate_rfm_sql, validate_customer_count,
    validate_customer_count_with, RfmQuery,
};

/// Data-quality errors surfaced to the caller as user-facing guidance.
/// Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RfmError {
    /// Detection could not resolve the required column roles.
    #[error("missing required columns for RFM analysis: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<&'static str>),

    /// Too few customers to segment.
    #[error("insufficient data: found {actual} customers, at least {required} are required")]
    InsufficientData { actual: u64, required: u64 },
}

pub type RfmResult<T> = Result<T, RfmError>;

/// Centralized population and sampling limits.
pub mod limits {
    /// Minimum customers required to run a segmentation.
    pub const MIN_CUSTOMERS: u64 = 10;
    /// Populations at or below this size are never sampled.
    pub const LARGE_DATASET_THRESHOLD: u64 = 50_000;
    /// Random-sample cap applied above the threshold.
    pub const MAX_SAMPLE_SIZE: usize = 10_000;
}
