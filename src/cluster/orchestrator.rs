//! The segmentation analysis pipeline.
//!
//! One request walks the stages `detecting-columns → counting →
//! fetching-rfm → dispatching → awaiting-worker` sequentially - each
//! stage depends on the previous result, so nothing runs concurrently
//! within a request. Concurrent requests share the one worker transport
//! and are kept apart by correlation ids.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::stats::{aggregate_clusters, ClusterMetadata, CustomerRecord};
use super::{ClusterError, ClusterResult};
use crate::config::SegmentationSettings;
use crate::db::{fetch_table_columns, value_as_f64, value_as_id, value_as_u64, Database, Row};
use crate::rfm::{
    detect_rfm_columns, generate_customer_count_sql, generate_rfm_sql, validate_customer_count_with,
    validate_rfm_columns,
};
use crate::sql::ensure_table_name;
use crate::worker::{ClusterBackend, ClusterJob};

// ============================================================================
// Request / result
// ============================================================================

/// How the numeric worker should run the clustering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ComputeStrategy {
    /// GPU only when the population is large enough to amortize it.
    #[default]
    Auto,
    /// Always request GPU.
    Force,
    /// Always request CPU. Any unrecognized strategy string lands here.
    Cpu,
}

impl From<String> for ComputeStrategy {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "auto" => ComputeStrategy::Auto,
            "force" => ComputeStrategy::Force,
            _ => ComputeStrategy::Cpu,
        }
    }
}

/// One segmentation analysis request.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationRequest {
    /// Table holding the order rows or pre-computed features.
    pub table: String,
    /// Overrides the configured sample cap.
    #[serde(default)]
    pub sample_size: Option<usize>,
    /// Recency baseline; defaults to the table-wide latest order date.
    #[serde(default)]
    pub baseline_date: Option<NaiveDate>,
    /// Requested cluster count; defaults to the configured K.
    #[serde(default)]
    pub n_clusters: Option<usize>,
    #[serde(default)]
    pub compute_strategy: ComputeStrategy,
}

impl SegmentationRequest {
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            sample_size: None,
            baseline_date: None,
            n_clusters: None,
            compute_strategy: ComputeStrategy::Auto,
        }
    }
}

/// A finished segmentation analysis.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentationResult {
    /// Correlation id threaded through every stage of this request.
    pub request_id: String,
    pub table: String,
    /// Customers that survived row validation and were clustered.
    pub customer_count: usize,
    /// Rows dropped for unparseable or invalid feature values.
    pub skipped_rows: usize,
    /// Effective cluster count after small-population reduction.
    pub n_clusters: usize,
    pub gpu_used: bool,
    pub is_precomputed: bool,
    pub is_sampled: bool,
    pub clusters: Vec<ClusterMetadata>,
}

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    DetectingColumns,
    Counting,
    FetchingRfm,
    Dispatching,
    AwaitingWorker,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisStage::DetectingColumns => "detecting-columns",
            AnalysisStage::Counting => "counting",
            AnalysisStage::FetchingRfm => "fetching-rfm",
            AnalysisStage::Dispatching => "dispatching",
            AnalysisStage::AwaitingWorker => "awaiting-worker",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs segmentation analyses against an analytical engine and a
/// clustering backend, both owned by the caller.
pub struct ClusteringOrchestrator {
    db: Arc<dyn Database>,
    backend: Arc<dyn ClusterBackend>,
    settings: SegmentationSettings,
}

impl ClusteringOrchestrator {
    pub fn new(db: Arc<dyn Database>, backend: Arc<dyn ClusterBackend>) -> Self {
        Self::with_settings(db, backend, SegmentationSettings::default())
    }

    pub fn with_settings(
        db: Arc<dyn Database>,
        backend: Arc<dyn ClusterBackend>,
        settings: SegmentationSettings,
    ) -> Self {
        Self {
            db,
            backend,
            settings,
        }
    }

    /// Run one segmentation analysis.
    pub async fn run(&self, request: &SegmentationRequest) -> ClusterResult<SegmentationResult> {
        let request_id = Uuid::new_v4().to_string();
        let table = ensure_table_name(&request.table).map_err(ClusterError::Sql)?;

        debug!(request_id = %request_id, stage = %AnalysisStage::DetectingColumns, table, "inspecting table metadata");
        let schema = fetch_table_columns(self.db.as_ref(), table).await?;
        let columns = detect_rfm_columns(&schema);
        validate_rfm_columns(&columns)?;

        debug!(request_id = %request_id, stage = %AnalysisStage::Counting, "counting eligible customers");
        let count_sql = generate_customer_count_sql(table, &columns)?;
        let count_result = self.db.execute(&count_sql).await?;
        let customer_count = count_result
            .rows
            .first()
            .and_then(|row| row.get("customer_count"))
            .and_then(value_as_u64)
            .ok_or(ClusterError::MalformedResult("customer_count"))?;
        validate_customer_count_with(customer_count, self.settings.min_customers)?;

        debug!(request_id = %request_id, stage = %AnalysisStage::FetchingRfm, customer_count, "fetching RFM features");
        let query = generate_rfm_sql(table, &columns, request.sample_size, request.baseline_date)?;
        let feature_result = self.db.execute(&query.sql).await?;

        let mut skipped_rows = 0usize;
        let mut customer_ids: Vec<String> = Vec::with_capacity(feature_result.rows.len());
        let mut features: Vec<[f64; 3]> = Vec::with_capacity(feature_result.rows.len());
        for row in &feature_result.rows {
            match parse_feature_row(row) {
                Some((id, feature)) => {
                    customer_ids.push(id);
                    features.push(feature);
                }
                None => {
                    // Row-level parse failures are logged and dropped,
                    // never escalated on their own.
                    skipped_rows += 1;
                    warn!(request_id = %request_id, "skipping RFM row with invalid feature values");
                }
            }
        }

        // The count check ran before parsing; attrition can still pull
        // the population under the minimum.
        if (customer_ids.len() as u64) < self.settings.min_customers {
            return Err(ClusterError::InsufficientCustomers {
                actual: customer_ids.len(),
                required: self.settings.min_customers as usize,
            });
        }

        let requested_k = request.n_clusters.unwrap_or(self.settings.default_clusters);
        let n_clusters = effective_k(
            requested_k,
            customer_ids.len(),
            self.settings.min_small_dataset_k,
        );
        let use_gpu = match request.compute_strategy {
            ComputeStrategy::Auto => customer_ids.len() >= self.settings.gpu_row_threshold,
            ComputeStrategy::Force => true,
            ComputeStrategy::Cpu => false,
        };

        debug!(
            request_id = %request_id,
            stage = %AnalysisStage::Dispatching,
            n_clusters,
            use_gpu,
            customers = customer_ids.len(),
            "dispatching to numeric worker"
        );
        let job = ClusterJob {
            customer_ids: customer_ids.clone(),
            features: features.clone(),
            n_clusters,
            scaling_mode: self.settings.scaling_mode,
            use_gpu,
        };

        debug!(request_id = %request_id, stage = %AnalysisStage::AwaitingWorker, "awaiting worker response");
        let outcome = self.backend.cluster(job).await?;

        if outcome.customer_ids.len() != outcome.cluster_ids.len() {
            return Err(ClusterError::ResponseMismatch {
                ids: outcome.customer_ids.len(),
                assignments: outcome.cluster_ids.len(),
            });
        }

        // Rebuild records by zipping the worker's id order with its
        // assignments and our locally held feature values. The worker is
        // trusted to preserve row correspondence by id order.
        let local: HashMap<&str, &[f64; 3]> = customer_ids
            .iter()
            .map(String::as_str)
            .zip(features.iter())
            .collect();

        let mut records = Vec::with_capacity(outcome.customer_ids.len());
        for (customer_id, cluster_id) in outcome.customer_ids.iter().zip(&outcome.cluster_ids) {
            match local.get(customer_id.as_str()) {
                Some(feature) => records.push(CustomerRecord {
                    customer_id: customer_id.clone(),
                    cluster_id: *cluster_id,
                    recency: feature[0],
                    frequency: feature[1],
                    monetary: feature[2],
                }),
                None => {
                    warn!(request_id = %request_id, customer_id = %customer_id, "worker returned unknown customer id");
                }
            }
        }

        let clusters = aggregate_clusters(&records, n_clusters);

        Ok(SegmentationResult {
            request_id,
            table: table.to_string(),
            customer_count: customer_ids.len(),
            skipped_rows,
            n_clusters,
            gpu_used: outcome.gpu_used,
            is_precomputed: query.is_precomputed,
            is_sampled: query.is_sampled,
            clusters,
        })
    }
}

/// Deterministic small-population degradation: when fewer customers
/// than the requested K exist, reduce K to
/// `max(min_small_dataset_k, customer_count / 3)`.
pub fn effective_k(requested: usize, customer_count: usize, min_small_dataset_k: usize) -> usize {
    if customer_count < requested {
        (customer_count / 3).max(min_small_dataset_k)
    } else {
        requested
    }
}

fn parse_feature_row(row: &Row) -> Option<(String, [f64; 3])> {
    let id = row.get("customer_id").and_then(value_as_id)?;
    let recency = row.get("recency").and_then(value_as_f64)?;
    let frequency = row.get("frequency").and_then(value_as_f64)?;
    let monetary = row.get("monetary").and_then(value_as_f64)?;

    // Invalid rows are dropped, never silently coerced to zero.
    let valid = |v: f64| v.is_finite() && v >= 0.0;
    if valid(recency) && valid(frequency) && valid(monetary) {
        Some((id, [recency, frequency, monetary]))
    } else {
        None
    }
}
