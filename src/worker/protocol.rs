//! Protocol types for numeric-worker communication.
//!
//! The worker receives a feature matrix and a cluster count and returns
//! per-customer cluster assignments. Field names are the worker's wire
//! contract (camelCase); the `id` field correlates responses with
//! concurrent in-flight requests.

use serde::{Deserialize, Serialize};

/// Clustering request envelope sent to the worker.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterRequestEnvelope {
    /// Unique request ID for correlation.
    pub id: String,
    /// Request kind; always `"CLUSTER"` here.
    #[serde(rename = "type")]
    pub request_type: &'static str,
    #[serde(rename = "customerIds")]
    pub customer_ids: Vec<String>,
    /// One `[recency, frequency, monetary]` row per customer.
    pub features: Vec<[f64; 3]>,
    #[serde(rename = "nClusters")]
    pub n_clusters: usize,
    /// Feature scaling applied worker-side before clustering.
    #[serde(rename = "scalingMode")]
    pub scaling_mode: i32,
    #[serde(rename = "useGPU")]
    pub use_gpu: bool,
}

/// Response envelope received from the worker. Success carries the
/// assignments; failure carries `error` and nothing else meaningful.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterResponseEnvelope {
    /// Request ID this response corresponds to.
    pub id: String,
    #[serde(default, rename = "customerIds")]
    pub customer_ids: Vec<String>,
    #[serde(default, rename = "clusterIds")]
    pub cluster_ids: Vec<usize>,
    #[serde(default, rename = "gpuUsed")]
    pub gpu_used: bool,
    /// Typed error message (present on failure).
    #[serde(default)]
    pub error: Option<String>,
}

/// The request kind tag.
pub const REQUEST_TYPE_CLUSTER: &str = "CLUSTER";

/// A clustering job before it is wrapped in a correlated envelope.
#[derive(Debug, Clone)]
pub struct ClusterJob {
    pub customer_ids: Vec<String>,
    /// One `[recency, frequency, monetary]` row per customer, positional
    /// with `customer_ids`.
    pub features: Vec<[f64; 3]>,
    pub n_clusters: usize,
    pub scaling_mode: i32,
    pub use_gpu: bool,
}

/// A successful clustering outcome.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// Customer ids in the worker's row order. Row correspondence with
    /// `cluster_ids` is positional.
    pub customer_ids: Vec<String>,
    pub cluster_ids: Vec<usize>,
    pub gpu_used: bool,
}
