//! Customer-segmentation orchestration.
//!
//! - [`stats`] - per-cluster aggregation of RFM features
//! - [`orchestrator`] - the staged analysis pipeline from column
//!   detection to sorted cluster metadata
//!
//! The orchestrator owns no worker: it receives an explicit
//! [`crate::worker::ClusterBackend`] handle from its caller, whose
//! lifecycle (create once, reuse, dispose) stays with the caller.

pub mod orchestrator;
pub mod stats;

pub use orchestrator::{
    AnalysisStage, ClusteringOrchestrator, ComputeStrategy, SegmentationRequest,
    SegmentationResult,
};
pub use stats::{aggregate_clusters, ClusterMetadata, CustomerRecord};

use crate::db::DbError;
use crate::rfm::RfmError;
use crate::sql::CompileError;
use crate::worker::WorkerError;

/// Errors from a segmentation analysis.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// Column detection or population validation failed.
    #[error(transparent)]
    Rfm(#[from] RfmError),

    /// SQL generation failed.
    #[error(transparent)]
    Sql(#[from] CompileError),

    /// The analytical engine rejected a query.
    #[error(transparent)]
    Query(#[from] DbError),

    /// The numeric worker failed or timed out.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// Post-parse attrition dropped the population below the minimum,
    /// even though the earlier count check passed.
    #[error("insufficient customers after row validation: kept {actual}, at least {required} are required")]
    InsufficientCustomers { actual: usize, required: usize },

    /// The worker returned differing id and assignment counts.
    #[error("worker response mismatch: {ids} customer ids vs {assignments} assignments")]
    ResponseMismatch { ids: usize, assignments: usize },

    /// A query result is missing an expected column.
    #[error("query result is missing the '{0}' column")]
    MalformedResult(&'static str),
}

pub type ClusterResult<T> = Result<T, ClusterError>;
