//! Numeric-worker communication.
//!
//! The clustering kernel runs in a separate long-lived worker process;
//! this module owns the transport, not the numerics. Communication is
//! NDJSON over stdin/stdout with per-request correlation IDs, so
//! concurrent analyses can share one worker.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Segmentation core (Rust + Tokio)             │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │               ClusterWorkerClient (async)              │  │
//! │  │  - spawns the worker as a child process                │  │
//! │  │  - NDJSON protocol over stdin/stdout                   │  │
//! │  │  - request IDs correlate concurrent requests           │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                stdin (NDJSON) │ stdout (NDJSON)              │
//! └───────────────────────────────┼──────────────────────────────┘
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │        Numeric worker (long-running child process)           │
//! │        K-means kernel, CPU or GPU dispatch                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod client;
mod error;
pub mod protocol;

pub use client::ClusterWorkerClient;
pub use error::{WorkerError, WorkerResult};
pub use protocol::{ClusterJob, ClusterOutcome};

use async_trait::async_trait;

/// Boundary trait for the clustering compute backend.
///
/// The orchestrator receives an explicit handle from its caller - the
/// handle's lifecycle (create once, reuse, dispose) belongs to the
/// caller, not to module state.
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    async fn cluster(&self, job: ClusterJob) -> WorkerResult<ClusterOutcome>;
}
