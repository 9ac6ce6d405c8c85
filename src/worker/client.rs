//! Async client for the numeric clustering worker process.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::warn;

use super::error::{WorkerError, WorkerResult};
use super::protocol::{
    ClusterJob, ClusterOutcome, ClusterRequestEnvelope, ClusterResponseEnvelope,
    REQUEST_TYPE_CLUSTER,
};
use super::ClusterBackend;

/// Default timeout for clustering requests (60 seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Error message synthesized when the worker exits with requests pending.
const EXIT_MESSAGE: &str = "worker process exited unexpectedly";

/// Async client for the numeric clustering worker.
///
/// The client spawns the worker as a long-lived child process and
/// communicates via NDJSON (newline-delimited JSON) over stdin/stdout.
/// Each request carries a unique ID for correlation with responses, so
/// concurrent requests can share the one transport. The instance is
/// created once by the caller and reused across analyses; every request
/// registers its own response channel and that exact channel is removed
/// on completion or timeout, so no handler leaks across calls.
///
/// # Example
///
/// ```ignore
/// use cohort::worker::{ClusterWorkerClient, protocol::ClusterJob};
///
/// let client = ClusterWorkerClient::spawn("./cohort-worker").await?;
/// let outcome = client.request(job).await?;
/// ```
pub struct ClusterWorkerClient {
    /// Writer for sending requests to worker stdin.
    stdin: Arc<Mutex<BufWriter<ChildStdin>>>,

    /// Map of pending request IDs to response channels.
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<ClusterResponseEnvelope>>>>,

    /// Handle to the worker child process.
    _child: Child,

    /// Handle to the background reader task.
    _reader_task: tokio::task::JoinHandle<()>,

    /// Request timeout duration.
    timeout: Duration,
}

impl ClusterWorkerClient {
    /// Spawn a new worker process with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker process cannot be spawned.
    pub async fn spawn<P: AsRef<Path>>(worker_path: P) -> WorkerResult<Self> {
        Self::spawn_with_timeout(worker_path, Duration::from_secs(DEFAULT_TIMEOUT_SECS)).await
    }

    /// Spawn a new worker process with a custom request timeout.
    pub async fn spawn_with_timeout<P: AsRef<Path>>(
        worker_path: P,
        timeout: Duration,
    ) -> WorkerResult<Self> {
        let mut child = Command::new(worker_path.as_ref())
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(WorkerError::SpawnFailed)?;

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");

        let stdin = Arc::new(Mutex::new(BufWriter::new(stdin)));
        let pending: Arc<Mutex<HashMap<String, oneshot::Sender<ClusterResponseEnvelope>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        // Spawn background reader task
        let reader_task = Self::spawn_reader_task(stdout, pending.clone());

        Ok(Self {
            stdin,
            pending,
            _child: child,
            _reader_task: reader_task,
            timeout,
        })
    }

    /// Spawn the background task that reads responses from the worker.
    fn spawn_reader_task(
        stdout: ChildStdout,
        pending: Arc<Mutex<HashMap<String, oneshot::Sender<ClusterResponseEnvelope>>>>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        // EOF - worker exited
                        break;
                    }
                    Ok(_) => match serde_json::from_str::<ClusterResponseEnvelope>(&line) {
                        Ok(resp) => {
                            let mut pending = pending.lock().await;
                            if let Some(tx) = pending.remove(&resp.id) {
                                // Send response to waiting caller
                                let _ = tx.send(resp);
                            }
                        }
                        Err(e) => {
                            // Log parse error but continue
                            warn!(error = %e, "worker: failed to parse response");
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "worker: read error");
                        break;
                    }
                }
            }

            // Worker exited - fail all pending requests with error responses
            let mut pending = pending.lock().await;
            for (id, tx) in pending.drain() {
                let error_response = ClusterResponseEnvelope {
                    id,
                    customer_ids: vec![],
                    cluster_ids: vec![],
                    gpu_used: false,
                    error: Some(EXIT_MESSAGE.to_string()),
                };
                let _ = tx.send(error_response);
            }
        })
    }

    /// Send one clustering job to the worker and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails, the request
    /// times out, the worker exits, or the worker returns a typed error.
    pub async fn request(&self, job: ClusterJob) -> WorkerResult<ClusterOutcome> {
        let id = uuid::Uuid::new_v4().to_string();

        let request = ClusterRequestEnvelope {
            id: id.clone(),
            request_type: REQUEST_TYPE_CLUSTER,
            customer_ids: job.customer_ids,
            features: job.features,
            n_clusters: job.n_clusters,
            scaling_mode: job.scaling_mode,
            use_gpu: job.use_gpu,
        };

        // Register response channel
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id.clone(), tx);
        }

        // Send request
        {
            let mut stdin = self.stdin.lock().await;
            let line =
                serde_json::to_string(&request).map_err(WorkerError::SerializeFailed)? + "\n";
            stdin
                .write_all(line.as_bytes())
                .await
                .map_err(WorkerError::WriteFailed)?;
            stdin.flush().await.map_err(WorkerError::WriteFailed)?;
        }

        // Wait for response, racing the timeout
        let response = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(_)) => {
                // Channel closed - worker exited
                return Err(WorkerError::ChannelClosed);
            }
            Err(_) => {
                // Timeout - remove our channel so it cannot leak into
                // later requests. The in-flight computation itself
                // cannot be stopped, only abandoned.
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                return Err(WorkerError::Timeout(self.timeout.as_secs()));
            }
        };

        match response.error {
            Some(message) if message == EXIT_MESSAGE => Err(WorkerError::WorkerExited),
            Some(message) => Err(WorkerError::Remote(message)),
            None => Ok(ClusterOutcome {
                customer_ids: response.customer_ids,
                cluster_ids: response.cluster_ids,
                gpu_used: response.gpu_used,
            }),
        }
    }

    /// Check if the worker is still running.
    ///
    /// Returns `false` once the reader task has finished, which indicates
    /// worker exit.
    pub fn is_alive(&self) -> bool {
        !self._reader_task.is_finished()
    }

    /// Get the current request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Set the request timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

#[async_trait::async_trait]
impl ClusterBackend for ClusterWorkerClient {
    async fn cluster(&self, job: ClusterJob) -> WorkerResult<ClusterOutcome> {
        self.request(job).await
    }
}
