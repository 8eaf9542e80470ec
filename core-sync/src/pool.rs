//! # Worker Pool
//!
//! Bounded-concurrency executor for independent jobs.
//!
//! ## Overview
//!
//! A pool owns `N` worker tasks that pull jobs from one shared submission
//! queue. Each finished job yields exactly one [`JobResult`] on the results
//! channel, in completion order.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──start──> Started ──stop──> Stopped
//!    └───────────────stop───────────────┘
//! ```
//!
//! `Stopped` is terminal: starting a stopped pool fails with
//! [`SyncError::InvalidStateTransition`] and submitting to a pool that is not
//! `Started` fails with [`SyncError::PoolClosed`].
//!
//! ## Guarantees
//!
//! - Submission suspends while the queue is full; jobs are never dropped.
//! - At most `N` jobs execute at the same time.
//! - A panic inside `execute` becomes a [`SyncError::JobPanicked`] result and
//!   the worker keeps going.
//! - [`WorkerPool::stop`] closes intake, lets queued and in-flight jobs
//!   finish, and returns once every worker has exited. Their results remain
//!   readable afterwards.
//! - The results channel is unbounded, so a caller may submit everything
//!   before reading any result.
//!
//! ## Usage
//!
//! ```ignore
//! let mut pool = WorkerPool::new(5, cancel.clone());
//! pool.start()?;
//! for job in jobs {
//!     pool.submit(job).await?;
//! }
//! let results = pool.collect_results(expected).await?;
//! pool.stop().await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, SyncError};

/// Type-safe job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new random job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unit of work executed by a [`WorkerPool`]
#[async_trait]
pub trait Job: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Stable identifier, fixed at construction
    fn id(&self) -> JobId;

    /// Human-readable description used in logs and results
    fn label(&self) -> String {
        self.id().to_string()
    }

    /// Run the job once
    ///
    /// Long-running jobs poll `cancel` between steps.
    async fn execute(&self, cancel: &CancellationToken) -> Result<Self::Output>;
}

/// Outcome of one executed job
#[derive(Debug)]
pub struct JobResult<T> {
    pub id: JobId,
    pub label: String,
    pub outcome: Result<T>,
}

impl<T> JobResult<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Pool lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Created,
    Started,
    Stopped,
}

impl PoolState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Stopped => "stopped",
        }
    }

    fn can_transition_to(&self, to: PoolState) -> bool {
        matches!(
            (self, to),
            (Self::Created, Self::Started) | (Self::Created, Self::Stopped) | (Self::Started, Self::Stopped)
        )
    }
}

type SharedQueue<J> = Arc<Mutex<mpsc::Receiver<J>>>;

/// Fixed-size pool of async workers
pub struct WorkerPool<J: Job> {
    worker_count: usize,
    state: PoolState,
    cancel: CancellationToken,
    sender: Option<mpsc::Sender<J>>,
    queue: Option<mpsc::Receiver<J>>,
    results_tx: Option<mpsc::UnboundedSender<JobResult<J::Output>>>,
    results_rx: mpsc::UnboundedReceiver<JobResult<J::Output>>,
    workers: Vec<JoinHandle<()>>,
}

impl<J: Job> WorkerPool<J> {
    /// Create a pool of `worker_count` workers (at least one)
    ///
    /// `cancel` is handed to every job execution.
    pub fn new(worker_count: usize, cancel: CancellationToken) -> Self {
        let worker_count = worker_count.max(1);
        Self::with_queue_capacity(worker_count, worker_count, cancel)
    }

    /// Create a pool with an explicit submission queue capacity
    pub fn with_queue_capacity(
        worker_count: usize,
        queue_capacity: usize,
        cancel: CancellationToken,
    ) -> Self {
        let (sender, queue) = mpsc::channel(queue_capacity.max(1));
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        Self {
            worker_count: worker_count.max(1),
            state: PoolState::Created,
            cancel,
            sender: Some(sender),
            queue: Some(queue),
            results_tx: Some(results_tx),
            results_rx,
            workers: Vec::new(),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Spawn the workers
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidStateTransition`] unless the pool is `Created`.
    pub fn start(&mut self) -> Result<()> {
        self.validate_transition(PoolState::Started)?;

        let (Some(queue), Some(results_tx)) = (self.queue.take(), self.results_tx.take()) else {
            return Err(SyncError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: PoolState::Started.as_str().to_string(),
                reason: "Pool channels already consumed".to_string(),
            });
        };

        let queue: SharedQueue<J> = Arc::new(Mutex::new(queue));
        for worker_id in 0..self.worker_count {
            let queue = Arc::clone(&queue);
            let results = results_tx.clone();
            let cancel = self.cancel.clone();
            self.workers.push(tokio::spawn(worker_loop(
                worker_id, queue, results, cancel,
            )));
        }

        self.state = PoolState::Started;
        info!(workers = self.worker_count, "Worker pool started");
        Ok(())
    }

    /// Enqueue a job, waiting while the queue is full
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PoolClosed`] unless the pool is `Started`.
    pub async fn submit(&self, job: J) -> Result<()> {
        if self.state != PoolState::Started {
            return Err(SyncError::PoolClosed);
        }

        let sender = self.sender.as_ref().ok_or(SyncError::PoolClosed)?;
        sender.send(job).await.map_err(|_| SyncError::PoolClosed)
    }

    /// Wait for the next completed job
    ///
    /// Returns `None` once every worker has exited and all results were read.
    pub async fn next_result(&mut self) -> Option<JobResult<J::Output>> {
        self.results_rx.recv().await
    }

    /// Take a completed result if one is ready, without waiting
    pub fn try_next_result(&mut self) -> Option<JobResult<J::Output>> {
        self.results_rx.try_recv().ok()
    }

    /// Wait for exactly `expected` results
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ResultsClosed`] if the channel closes first.
    pub async fn collect_results(&mut self, expected: usize) -> Result<Vec<JobResult<J::Output>>> {
        let mut results = Vec::with_capacity(expected);
        while results.len() < expected {
            match self.results_rx.recv().await {
                Some(result) => results.push(result),
                None => {
                    return Err(SyncError::ResultsClosed {
                        expected,
                        received: results.len(),
                    })
                }
            }
        }
        Ok(results)
    }

    /// Close intake and wait for every worker to finish
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidStateTransition`] if the pool is already `Stopped`.
    pub async fn stop(&mut self) -> Result<()> {
        self.validate_transition(PoolState::Stopped)?;

        self.sender.take();
        // A never-started pool owns the only result sender.
        self.results_tx.take();
        self.queue.take();

        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                warn!(error = %e, "Worker task ended abnormally");
            }
        }

        self.state = PoolState::Stopped;
        info!("Worker pool stopped");
        Ok(())
    }

    fn validate_transition(&self, to: PoolState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(SyncError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.state.as_str(),
                    to.as_str()
                ),
            });
        }
        Ok(())
    }
}

async fn worker_loop<J: Job>(
    worker_id: usize,
    queue: SharedQueue<J>,
    results: mpsc::UnboundedSender<JobResult<J::Output>>,
    cancel: CancellationToken,
) {
    debug!(worker_id, "Worker started");

    loop {
        let job = {
            let mut queue = queue.lock().await;
            queue.recv().await
        };
        let Some(job) = job else {
            break;
        };

        let id = job.id();
        let label = job.label();
        let token = cancel.clone();

        // Run on its own task so a panic unwinds there and not in the worker.
        let outcome = match tokio::spawn(async move { job.execute(&token).await }).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(SyncError::JobPanicked {
                job_id: label.clone(),
                message: panic_message(e.into_panic()),
            }),
            Err(e) => Err(SyncError::JobPanicked {
                job_id: label.clone(),
                message: e.to_string(),
            }),
        };

        if let Err(e) = &outcome {
            warn!(worker_id, job = %label, error = %e, "Job failed");
        } else {
            debug!(worker_id, job = %label, "Job succeeded");
        }

        if results.send(JobResult { id, label, outcome }).is_err() {
            debug!(worker_id, "Result receiver dropped");
        }
    }

    debug!(worker_id, "Worker exited");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
