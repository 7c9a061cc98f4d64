//! Bounded job queue, fixed-size worker pool and the drain barrier.
//!
//! The dispatcher is the only producer. Every worker pulls from the same
//! receiver until the queue is closed and empty, so a job is handed to exactly
//! one worker. The drain counter goes up once per enqueued job and down once per
//! finished job, success or not; `await_drain` returns when it reaches zero.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::artifact::ArtifactService;
use crate::ledger::Ledger;
use crate::metrics::PaintMetrics;
use crate::pipeline::{JobState, Painter};
use crate::types::PixelJob;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("worker pool needs at least one worker")]
    EmptyPool,
    #[error("job queue capacity must be greater than 0")]
    ZeroCapacity,
    #[error("job queue is closed")]
    QueueClosed,
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Outstanding-job counter with an awaitable zero.
#[derive(Debug)]
pub struct DrainCounter { tx: watch::Sender<usize> }

impl Default for DrainCounter {
    fn default() -> Self { Self::new() }
}

impl DrainCounter {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    pub fn add(&self) { self.tx.send_modify(|n| *n += 1); }

    pub fn done(&self) {
        self.tx.send_modify(|n| {
            debug_assert!(*n > 0, "done() without matching add()");
            *n = n.saturating_sub(1);
        });
    }

    pub fn outstanding(&self) -> usize { *self.tx.borrow() }

    /// Resolves once every added job has been marked done.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives in `self`, so this cannot observe a closed channel
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Producer half of the job queue. Closed by dropping the sender, once.
pub struct JobQueue { tx: Option<mpsc::Sender<PixelJob>> }

/// Consumer half, shared by every worker.
#[derive(Clone)]
pub struct JobConsumer { rx: Arc<Mutex<mpsc::Receiver<PixelJob>>> }

impl JobQueue {
    pub fn bounded(capacity: usize) -> Result<(JobQueue, JobConsumer), PoolError> {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        let (tx, rx) = mpsc::channel(capacity);
        Ok((JobQueue { tx: Some(tx) }, JobConsumer { rx: Arc::new(Mutex::new(rx)) }))
    }

    /// Waits while the buffer is full.
    pub async fn enqueue(&self, job: PixelJob) -> Result<(), PoolError> {
        let tx = self.tx.as_ref().ok_or(PoolError::QueueClosed)?;
        tx.send(job).await.map_err(|_| PoolError::QueueClosed)
    }

    /// Returns false if the queue was already closed.
    pub fn close(&mut self) -> bool { self.tx.take().is_some() }

    pub fn is_closed(&self) -> bool { self.tx.is_none() }
}

impl JobConsumer {
    /// `None` once the queue is closed and drained.
    pub async fn next(&self) -> Option<PixelJob> { self.rx.lock().await.recv().await }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState { Running, Terminated }

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: usize,
    pub processed: usize,
    pub state: WorkerState,
}

struct Worker<A, L> {
    id: usize,
    state: WorkerState,
    processed: usize,
    jobs: JobConsumer,
    painter: Arc<Painter<A, L>>,
    drain: Arc<DrainCounter>,
    metrics: Arc<PaintMetrics>,
}

impl<A: ArtifactService, L: Ledger> Worker<A, L> {
    async fn run(mut self) -> WorkerReport {
        debug!(worker = self.id, "worker started");
        while let Some(job) = self.jobs.next().await {
            let started = Instant::now();
            let outcome = self.painter.paint(&job).await;
            let (x, y) = self.painter.offset().apply(&job);
            match &outcome {
                Ok(receipt) => info!(worker = self.id, x, y, %receipt, "painted"),
                Err(err) => warn!(
                    worker = self.id, x, y,
                    stage = %err.stage(), state = %JobState::Failed, error = %err,
                    "Failed paint"
                ),
            }
            self.metrics.record_job(started.elapsed().as_millis() as u64, &outcome);
            self.processed += 1;
            self.drain.done();
        }
        self.state = WorkerState::Terminated;
        debug!(worker = self.id, processed = self.processed, "worker terminated");
        WorkerReport { id: self.id, processed: self.processed, state: self.state }
    }
}

pub struct WorkerPool {
    queue: JobQueue,
    drain: Arc<DrainCounter>,
    metrics: Arc<PaintMetrics>,
    workers: Vec<JoinHandle<WorkerReport>>,
}

impl WorkerPool {
    /// Spawn `size` workers on the current tokio runtime.
    pub fn start<A, L>(
        size: usize,
        capacity: usize,
        painter: Arc<Painter<A, L>>,
        metrics: Arc<PaintMetrics>,
    ) -> Result<Self, PoolError>
    where
        A: ArtifactService + 'static,
        L: Ledger + 'static,
    {
        if size == 0 {
            return Err(PoolError::EmptyPool);
        }
        let (queue, jobs) = JobQueue::bounded(capacity)?;
        let drain = Arc::new(DrainCounter::new());

        let workers = (1..=size)
            .map(|id| {
                let worker = Worker {
                    id,
                    state: WorkerState::Running,
                    processed: 0,
                    jobs: jobs.clone(),
                    painter: Arc::clone(&painter),
                    drain: Arc::clone(&drain),
                    metrics: Arc::clone(&metrics),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        Ok(Self { queue, drain, metrics, workers })
    }

    pub fn size(&self) -> usize { self.workers.len() }

    /// Count the job as outstanding, then hand it to the queue.
    pub async fn submit(&self, job: PixelJob) -> Result<(), PoolError> {
        if self.queue.is_closed() {
            return Err(PoolError::QueueClosed);
        }
        self.drain.add();
        if let Err(e) = self.queue.enqueue(job).await {
            self.drain.done();
            return Err(e);
        }
        Ok(())
    }

    /// No more jobs. Workers exit once the buffer is empty.
    pub fn close(&mut self) {
        if self.queue.close() {
            debug!("job queue closed");
        }
    }

    pub fn outstanding(&self) -> usize { self.drain.outstanding() }

    pub fn metrics(&self) -> &Arc<PaintMetrics> { &self.metrics }

    pub async fn await_drain(&self) { self.drain.wait().await }

    /// Close the queue if still open and wait for every worker to terminate.
    pub async fn join(mut self) -> Result<Vec<WorkerReport>, PoolError> {
        self.close();
        let mut reports = Vec::with_capacity(self.workers.len());
        for handle in self.workers.drain(..) {
            reports.push(handle.await?);
        }
        Ok(reports)
    }
}
