use tracing::{debug, info};

use crate::pool::{PoolError, WorkerPool, WorkerReport};
use crate::types::PixelJob;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub enqueued: usize,
    pub skipped: usize,
    pub workers: Vec<WorkerReport>,
}

/// Feeds the pool in scan order, then waits for it to drain.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher { pub skip_whitespace: bool }

impl Dispatcher {
    pub fn new(skip_whitespace: bool) -> Self { Self { skip_whitespace } }

    pub fn should_skip(&self, job: &PixelJob) -> bool {
        self.skip_whitespace && job.color.is_white()
    }

    pub async fn run<I>(&self, mut pool: WorkerPool, jobs: I) -> Result<DispatchSummary, PoolError>
    where
        I: IntoIterator<Item = PixelJob>,
    {
        let mut summary = DispatchSummary::default();
        info!("Looping through img");
        for job in jobs {
            if self.should_skip(&job) {
                summary.skipped += 1;
                continue;
            }
            pool.submit(job).await?;
            summary.enqueued += 1;
        }
        pool.close();
        debug!(enqueued = summary.enqueued, skipped = summary.skipped, "all jobs queued");

        pool.await_drain().await;
        summary.workers = pool.join().await?;
        Ok(summary)
    }
}
