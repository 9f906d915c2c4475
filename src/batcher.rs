use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::job::{Job, Operation, Resource};
use crate::queue::JobQueue;

/// Accumulates jobs per resource type and flushes them into the queue,
/// grouped by (resource, operation), on either trigger:
///
/// - a resource's pending list reaching the configured batch size, or
/// - the flush timer firing, which drains all three lists regardless of
///   size and bounds worst-case buffering latency to the timeout.
///
/// Jobs still pending when [`Batcher::stop`] is called are not flushed.
pub struct Batcher {
    queue: Arc<dyn JobQueue>,
    pending: Mutex<[Vec<Job>; 3]>,
    batch_size: usize,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Batcher {
    pub fn new(queue: Arc<dyn JobQueue>, batch_size: usize, timeout: Duration) -> Self {
        Self {
            queue,
            pending: Mutex::new([Vec::new(), Vec::new(), Vec::new()]),
            batch_size,
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Buffer one job. Reaching the batch size flushes that resource's list
    /// immediately; producers on other resources are never blocked by the
    /// drain because the list is swapped out under the lock and pushed
    /// outside it.
    pub fn add(&self, job: Job) {
        let resource = job.resource;
        let drained = {
            let mut pending = self.pending.lock().expect("batcher lock poisoned");
            let list = &mut pending[resource.index()];
            list.push(job);
            if list.len() >= self.batch_size {
                Some(std::mem::take(list))
            } else {
                None
            }
        };

        if let Some(jobs) = drained {
            tracing::debug!(%resource, count = jobs.len(), "Size-triggered flush");
            self.group_and_push(resource, jobs);
        }
    }

    /// Drain every pending list and push the contents into the queue.
    pub fn flush(&self) {
        let drained = {
            let mut pending = self.pending.lock().expect("batcher lock poisoned");
            [
                std::mem::take(&mut pending[0]),
                std::mem::take(&mut pending[1]),
                std::mem::take(&mut pending[2]),
            ]
        };

        for (resource, jobs) in Resource::ALL.into_iter().zip(drained) {
            self.group_and_push(resource, jobs);
        }
    }

    /// One `push_many` per (resource, operation) group, so the worker pops
    /// runs of same-shaped jobs and queue-lock traffic stays low.
    fn group_and_push(&self, resource: Resource, jobs: Vec<Job>) {
        if jobs.is_empty() {
            return;
        }

        let mut by_operation: [Vec<Job>; 4] = Default::default();
        for job in jobs {
            by_operation[job.operation.index()].push(job);
        }

        for (operation, group) in Operation::ALL.into_iter().zip(by_operation) {
            if group.is_empty() {
                continue;
            }
            tracing::debug!(%resource, %operation, count = group.len(), "Batch pushed to queue");
            self.queue.push_many(group);
        }
    }

    /// Timer-driven flush loop; exits at the next tick after [`stop`].
    ///
    /// [`stop`]: Batcher::stop
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.timeout);
        interval.tick().await; // immediate first tick

        loop {
            tokio::select! {
                _ = interval.tick() => self.flush(),
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Batcher flush loop stopped");
                    return;
                }
            }
        }
    }

    /// Signal the flush loop to exit. Pending jobs are dropped, not flushed.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}
