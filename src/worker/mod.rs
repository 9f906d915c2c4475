//! Worker pool: drains the queue and dispatches batches to backend nodes.

pub mod codec;
mod dispatch;
mod strategy;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use strategy::{plan, DispatchGroup, Strategy};

use crate::grpc::ClientPool;
use crate::job::Job;
use crate::queue::JobQueue;
use crate::registry::Registry;
use crate::selector::Selector;

/// How long an idle worker sleeps before polling the queue again.
const IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// A fixed-size pool of dispatch workers sharing one queue, one registry
/// snapshot source, and one client pool.
pub struct WorkerPool {
    queue: Arc<dyn JobQueue>,
    registry: Arc<Registry>,
    selector: Arc<dyn Selector>,
    clients: Arc<ClientPool>,
    strategy: Strategy,
    workers: usize,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        registry: Arc<Registry>,
        selector: Arc<dyn Selector>,
        strategy: Strategy,
        workers: usize,
    ) -> Self {
        Self {
            queue,
            registry,
            selector,
            clients: Arc::new(ClientPool::new()),
            strategy,
            workers,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn all workers. Handles complete once [`stop`] is called and each
    /// worker finishes its in-flight batch.
    ///
    /// [`stop`]: WorkerPool::stop
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        (0..self.workers)
            .map(|worker_id| {
                let worker = Worker {
                    queue: self.queue.clone(),
                    registry: self.registry.clone(),
                    selector: self.selector.clone(),
                    clients: self.clients.clone(),
                    strategy: self.strategy,
                    cancel: self.cancel.clone(),
                };
                tokio::spawn(async move {
                    tracing::debug!(worker_id, "Worker started");
                    worker.run().await;
                    tracing::debug!(worker_id, "Worker stopped");
                })
            })
            .collect()
    }

    /// Signal every worker to exit after its current batch. Jobs left in the
    /// queue stay there.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

struct Worker {
    queue: Arc<dyn JobQueue>,
    registry: Arc<Registry>,
    selector: Arc<dyn Selector>,
    clients: Arc<ClientPool>,
    strategy: Strategy,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(&self) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }

            let jobs = self.queue.pop_many();
            if jobs.is_empty() {
                tokio::select! {
                    _ = tokio::time::sleep(IDLE_BACKOFF) => {}
                    _ = self.cancel.cancelled() => return,
                }
                continue;
            }

            self.dispatch_batch(jobs).await;
        }
    }

    async fn dispatch_batch(&self, jobs: Vec<Job>) {
        let count = jobs.len();
        let nodes = self.registry.all();
        let groups = match plan(self.strategy, jobs, self.selector.as_ref(), &nodes) {
            Ok(groups) => groups,
            Err(err) => {
                tracing::warn!(count, error = %err, "Dropping batch, planning failed");
                return;
            }
        };

        for group in groups {
            dispatch::dispatch_group(group, &self.registry, &self.clients).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::FcfsQueue;
    use crate::selector::RoundRobin;

    fn pool(workers: usize) -> (WorkerPool, Arc<FcfsQueue>) {
        let queue = Arc::new(FcfsQueue::new());
        let pool = WorkerPool::new(
            queue.clone(),
            Arc::new(Registry::new()),
            Arc::new(RoundRobin::new()),
            Strategy::Mixed,
            workers,
        );
        (pool, queue)
    }

    #[tokio::test]
    async fn spawn_starts_the_requested_number_of_workers() {
        let (pool, _queue) = pool(4);
        let handles = pool.spawn();
        assert_eq!(handles.len(), 4);

        pool.stop();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn stop_terminates_idle_workers_promptly() {
        let (pool, _queue) = pool(2);
        let handles = pool.spawn();

        pool.stop();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("worker should exit after stop")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn unplannable_batches_are_dropped_not_requeued() {
        use crate::job::{Job, Operation, Resource};

        // Mixed strategy with an empty registry fails planning; the batch
        // must be consumed, not spun on.
        let (pool, queue) = pool(1);
        queue.push_many(vec![Job::new(
            Resource::User,
            Operation::Create,
            b"{}".to_vec(),
        )]);

        let handles = pool.spawn();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !queue.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("batch should be drained");

        pool.stop();
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(queue.is_empty());
    }
}
