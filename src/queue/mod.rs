//! Job queue abstraction and the interchangeable ordering algorithms.
//!
//! All implementations synchronize internally and are safe to share across
//! many producer and consumer tasks. Pops are bounded to [`MAX_POP`] jobs;
//! an empty queue yields an empty batch and callers poll.

mod fcfs;
mod heap;
mod random;
mod stack;

use std::sync::Arc;

pub use fcfs::FcfsQueue;
pub use heap::HeapQueue;
pub use random::RandomQueue;
pub use stack::StackQueue;

use crate::job::Job;

/// Capacity floor for the FCFS ring buffer.
pub const MIN_CAPACITY: usize = 128;

/// Upper bound on the number of jobs returned by a single `pop_many`.
pub const MAX_POP: usize = 128;

/// Ordering/storage contract shared by all queue algorithms.
pub trait JobQueue: Send + Sync {
    /// Append all provided jobs in one critical section.
    fn push_many(&self, jobs: Vec<Job>);

    /// Remove and return up to [`MAX_POP`] jobs in the algorithm's order.
    /// Returns an empty batch when the queue is empty.
    fn pop_many(&self) -> Vec<Job>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Closed set of queue ordering algorithms selectable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum QueueAlgorithm {
    /// First come, first served: retrieval order matches arrival order.
    Fcfs,
    /// Shortest job first, keyed by payload length.
    Sjf,
    /// Longest job first, keyed by payload length.
    Ljf,
    /// Uniformly random retrieval; for chaos and testing scenarios.
    Random,
    /// LIFO; for testing recency bias.
    Stack,
}

impl QueueAlgorithm {
    pub fn build(self) -> Arc<dyn JobQueue> {
        match self {
            QueueAlgorithm::Fcfs => Arc::new(FcfsQueue::new()),
            QueueAlgorithm::Sjf => Arc::new(HeapQueue::shortest_first()),
            QueueAlgorithm::Ljf => Arc::new(HeapQueue::longest_first()),
            QueueAlgorithm::Random => Arc::new(RandomQueue::new()),
            QueueAlgorithm::Stack => Arc::new(StackQueue::new()),
        }
    }
}
