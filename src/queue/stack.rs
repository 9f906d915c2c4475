use std::sync::Mutex;

use crate::job::Job;
use crate::queue::{JobQueue, MAX_POP, MIN_CAPACITY};

/// LIFO queue. The simplest ordering policy; useful for testing recency bias.
pub struct StackQueue {
    jobs: Mutex<Vec<Job>>,
}

impl StackQueue {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::with_capacity(MIN_CAPACITY)),
        }
    }
}

impl Default for StackQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue for StackQueue {
    fn push_many(&self, mut jobs: Vec<Job>) {
        self.jobs
            .lock()
            .expect("stack lock poisoned")
            .append(&mut jobs);
    }

    fn pop_many(&self) -> Vec<Job> {
        let mut pending = self.jobs.lock().expect("stack lock poisoned");
        let n = MAX_POP.min(pending.len());
        let mut jobs = Vec::with_capacity(n);
        for _ in 0..n {
            if let Some(job) = pending.pop() {
                jobs.push(job);
            }
        }
        jobs
    }

    fn len(&self) -> usize {
        self.jobs.lock().expect("stack lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Operation, Resource};

    #[test]
    fn pops_most_recent_first() {
        let q = StackQueue::new();
        let jobs: Vec<Job> = (0..5)
            .map(|_| Job::new(Resource::User, Operation::Delete, vec![]))
            .collect();
        let mut ids: Vec<u64> = jobs.iter().map(|j| j.id).collect();
        ids.reverse();

        q.push_many(jobs);
        let popped: Vec<u64> = q.pop_many().iter().map(|j| j.id).collect();
        assert_eq!(popped, ids);
    }
}
