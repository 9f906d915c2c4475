use std::sync::Mutex;

use rand::Rng;

use crate::job::Job;
use crate::queue::{JobQueue, MAX_POP, MIN_CAPACITY};

/// Unordered queue that pops a uniformly random job. Each pop removes from
/// the middle of the list, so it costs O(len) — accepted, this algorithm
/// exists for chaos and testing scenarios, not throughput.
pub struct RandomQueue {
    jobs: Mutex<Vec<Job>>,
}

impl RandomQueue {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::with_capacity(MIN_CAPACITY)),
        }
    }
}

impl Default for RandomQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue for RandomQueue {
    fn push_many(&self, mut jobs: Vec<Job>) {
        self.jobs
            .lock()
            .expect("random queue lock poisoned")
            .append(&mut jobs);
    }

    fn pop_many(&self) -> Vec<Job> {
        let mut pending = self.jobs.lock().expect("random queue lock poisoned");
        let n = MAX_POP.min(pending.len());
        let mut rng = rand::thread_rng();
        let mut jobs = Vec::with_capacity(n);
        for _ in 0..n {
            let idx = rng.gen_range(0..pending.len());
            jobs.push(pending.remove(idx));
        }
        jobs
    }

    fn len(&self) -> usize {
        self.jobs.lock().expect("random queue lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Operation, Resource};

    #[test]
    fn pops_every_pushed_job_exactly_once() {
        let q = RandomQueue::new();
        let jobs: Vec<Job> = (0..20)
            .map(|_| Job::new(Resource::Order, Operation::Read, vec![]))
            .collect();
        let mut ids: Vec<u64> = jobs.iter().map(|j| j.id).collect();

        q.push_many(jobs);
        let mut popped: Vec<u64> = q.pop_many().iter().map(|j| j.id).collect();
        assert!(q.is_empty());

        ids.sort_unstable();
        popped.sort_unstable();
        assert_eq!(ids, popped);
    }

    #[test]
    fn empty_pop_returns_empty_batch() {
        let q = RandomQueue::new();
        assert!(q.pop_many().is_empty());
    }
}
