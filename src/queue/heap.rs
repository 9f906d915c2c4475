use std::sync::Mutex;

use crate::job::Job;
use crate::queue::{JobQueue, MAX_POP, MIN_CAPACITY};

/// Heap ordering: which payload size wins the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeapOrder {
    /// Min-heap on payload length (shortest job first).
    ShortestFirst,
    /// Max-heap on payload length (longest job first).
    LongestFirst,
}

/// Size-prioritized queue over a hand-rolled binary heap keyed by
/// `payload.len()`. Push appends and sifts up; pop swaps the last element
/// into the root and sifts down. Used when resource cost correlates with
/// payload size.
pub struct HeapQueue {
    inner: Mutex<Heap>,
}

struct Heap {
    // (key, job) pairs; key is the payload length captured at push time.
    entries: Vec<(usize, Job)>,
    order: HeapOrder,
}

impl Heap {
    /// True if the entry at `a` should sit above the entry at `b`.
    fn before(&self, a: usize, b: usize) -> bool {
        match self.order {
            HeapOrder::ShortestFirst => self.entries[a].0 < self.entries[b].0,
            HeapOrder::LongestFirst => self.entries[a].0 > self.entries[b].0,
        }
    }

    fn push(&mut self, job: Job) {
        let key = job.payload.len();
        self.entries.push((key, job));
        self.sift_up(self.entries.len() - 1);
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) >> 1;
            if self.before(idx, parent) {
                self.entries.swap(idx, parent);
                idx = parent;
            } else {
                break;
            }
        }
    }

    fn pop(&mut self) -> Option<Job> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.entries.swap(0, last);
        let (_, job) = self.entries.pop()?;
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(job)
    }

    fn sift_down(&mut self, mut idx: usize) {
        let size = self.entries.len();
        loop {
            let mut top = idx;
            let left = 2 * idx + 1;
            let right = 2 * idx + 2;

            if left < size && self.before(left, top) {
                top = left;
            }
            if right < size && self.before(right, top) {
                top = right;
            }
            if top == idx {
                break;
            }
            self.entries.swap(idx, top);
            idx = top;
        }
    }
}

impl HeapQueue {
    pub fn shortest_first() -> Self {
        Self::with_order(HeapOrder::ShortestFirst)
    }

    pub fn longest_first() -> Self {
        Self::with_order(HeapOrder::LongestFirst)
    }

    fn with_order(order: HeapOrder) -> Self {
        Self {
            inner: Mutex::new(Heap {
                entries: Vec::with_capacity(MIN_CAPACITY),
                order,
            }),
        }
    }
}

impl JobQueue for HeapQueue {
    fn push_many(&self, jobs: Vec<Job>) {
        let mut heap = self.inner.lock().expect("heap lock poisoned");
        for job in jobs {
            heap.push(job);
        }
    }

    fn pop_many(&self) -> Vec<Job> {
        let mut heap = self.inner.lock().expect("heap lock poisoned");
        let n = MAX_POP.min(heap.entries.len());
        let mut jobs = Vec::with_capacity(n);
        for _ in 0..n {
            if let Some(job) = heap.pop() {
                jobs.push(job);
            }
        }
        jobs
    }

    fn len(&self) -> usize {
        self.inner.lock().expect("heap lock poisoned").entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Operation, Resource};

    fn sized_job(len: usize) -> Job {
        Job::new(Resource::Product, Operation::Create, vec![b'x'; len])
    }

    #[test]
    fn shortest_first_pops_in_non_decreasing_size() {
        let q = HeapQueue::shortest_first();
        q.push_many(vec![
            sized_job(40),
            sized_job(3),
            sized_job(17),
            sized_job(3),
            sized_job(90),
        ]);
        let sizes: Vec<usize> = q.pop_many().iter().map(|j| j.payload.len()).collect();
        assert_eq!(sizes, vec![3, 3, 17, 40, 90]);
    }

    #[test]
    fn longest_first_pops_in_non_increasing_size() {
        let q = HeapQueue::longest_first();
        q.push_many(vec![sized_job(1), sized_job(100), sized_job(50)]);
        let sizes: Vec<usize> = q.pop_many().iter().map(|j| j.payload.len()).collect();
        assert_eq!(sizes, vec![100, 50, 1]);
    }

    #[test]
    fn heap_property_holds_across_interleaved_pushes() {
        let q = HeapQueue::shortest_first();
        for chunk in [vec![9, 2, 7], vec![1, 8], vec![5, 5, 0]] {
            q.push_many(chunk.into_iter().map(sized_job).collect());
        }
        let sizes: Vec<usize> = q.pop_many().iter().map(|j| j.payload.len()).collect();
        let mut sorted = sizes.clone();
        sorted.sort_unstable();
        assert_eq!(sizes, sorted);
    }
}
