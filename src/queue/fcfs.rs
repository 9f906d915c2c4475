use std::sync::Mutex;

use crate::job::Job;
use crate::queue::{JobQueue, MAX_POP, MIN_CAPACITY};

/// First-come-first-served queue over a circular ring buffer.
///
/// Capacity is always a power of two and never drops below the configured
/// floor. Pushing into a full buffer doubles capacity; a pop that leaves
/// occupancy at or below 25% halves it. The gap between the grow and shrink
/// thresholds keeps an alternating push/pop workload from thrashing resizes.
pub struct FcfsQueue {
    inner: Mutex<Ring>,
}

struct Ring {
    jobs: Vec<Option<Job>>,
    head: usize,
    tail: usize,
    size: usize,
    capacity: usize,
    floor: usize,
}

impl Ring {
    fn push(&mut self, job: Job) {
        if self.size == self.capacity {
            self.resize(self.capacity << 1);
        }
        self.jobs[self.tail] = Some(job);
        self.tail = (self.tail + 1) & (self.capacity - 1);
        self.size += 1;
    }

    fn pop(&mut self) -> Option<Job> {
        if self.size == 0 {
            return None;
        }
        let job = self.jobs[self.head].take();
        self.head = (self.head + 1) & (self.capacity - 1);
        self.size -= 1;
        if self.size <= self.capacity >> 2 && self.capacity > self.floor {
            self.resize(self.capacity >> 1);
        }
        job
    }

    /// Copy live elements into a freshly indexed buffer with head reset to 0.
    fn resize(&mut self, new_capacity: usize) {
        let mut jobs: Vec<Option<Job>> = Vec::with_capacity(new_capacity);
        jobs.resize_with(new_capacity, || None);

        let mut idx = 0;
        let mut i = self.head;
        while idx < self.size {
            jobs[idx] = self.jobs[i].take();
            i = (i + 1) & (self.capacity - 1);
            idx += 1;
        }

        self.jobs = jobs;
        self.head = 0;
        self.tail = self.size & (new_capacity - 1);
        self.capacity = new_capacity;
    }
}

impl FcfsQueue {
    pub fn new() -> Self {
        Self::with_capacity_floor(MIN_CAPACITY)
    }

    /// Floor is rounded up to the next power of two (minimum 2).
    pub fn with_capacity_floor(floor: usize) -> Self {
        let floor = floor.next_power_of_two().max(2);
        Self {
            inner: Mutex::new(Ring {
                jobs: {
                    let mut v = Vec::with_capacity(floor);
                    v.resize_with(floor, || None);
                    v
                },
                head: 0,
                tail: 0,
                size: 0,
                capacity: floor,
                floor,
            }),
        }
    }

    /// Current ring capacity; changes only at the documented thresholds.
    pub fn capacity(&self) -> usize {
        self.inner.lock().expect("fcfs lock poisoned").capacity
    }
}

impl Default for FcfsQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue for FcfsQueue {
    fn push_many(&self, jobs: Vec<Job>) {
        let mut ring = self.inner.lock().expect("fcfs lock poisoned");
        for job in jobs {
            ring.push(job);
        }
    }

    fn pop_many(&self) -> Vec<Job> {
        let mut ring = self.inner.lock().expect("fcfs lock poisoned");
        let n = MAX_POP.min(ring.size);
        let mut jobs = Vec::with_capacity(n);
        for _ in 0..n {
            if let Some(job) = ring.pop() {
                jobs.push(job);
            }
        }
        jobs
    }

    fn len(&self) -> usize {
        self.inner.lock().expect("fcfs lock poisoned").size
    }
}
