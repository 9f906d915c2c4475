use std::collections::HashSet;

use load_manager::job::{Job, Operation, Resource};
use load_manager::queue::{FcfsQueue, HeapQueue, JobQueue, QueueAlgorithm, StackQueue, MAX_POP};

fn job_with_payload(len: usize) -> Job {
    Job::new(Resource::User, Operation::Create, vec![b'x'; len])
}

fn drain(queue: &dyn JobQueue) -> Vec<Job> {
    let mut all = Vec::new();
    loop {
        let batch = queue.pop_many();
        if batch.is_empty() {
            return all;
        }
        assert!(batch.len() <= MAX_POP);
        all.extend(batch);
    }
}

#[test]
fn every_algorithm_conserves_jobs() {
    for algorithm in [
        QueueAlgorithm::Fcfs,
        QueueAlgorithm::Sjf,
        QueueAlgorithm::Ljf,
        QueueAlgorithm::Random,
        QueueAlgorithm::Stack,
    ] {
        let queue = algorithm.build();
        let mut pushed = HashSet::new();
        for chunk in 0..3 {
            let batch: Vec<Job> = (0..100).map(|i| job_with_payload(chunk * 100 + i)).collect();
            pushed.extend(batch.iter().map(|j| j.id));
            queue.push_many(batch);
        }
        assert_eq!(queue.len(), 300);

        let popped: HashSet<u64> = drain(queue.as_ref()).into_iter().map(|j| j.id).collect();
        assert_eq!(popped, pushed, "{algorithm:?} lost or duplicated jobs");
        assert!(queue.is_empty());
    }
}

#[test]
fn every_algorithm_bounds_a_single_pop() {
    for algorithm in [
        QueueAlgorithm::Fcfs,
        QueueAlgorithm::Sjf,
        QueueAlgorithm::Ljf,
        QueueAlgorithm::Random,
        QueueAlgorithm::Stack,
    ] {
        let queue = algorithm.build();
        queue.push_many((0..200).map(|_| job_with_payload(4)).collect());

        assert_eq!(queue.pop_many().len(), MAX_POP, "{algorithm:?}");
        assert_eq!(queue.pop_many().len(), 200 - MAX_POP, "{algorithm:?}");
        assert!(queue.pop_many().is_empty(), "{algorithm:?}");
    }
}

#[test]
fn fcfs_grows_past_the_floor_and_shrinks_back() {
    let queue = FcfsQueue::new();
    assert_eq!(queue.capacity(), 128);

    // One past full doubles the ring.
    queue.push_many((0..129).map(|_| job_with_payload(1)).collect());
    assert_eq!(queue.capacity(), 256);

    // Draining crosses the quarter-occupancy threshold and halves it back
    // down to the floor, never below.
    let first = queue.pop_many();
    assert_eq!(first.len(), MAX_POP);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.capacity(), 128);

    queue.pop_many();
    assert_eq!(queue.capacity(), 128);
}

#[test]
fn fcfs_returns_jobs_in_arrival_order_across_batches() {
    let queue = FcfsQueue::new();
    let mut expected = Vec::new();
    for _ in 0..4 {
        let batch: Vec<Job> = (0..10).map(|_| job_with_payload(2)).collect();
        expected.extend(batch.iter().map(|j| j.id));
        queue.push_many(batch);
    }

    let popped: Vec<u64> = drain(&queue).into_iter().map(|j| j.id).collect();
    assert_eq!(popped, expected);
}

#[test]
fn shortest_first_orders_by_payload_length() {
    let queue = HeapQueue::shortest_first();
    queue.push_many(vec![job_with_payload(50), job_with_payload(5)]);
    queue.push_many(vec![job_with_payload(20), job_with_payload(80), job_with_payload(1)]);

    let lengths: Vec<usize> = drain(&queue).into_iter().map(|j| j.payload.len()).collect();
    assert_eq!(lengths, vec![1, 5, 20, 50, 80]);
}

#[test]
fn longest_first_orders_by_payload_length() {
    let queue = HeapQueue::longest_first();
    queue.push_many(vec![job_with_payload(50), job_with_payload(5)]);
    queue.push_many(vec![job_with_payload(20), job_with_payload(80), job_with_payload(1)]);

    let lengths: Vec<usize> = drain(&queue).into_iter().map(|j| j.payload.len()).collect();
    assert_eq!(lengths, vec![80, 50, 20, 5, 1]);
}

#[test]
fn stack_returns_newest_first_across_batches() {
    let queue = StackQueue::new();
    let first: Vec<Job> = (0..3).map(|_| job_with_payload(1)).collect();
    let second: Vec<Job> = (0..3).map(|_| job_with_payload(1)).collect();
    let mut expected: Vec<u64> = first.iter().chain(second.iter()).map(|j| j.id).collect();
    expected.reverse();

    queue.push_many(first);
    queue.push_many(second);

    let popped: Vec<u64> = drain(&queue).into_iter().map(|j| j.id).collect();
    assert_eq!(popped, expected);
}
