use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Resource type a job targets. Payload schemas are keyed by
/// (resource, operation) and only decoded at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    User,
    Product,
    Order,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::User, Resource::Product, Resource::Order];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::User => write!(f, "user"),
            Resource::Product => write!(f, "product"),
            Resource::Order => write!(f, "order"),
        }
    }
}

/// CRUD operation carried by a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// An immutable unit of work. Created once at ingestion, moved through the
/// batcher and queue, consumed exactly once by a worker (or dropped on a
/// decode failure). Never mutated after construction.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: u64,
    pub resource: Resource,
    pub operation: Operation,
    /// Opaque JSON payload; schema is selected by (resource, operation)
    /// and only decoded at dispatch time.
    pub payload: Vec<u8>,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Build a job with a fresh process-wide monotonic ID. IDs are assigned
    /// once at ingestion and never reused.
    pub fn new(resource: Resource, operation: Operation, payload: Vec<u8>) -> Self {
        Self {
            id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
            resource,
            operation,
            payload,
            priority: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_monotonic_and_unique() {
        let a = Job::new(Resource::User, Operation::Create, vec![]);
        let b = Job::new(Resource::User, Operation::Create, vec![]);
        let c = Job::new(Resource::Order, Operation::Delete, vec![]);
        assert!(a.id < b.id);
        assert!(b.id < c.id);
    }

    #[test]
    fn job_defaults() {
        let job = Job::new(Resource::Product, Operation::Update, b"{}".to_vec());
        assert_eq!(job.resource, Resource::Product);
        assert_eq!(job.operation, Operation::Update);
        assert_eq!(job.priority, 0);
        assert_eq!(job.payload, b"{}");
    }

    #[test]
    fn with_priority_overrides_hint() {
        let job = Job::new(Resource::User, Operation::Read, vec![]).with_priority(7);
        assert_eq!(job.priority, 7);
    }
}
