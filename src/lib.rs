//! Batching, load-balancing front for bulk CRUD backends.
//!
//! Jobs arrive over HTTP, accumulate in a per-resource batcher, flow through
//! a pluggable ordering queue, and are dispatched by a worker pool as bulk
//! gRPC calls against a health-monitored set of backend nodes.

pub mod batcher;
pub mod config;
pub mod error;
pub mod grpc;
pub mod ingest;
pub mod job;
pub mod proto;
pub mod queue;
pub mod registry;
pub mod selector;
pub mod shutdown;
pub mod worker;
