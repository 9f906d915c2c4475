//! Pooled gRPC clients for backend nodes.

mod client;

pub use client::{BackendClient, ClientPool, RPC_DEADLINE};
