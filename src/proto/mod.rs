//! Generated protobuf/gRPC bindings for the backend bulk CRUD surface.
//!
//! The output of `tonic-build` on `proto/backend.proto` is checked in here so
//! that building the crate does not require `protoc`. Regenerate after any
//! contract change.

mod backend;

pub use backend::*;
