use thiserror::Error;

use crate::job::{Operation, Resource};

#[derive(Error, Debug)]
pub enum LoadManagerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid backend address {0:?}, expected host:port")]
    InvalidAddress(String),

    #[error("no backend nodes available")]
    NoAvailableNodes,

    #[error("failed to decode {resource} {operation} payload: {source}")]
    Decode {
        resource: Resource,
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },

    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::Status),

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LoadManagerError>;
