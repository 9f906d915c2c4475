use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::LoadManagerError;
use crate::queue::QueueAlgorithm;
use crate::selector::SelectorPolicy;
use crate::worker::Strategy;

/// A backend node address in `host:port` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAddr {
    pub host: String,
    pub port: u16,
}

impl FromStr for BackendAddr {
    type Err = LoadManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| LoadManagerError::InvalidAddress(s.to_string()))?;
        if host.is_empty() {
            return Err(LoadManagerError::InvalidAddress(s.to_string()));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| LoadManagerError::InvalidAddress(s.to_string()))?;
        if port == 0 {
            return Err(LoadManagerError::InvalidAddress(s.to_string()));
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl std::fmt::Display for BackendAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Full runtime configuration, assembled from CLI arguments.
#[derive(Debug, Clone)]
pub struct Config {
    pub queue: QueueAlgorithm,
    pub selector: SelectorPolicy,
    pub strategy: Strategy,
    /// Per-resource pending threshold that triggers an immediate flush.
    pub batch_size: usize,
    /// Upper bound on how long an undersized batch waits before flushing.
    pub batch_timeout: Duration,
    pub workers: usize,
    pub backends: Vec<BackendAddr>,
    /// Address the HTTP ingestion server binds to.
    pub listen_addr: SocketAddr,
}

impl Config {
    pub fn validate(&self) -> Result<(), LoadManagerError> {
        if self.batch_size == 0 {
            return Err(LoadManagerError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.batch_timeout.is_zero() {
            return Err(LoadManagerError::InvalidConfig(
                "batch timeout must be positive".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(LoadManagerError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.backends.is_empty() {
            return Err(LoadManagerError::InvalidConfig(
                "at least one backend address is required".to_string(),
            ));
        }
        Ok(())
    }
}
