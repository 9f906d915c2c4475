use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// How often every registered node is re-probed.
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(10);

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// A downstream compute node capable of serving bulk CRUD RPCs.
///
/// Nodes are mutable only through [`Registry`] methods; values handed out by
/// [`Registry::all`] are snapshots.
#[derive(Debug, Clone)]
pub struct BackendNode {
    pub id: u64,
    pub host: String,
    pub port: u16,
    pub healthy: bool,
    /// Number of dispatches currently in flight against this node.
    pub active_requests: u32,
}

impl BackendNode {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Health probe contract. The concrete check protocol is pluggable; the
/// registry only cares about the boolean verdict.
#[tonic::async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, node: &BackendNode) -> bool;
}

/// Default probe: a plain TCP connect to the node address with a short
/// timeout. Cheap, protocol-agnostic, and good enough to catch dead hosts.
pub struct TcpProbe;

#[tonic::async_trait]
impl HealthProbe for TcpProbe {
    async fn probe(&self, node: &BackendNode) -> bool {
        matches!(
            tokio::time::timeout(PROBE_TIMEOUT, tokio::net::TcpStream::connect(node.addr())).await,
            Ok(Ok(_))
        )
    }
}

/// Tracks backend nodes and their health state.
///
/// Reads take a shared lock and return defensive copies; mutations take the
/// exclusive lock. Node IDs are unique and monotonically assigned.
#[derive(Debug, Default)]
pub struct Registry {
    nodes: RwLock<Vec<BackendNode>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node and return its assigned ID. Nodes start unhealthy
    /// until the first probe says otherwise.
    pub fn add(&self, host: impl Into<String>, port: u16) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let node = BackendNode {
            id,
            host: host.into(),
            port,
            healthy: false,
            active_requests: 0,
        };
        tracing::info!(node_id = id, addr = %node.addr(), "Backend node registered");
        self.nodes
            .write()
            .expect("registry lock poisoned")
            .push(node);
        id
    }

    /// Snapshot of all nodes. Callers iterate without racing mutations.
    pub fn all(&self) -> Vec<BackendNode> {
        self.nodes.read().expect("registry lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_health(&self, id: u64, healthy: bool) {
        let mut nodes = self.nodes.write().expect("registry lock poisoned");
        if let Some(node) = nodes.iter_mut().find(|n| n.id == id) {
            if node.healthy != healthy {
                tracing::info!(node_id = id, healthy, "Backend health changed");
            }
            node.healthy = healthy;
        }
    }

    /// Remove a node; returns whether a matching node was found.
    pub fn remove(&self, id: u64) -> bool {
        let mut nodes = self.nodes.write().expect("registry lock poisoned");
        let before = nodes.len();
        nodes.retain(|n| n.id != id);
        before != nodes.len()
    }

    pub fn begin_request(&self, id: u64) {
        let mut nodes = self.nodes.write().expect("registry lock poisoned");
        if let Some(node) = nodes.iter_mut().find(|n| n.id == id) {
            node.active_requests += 1;
        }
    }

    pub fn end_request(&self, id: u64) {
        let mut nodes = self.nodes.write().expect("registry lock poisoned");
        if let Some(node) = nodes.iter_mut().find(|n| n.id == id) {
            node.active_requests = node.active_requests.saturating_sub(1);
        }
    }

    /// Probe every registered node on a fixed interval until cancelled.
    /// Runs against a snapshot, so membership changes take effect on the
    /// next tick.
    pub async fn health_check_loop(&self, probe: &dyn HealthProbe, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
        // The first tick completes immediately; skip it so freshly added
        // nodes get a full interval before the initial probe.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = cancel.cancelled() => {
                    tracing::debug!("Health check loop stopped");
                    return;
                }
            }

            for node in self.all() {
                let healthy = probe.probe(&node).await;
                self.set_health(node.id, healthy);
            }
        }
    }
}
