use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use tonic::transport::{Channel, Endpoint};

use crate::error::Result;
use crate::proto::order_service_client::OrderServiceClient;
use crate::proto::product_service_client::ProductServiceClient;
use crate::proto::user_service_client::UserServiceClient;
use crate::registry::BackendNode;

/// Per-call deadline applied to every backend RPC.
pub const RPC_DEADLINE: Duration = Duration::from_secs(5);

/// One persistent client per backend node: the three service clients share
/// a single lazily connected channel.
#[derive(Clone)]
pub struct BackendClient {
    pub users: UserServiceClient<Channel>,
    pub products: ProductServiceClient<Channel>,
    pub orders: OrderServiceClient<Channel>,
}

impl BackendClient {
    /// Build a client for `host:port`. The underlying channel connects on
    /// first use, so construction never blocks on the network.
    pub fn connect_lazy(addr: &str) -> Result<Self> {
        let channel = Endpoint::from_shared(format!("http://{addr}"))?
            .timeout(RPC_DEADLINE)
            .connect_timeout(RPC_DEADLINE)
            .connect_lazy();

        Ok(Self {
            users: UserServiceClient::new(channel.clone()),
            products: ProductServiceClient::new(channel.clone()),
            orders: OrderServiceClient::new(channel),
        })
    }
}

/// Client cache keyed by `host:port`.
///
/// Lookups take the read lock; a miss upgrades to the write lock and
/// re-checks before creating, so concurrent first users of a node share one
/// channel instead of racing to open duplicates.
#[derive(Default)]
pub struct ClientPool {
    clients: RwLock<HashMap<String, BackendClient>>,
}

impl ClientPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: &BackendNode) -> Result<BackendClient> {
        let addr = node.addr();

        if let Some(client) = self
            .clients
            .read()
            .expect("client pool lock poisoned")
            .get(&addr)
        {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().expect("client pool lock poisoned");
        if let Some(client) = clients.get(&addr) {
            return Ok(client.clone());
        }

        tracing::debug!(%addr, "Opening backend channel");
        let client = BackendClient::connect_lazy(&addr)?;
        clients.insert(addr, client.clone());
        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.clients.read().expect("client pool lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
