//! Sending planned dispatch groups to their assigned backend nodes.
//!
//! Delivery is fire-and-forget: every failure path logs and drops. Transport
//! and RPC errors never propagate back to producers, and there are no
//! retries.

use crate::error::Result;
use crate::grpc::{BackendClient, ClientPool};
use crate::registry::Registry;
use crate::worker::codec::{decode_group, BulkRequest};
use crate::worker::strategy::DispatchGroup;

/// Decode one group and deliver it to its node. In-flight accounting on the
/// registry brackets the send so load numbers stay accurate even when the
/// RPC fails.
pub async fn dispatch_group(group: DispatchGroup, registry: &Registry, pool: &ClientPool) {
    let DispatchGroup {
        node,
        resource,
        operation,
        jobs,
    } = group;

    let count = jobs.len();
    let Some(request) = decode_group(resource, operation, jobs) else {
        tracing::warn!(%resource, %operation, count, "Entire group undecodable, nothing sent");
        return;
    };

    let client = match pool.get(&node) {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(addr = %node.addr(), error = %err, "Dropping group, no client for node");
            return;
        }
    };

    registry.begin_request(node.id);
    let outcome = send(client, request).await;
    registry.end_request(node.id);

    match outcome {
        Ok(affected) => tracing::info!(
            addr = %node.addr(),
            %resource,
            %operation,
            jobs = count,
            affected,
            "Dispatched batch"
        ),
        Err(err) => tracing::error!(
            addr = %node.addr(),
            %resource,
            %operation,
            jobs = count,
            error = %err,
            "Dispatch failed, dropping batch"
        ),
    }
}

/// Issue the RPC(s) for one bulk request and return the affected/row count
/// reported by the backend. Read groups fan out into one lookup per filter.
async fn send(mut client: BackendClient, request: BulkRequest) -> Result<i64> {
    let affected = match request {
        BulkRequest::CreateUsers(req) => client.users.create_users(req).await?.into_inner().affected,
        BulkRequest::ReadUsers(reqs) => {
            let mut rows = 0;
            for req in reqs {
                rows += client.users.get_users(req).await?.into_inner().users.len() as i64;
            }
            rows
        }
        BulkRequest::UpdateUsers(req) => client.users.update_users(req).await?.into_inner().affected,
        BulkRequest::DeleteUsers(req) => client.users.delete_users(req).await?.into_inner().affected,
        BulkRequest::CreateProducts(req) => {
            client.products.create_products(req).await?.into_inner().affected
        }
        BulkRequest::ReadProducts(reqs) => {
            let mut rows = 0;
            for req in reqs {
                rows += client.products.get_products(req).await?.into_inner().products.len() as i64;
            }
            rows
        }
        BulkRequest::UpdateProducts(req) => {
            client.products.update_products(req).await?.into_inner().affected
        }
        BulkRequest::DeleteProducts(req) => {
            client.products.delete_products(req).await?.into_inner().affected
        }
        BulkRequest::CreateOrders(req) => client.orders.create_orders(req).await?.into_inner().affected,
        BulkRequest::ReadOrders(reqs) => {
            let mut rows = 0;
            for req in reqs {
                rows += client.orders.get_orders(req).await?.into_inner().orders.len() as i64;
            }
            rows
        }
        BulkRequest::UpdateOrders(req) => client.orders.update_orders(req).await?.into_inner().affected,
        BulkRequest::DeleteOrders(req) => client.orders.delete_orders(req).await?.into_inner().affected,
    };
    Ok(affected)
}
