//! Payload decoding: opaque JSON job payloads into typed bulk RPC requests.
//!
//! The payload schema is keyed by (resource, operation). A payload that does
//! not decode drops that single job with a warning; the rest of the batch
//! still ships.

use serde::{Deserialize, Serialize};

use crate::job::{Job, Operation, Resource};
use crate::proto;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserDto {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadUserDto {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateUserDto {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteUserDto {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProductDto {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadProductDto {
    pub product_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProductDto {
    pub product_id: i64,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteProductDto {
    pub product_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderDto {
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadOrderDto {
    pub order_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateOrderDto {
    pub order_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteOrderDto {
    pub order_id: i64,
}

impl From<CreateUserDto> for proto::User {
    fn from(dto: CreateUserDto) -> Self {
        proto::User {
            name: dto.name,
            email: dto.email,
            password: dto.password,
        }
    }
}

impl From<UpdateUserDto> for proto::User {
    fn from(dto: UpdateUserDto) -> Self {
        proto::User {
            name: dto.name,
            email: dto.email,
            password: dto.password,
        }
    }
}

impl From<DeleteUserDto> for proto::User {
    // User deletion is keyed by email; the other fields are ignored
    // backend-side.
    fn from(dto: DeleteUserDto) -> Self {
        proto::User {
            email: dto.email,
            ..Default::default()
        }
    }
}

impl From<CreateProductDto> for proto::Product {
    fn from(dto: CreateProductDto) -> Self {
        proto::Product {
            product_id: 0, // assigned by the backend
            name: dto.name,
            version: dto.version,
        }
    }
}

impl From<UpdateProductDto> for proto::Product {
    fn from(dto: UpdateProductDto) -> Self {
        proto::Product {
            product_id: dto.product_id,
            name: dto.name,
            version: dto.version,
        }
    }
}

impl From<CreateOrderDto> for proto::Order {
    fn from(dto: CreateOrderDto) -> Self {
        proto::Order {
            order_id: 0, // assigned by the backend
            user_id: dto.user_id,
            product_id: dto.product_id,
            quantity: dto.quantity,
        }
    }
}

impl From<UpdateOrderDto> for proto::Order {
    fn from(dto: UpdateOrderDto) -> Self {
        proto::Order {
            order_id: dto.order_id,
            user_id: 0,
            product_id: 0,
            quantity: dto.quantity,
        }
    }
}

impl From<ReadOrderDto> for proto::GetOrdersRequest {
    // Lookup by order ID; the user/page filters are sentinel-disabled.
    fn from(dto: ReadOrderDto) -> Self {
        proto::GetOrdersRequest {
            user_id: -1,
            page: -1,
            order_id: Some(dto.order_id),
        }
    }
}

/// A fully decoded bulk request, ready to be sent as one RPC — except for
/// reads, which the backend exposes as single-filter lookups, so a read
/// group becomes one RPC per job.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkRequest {
    CreateUsers(proto::CreateUsersRequest),
    ReadUsers(Vec<proto::GetUsersRequest>),
    UpdateUsers(proto::UpdateUsersRequest),
    DeleteUsers(proto::DeleteUsersRequest),
    CreateProducts(proto::CreateProductsRequest),
    ReadProducts(Vec<proto::GetProductsRequest>),
    UpdateProducts(proto::UpdateProductsRequest),
    DeleteProducts(proto::DeleteProductsRequest),
    CreateOrders(proto::CreateOrdersRequest),
    ReadOrders(Vec<proto::GetOrdersRequest>),
    UpdateOrders(proto::UpdateOrdersRequest),
    DeleteOrders(proto::DeleteOrdersRequest),
}

impl BulkRequest {
    /// Number of jobs represented by this request.
    pub fn len(&self) -> usize {
        match self {
            BulkRequest::CreateUsers(r) => r.users.len(),
            BulkRequest::ReadUsers(r) => r.len(),
            BulkRequest::UpdateUsers(r) => r.users.len(),
            BulkRequest::DeleteUsers(r) => r.users.len(),
            BulkRequest::CreateProducts(r) => r.products.len(),
            BulkRequest::ReadProducts(r) => r.len(),
            BulkRequest::UpdateProducts(r) => r.products.len(),
            BulkRequest::DeleteProducts(r) => r.product_ids.len(),
            BulkRequest::CreateOrders(r) => r.orders.len(),
            BulkRequest::ReadOrders(r) => r.len(),
            BulkRequest::UpdateOrders(r) => r.orders.len(),
            BulkRequest::DeleteOrders(r) => r.order_ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode a homogeneous (resource, operation) group into one bulk request.
/// Undecodable payloads are dropped individually. Returns `None` when no
/// payload survived.
pub fn decode_group(resource: Resource, operation: Operation, jobs: Vec<Job>) -> Option<BulkRequest> {
    let request = match (resource, operation) {
        (Resource::User, Operation::Create) => BulkRequest::CreateUsers(proto::CreateUsersRequest {
            users: decode_all::<CreateUserDto>(jobs).into_iter().map(Into::into).collect(),
        }),
        (Resource::User, Operation::Read) => BulkRequest::ReadUsers(
            decode_all::<ReadUserDto>(jobs)
                .into_iter()
                .map(|dto| proto::GetUsersRequest { email: dto.email })
                .collect(),
        ),
        (Resource::User, Operation::Update) => BulkRequest::UpdateUsers(proto::UpdateUsersRequest {
            users: decode_all::<UpdateUserDto>(jobs).into_iter().map(Into::into).collect(),
        }),
        (Resource::User, Operation::Delete) => BulkRequest::DeleteUsers(proto::DeleteUsersRequest {
            users: decode_all::<DeleteUserDto>(jobs).into_iter().map(Into::into).collect(),
        }),
        (Resource::Product, Operation::Create) => {
            BulkRequest::CreateProducts(proto::CreateProductsRequest {
                products: decode_all::<CreateProductDto>(jobs).into_iter().map(Into::into).collect(),
            })
        }
        (Resource::Product, Operation::Read) => BulkRequest::ReadProducts(
            decode_all::<ReadProductDto>(jobs)
                .into_iter()
                .map(|dto| proto::GetProductsRequest { product_id: dto.product_id })
                .collect(),
        ),
        (Resource::Product, Operation::Update) => {
            BulkRequest::UpdateProducts(proto::UpdateProductsRequest {
                products: decode_all::<UpdateProductDto>(jobs).into_iter().map(Into::into).collect(),
            })
        }
        (Resource::Product, Operation::Delete) => {
            BulkRequest::DeleteProducts(proto::DeleteProductsRequest {
                product_ids: decode_all::<DeleteProductDto>(jobs)
                    .into_iter()
                    .map(|dto| dto.product_id)
                    .collect(),
            })
        }
        (Resource::Order, Operation::Create) => BulkRequest::CreateOrders(proto::CreateOrdersRequest {
            orders: decode_all::<CreateOrderDto>(jobs).into_iter().map(Into::into).collect(),
        }),
        (Resource::Order, Operation::Read) => BulkRequest::ReadOrders(
            decode_all::<ReadOrderDto>(jobs).into_iter().map(Into::into).collect(),
        ),
        (Resource::Order, Operation::Update) => BulkRequest::UpdateOrders(proto::UpdateOrdersRequest {
            orders: decode_all::<UpdateOrderDto>(jobs).into_iter().map(Into::into).collect(),
        }),
        (Resource::Order, Operation::Delete) => BulkRequest::DeleteOrders(proto::DeleteOrdersRequest {
            order_ids: decode_all::<DeleteOrderDto>(jobs)
                .into_iter()
                .map(|dto| dto.order_id)
                .collect(),
        }),
    };

    if request.is_empty() {
        None
    } else {
        Some(request)
    }
}

fn decode_all<T: serde::de::DeserializeOwned>(jobs: Vec<Job>) -> Vec<T> {
    let mut decoded = Vec::with_capacity(jobs.len());
    for job in jobs {
        match serde_json::from_slice(&job.payload) {
            Ok(dto) => decoded.push(dto),
            Err(err) => tracing::warn!(
                job_id = job.id,
                resource = %job.resource,
                operation = %job.operation,
                error = %err,
                "Dropping job with undecodable payload"
            ),
        }
    }
    decoded
}
