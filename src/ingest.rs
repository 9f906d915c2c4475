//! HTTP ingestion surface: one route per resource, one method per CRUD
//! operation. Handlers validate the payload shape, hand the job to the
//! batcher, and return immediately; delivery is asynchronous.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::batcher::Batcher;
use crate::job::{Job, Operation, Resource};
use crate::worker::codec::{
    CreateOrderDto, CreateProductDto, CreateUserDto, DeleteOrderDto, DeleteProductDto,
    DeleteUserDto, ReadOrderDto, ReadProductDto, ReadUserDto, UpdateOrderDto, UpdateProductDto,
    UpdateUserDto,
};

#[derive(Clone)]
struct AppState {
    batcher: Arc<Batcher>,
}

/// Build the ingestion router. Mutations carry JSON bodies; reads and
/// deletes are keyed by query parameters.
pub fn router(batcher: Arc<Batcher>) -> Router {
    Router::new()
        .route(
            "/users",
            post(create_user)
                .get(read_user)
                .put(update_user)
                .delete(delete_user),
        )
        .route(
            "/products",
            post(create_product)
                .get(read_product)
                .put(update_product)
                .delete(delete_product),
        )
        .route(
            "/orders",
            post(create_order)
                .get(read_order)
                .put(update_order)
                .delete(delete_order),
        )
        .with_state(AppState { batcher })
}

/// Re-encode the validated DTO and queue it. Returns 202: acceptance means
/// "queued", not "applied".
fn enqueue(state: &AppState, resource: Resource, operation: Operation, dto: &impl Serialize) -> StatusCode {
    match serde_json::to_vec(dto) {
        Ok(payload) => {
            state.batcher.add(Job::new(resource, operation, payload));
            StatusCode::ACCEPTED
        }
        Err(err) => {
            tracing::error!(%resource, %operation, error = %err, "Failed to encode payload");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn create_user(State(state): State<AppState>, Json(dto): Json<CreateUserDto>) -> StatusCode {
    enqueue(&state, Resource::User, Operation::Create, &dto)
}

async fn read_user(State(state): State<AppState>, Query(dto): Query<ReadUserDto>) -> StatusCode {
    enqueue(&state, Resource::User, Operation::Read, &dto)
}

async fn update_user(State(state): State<AppState>, Json(dto): Json<UpdateUserDto>) -> StatusCode {
    enqueue(&state, Resource::User, Operation::Update, &dto)
}

async fn delete_user(State(state): State<AppState>, Query(dto): Query<DeleteUserDto>) -> StatusCode {
    enqueue(&state, Resource::User, Operation::Delete, &dto)
}

async fn create_product(
    State(state): State<AppState>,
    Json(dto): Json<CreateProductDto>,
) -> StatusCode {
    enqueue(&state, Resource::Product, Operation::Create, &dto)
}

async fn read_product(
    State(state): State<AppState>,
    Query(dto): Query<ReadProductDto>,
) -> StatusCode {
    enqueue(&state, Resource::Product, Operation::Read, &dto)
}

async fn update_product(
    State(state): State<AppState>,
    Json(dto): Json<UpdateProductDto>,
) -> StatusCode {
    enqueue(&state, Resource::Product, Operation::Update, &dto)
}

async fn delete_product(
    State(state): State<AppState>,
    Query(dto): Query<DeleteProductDto>,
) -> StatusCode {
    enqueue(&state, Resource::Product, Operation::Delete, &dto)
}

async fn create_order(State(state): State<AppState>, Json(dto): Json<CreateOrderDto>) -> StatusCode {
    enqueue(&state, Resource::Order, Operation::Create, &dto)
}

async fn read_order(State(state): State<AppState>, Query(dto): Query<ReadOrderDto>) -> StatusCode {
    enqueue(&state, Resource::Order, Operation::Read, &dto)
}

async fn update_order(State(state): State<AppState>, Json(dto): Json<UpdateOrderDto>) -> StatusCode {
    enqueue(&state, Resource::Order, Operation::Update, &dto)
}

async fn delete_order(State(state): State<AppState>, Query(dto): Query<DeleteOrderDto>) -> StatusCode {
    enqueue(&state, Resource::Order, Operation::Delete, &dto)
}
