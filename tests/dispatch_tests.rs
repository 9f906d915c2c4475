//! End-to-end dispatch tests against an in-process gRPC backend that
//! records every request it receives.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

use load_manager::job::{Job, Operation, Resource};
use load_manager::proto;
use load_manager::proto::order_service_server::{OrderService, OrderServiceServer};
use load_manager::proto::product_service_server::{ProductService, ProductServiceServer};
use load_manager::proto::user_service_server::{UserService, UserServiceServer};
use load_manager::queue::{FcfsQueue, JobQueue};
use load_manager::registry::Registry;
use load_manager::selector::RoundRobin;
use load_manager::worker::{Strategy, WorkerPool};

#[derive(Clone, Default)]
struct RecordingBackend {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    created_users: Vec<proto::User>,
    updated_users: Vec<proto::User>,
    deleted_users: Vec<proto::User>,
    user_lookups: Vec<String>,
    created_products: Vec<proto::Product>,
    updated_products: Vec<proto::Product>,
    deleted_product_ids: Vec<i64>,
    product_lookups: Vec<i64>,
    created_orders: Vec<proto::Order>,
    updated_orders: Vec<proto::Order>,
    deleted_order_ids: Vec<i64>,
    order_lookups: Vec<proto::GetOrdersRequest>,
}

impl RecordingBackend {
    fn with<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&self.state.lock().unwrap())
    }
}

fn ack(affected: usize) -> Response<proto::Ack> {
    Response::new(proto::Ack {
        affected: affected as i64,
    })
}

#[tonic::async_trait]
impl UserService for RecordingBackend {
    async fn create_users(
        &self,
        request: Request<proto::CreateUsersRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let users = request.into_inner().users;
        let n = users.len();
        self.state.lock().unwrap().created_users.extend(users);
        Ok(ack(n))
    }

    async fn get_users(
        &self,
        request: Request<proto::GetUsersRequest>,
    ) -> Result<Response<proto::GetUsersResponse>, Status> {
        let email = request.into_inner().email;
        self.state.lock().unwrap().user_lookups.push(email);
        Ok(Response::new(proto::GetUsersResponse { users: vec![] }))
    }

    async fn update_users(
        &self,
        request: Request<proto::UpdateUsersRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let users = request.into_inner().users;
        let n = users.len();
        self.state.lock().unwrap().updated_users.extend(users);
        Ok(ack(n))
    }

    async fn delete_users(
        &self,
        request: Request<proto::DeleteUsersRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let users = request.into_inner().users;
        let n = users.len();
        self.state.lock().unwrap().deleted_users.extend(users);
        Ok(ack(n))
    }
}

#[tonic::async_trait]
impl ProductService for RecordingBackend {
    async fn create_products(
        &self,
        request: Request<proto::CreateProductsRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let products = request.into_inner().products;
        let n = products.len();
        self.state.lock().unwrap().created_products.extend(products);
        Ok(ack(n))
    }

    async fn get_products(
        &self,
        request: Request<proto::GetProductsRequest>,
    ) -> Result<Response<proto::GetProductsResponse>, Status> {
        let product_id = request.into_inner().product_id;
        self.state.lock().unwrap().product_lookups.push(product_id);
        Ok(Response::new(proto::GetProductsResponse { products: vec![] }))
    }

    async fn update_products(
        &self,
        request: Request<proto::UpdateProductsRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let products = request.into_inner().products;
        let n = products.len();
        self.state.lock().unwrap().updated_products.extend(products);
        Ok(ack(n))
    }

    async fn delete_products(
        &self,
        request: Request<proto::DeleteProductsRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let ids = request.into_inner().product_ids;
        let n = ids.len();
        self.state.lock().unwrap().deleted_product_ids.extend(ids);
        Ok(ack(n))
    }
}

#[tonic::async_trait]
impl OrderService for RecordingBackend {
    async fn create_orders(
        &self,
        request: Request<proto::CreateOrdersRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let orders = request.into_inner().orders;
        let n = orders.len();
        self.state.lock().unwrap().created_orders.extend(orders);
        Ok(ack(n))
    }

    async fn get_orders(
        &self,
        request: Request<proto::GetOrdersRequest>,
    ) -> Result<Response<proto::GetOrdersResponse>, Status> {
        self.state.lock().unwrap().order_lookups.push(request.into_inner());
        Ok(Response::new(proto::GetOrdersResponse { orders: vec![] }))
    }

    async fn update_orders(
        &self,
        request: Request<proto::UpdateOrdersRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let orders = request.into_inner().orders;
        let n = orders.len();
        self.state.lock().unwrap().updated_orders.extend(orders);
        Ok(ack(n))
    }

    async fn delete_orders(
        &self,
        request: Request<proto::DeleteOrdersRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let ids = request.into_inner().order_ids;
        let n = ids.len();
        self.state.lock().unwrap().deleted_order_ids.extend(ids);
        Ok(ack(n))
    }
}

async fn start_backend() -> (RecordingBackend, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let backend = RecordingBackend::default();

    let services = backend.clone();
    tokio::spawn(async move {
        Server::builder()
            .add_service(UserServiceServer::new(services.clone()))
            .add_service(ProductServiceServer::new(services.clone()))
            .add_service(OrderServiceServer::new(services))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    (backend, addr)
}

fn harness(addr: SocketAddr, strategy: Strategy) -> (Arc<FcfsQueue>, Arc<Registry>, WorkerPool) {
    let queue = Arc::new(FcfsQueue::new());
    let registry = Arc::new(Registry::new());
    registry.add(addr.ip().to_string(), addr.port());
    let pool = WorkerPool::new(
        queue.clone(),
        registry.clone(),
        Arc::new(RoundRobin::new()),
        strategy,
        1,
    );
    (queue, registry, pool)
}

async fn wait_until(backend: &RecordingBackend, cond: impl Fn(&State) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if backend.with(&cond) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("backend never received the expected requests");
}

fn job(resource: Resource, operation: Operation, payload: serde_json::Value) -> Job {
    Job::new(resource, operation, serde_json::to_vec(&payload).unwrap())
}

#[tokio::test]
async fn mixed_batch_reaches_the_backend_as_bulk_requests() {
    let (backend, addr) = start_backend().await;
    let (queue, registry, pool) = harness(addr, Strategy::Mixed);

    queue.push_many(vec![
        job(
            Resource::User,
            Operation::Create,
            json!({"name": "ada", "email": "ada@example.com", "password": "pw"}),
        ),
        job(
            Resource::User,
            Operation::Create,
            json!({"name": "grace", "email": "grace@example.com", "password": "pw"}),
        ),
        job(Resource::Product, Operation::Delete, json!({"product_id": 7})),
        job(Resource::Product, Operation::Delete, json!({"product_id": 9})),
    ]);

    let handles = pool.spawn();
    wait_until(&backend, |s| {
        s.created_users.len() == 2 && s.deleted_product_ids.len() == 2
    })
    .await;

    backend.with(|s| {
        assert_eq!(s.created_users[0].email, "ada@example.com");
        assert_eq!(s.created_users[1].email, "grace@example.com");
        assert_eq!(s.deleted_product_ids, vec![7, 9]);
    });

    // In-flight accounting returned to zero after delivery.
    assert_eq!(registry.all()[0].active_requests, 0);
    assert!(queue.is_empty());

    pool.stop();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn read_groups_fan_out_into_one_lookup_per_job() {
    let (backend, addr) = start_backend().await;
    let (queue, _registry, pool) = harness(addr, Strategy::Mixed);

    queue.push_many(vec![
        job(Resource::Order, Operation::Read, json!({"order_id": 1})),
        job(Resource::Order, Operation::Read, json!({"order_id": 2})),
        job(Resource::Order, Operation::Read, json!({"order_id": 3})),
    ]);

    let handles = pool.spawn();
    wait_until(&backend, |s| s.order_lookups.len() == 3).await;

    backend.with(|s| {
        let ids: Vec<i64> = s.order_lookups.iter().filter_map(|r| r.order_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(s.order_lookups.iter().all(|r| r.user_id == -1 && r.page == -1));
    });

    pool.stop();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn undecodable_job_is_dropped_but_the_rest_of_the_group_ships() {
    let (backend, addr) = start_backend().await;
    let (queue, _registry, pool) = harness(addr, Strategy::PerResourceAndOperation);

    queue.push_many(vec![
        Job::new(Resource::Order, Operation::Update, b"not json".to_vec()),
        job(
            Resource::Order,
            Operation::Update,
            json!({"order_id": 4, "quantity": 2}),
        ),
    ]);

    let handles = pool.spawn();
    wait_until(&backend, |s| !s.updated_orders.is_empty()).await;

    backend.with(|s| {
        assert_eq!(s.updated_orders.len(), 1);
        assert_eq!(s.updated_orders[0].order_id, 4);
        assert_eq!(s.updated_orders[0].quantity, 2);
    });

    pool.stop();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn every_operation_shape_round_trips() {
    let (backend, addr) = start_backend().await;
    let (queue, _registry, pool) = harness(addr, Strategy::PerOperation);

    queue.push_many(vec![
        job(
            Resource::User,
            Operation::Update,
            json!({"name": "ada", "email": "ada@example.com", "password": "new"}),
        ),
        job(Resource::User, Operation::Delete, json!({"email": "old@example.com"})),
        job(Resource::User, Operation::Read, json!({"email": "who@example.com"})),
        job(
            Resource::Product,
            Operation::Create,
            json!({"name": "widget", "version": "1.2.3"}),
        ),
        job(
            Resource::Product,
            Operation::Update,
            json!({"product_id": 3, "name": "widget", "version": "1.2.4"}),
        ),
        job(Resource::Product, Operation::Read, json!({"product_id": 3})),
        job(
            Resource::Order,
            Operation::Create,
            json!({"user_id": 1, "product_id": 3, "quantity": 5}),
        ),
        job(Resource::Order, Operation::Delete, json!({"order_id": 8})),
    ]);

    let handles = pool.spawn();
    wait_until(&backend, |s| {
        s.updated_users.len() == 1
            && s.deleted_users.len() == 1
            && s.user_lookups.len() == 1
            && s.created_products.len() == 1
            && s.updated_products.len() == 1
            && s.product_lookups.len() == 1
            && s.created_orders.len() == 1
            && s.deleted_order_ids.len() == 1
    })
    .await;

    backend.with(|s| {
        assert_eq!(s.deleted_users[0].email, "old@example.com");
        assert_eq!(s.user_lookups[0], "who@example.com");
        assert_eq!(s.created_products[0].name, "widget");
        assert_eq!(s.created_products[0].product_id, 0);
        assert_eq!(s.updated_products[0].version, "1.2.4");
        assert_eq!(s.product_lookups[0], 3);
        assert_eq!(s.created_orders[0].quantity, 5);
        assert_eq!(s.deleted_order_ids[0], 8);
    });

    pool.stop();
    for handle in handles {
        handle.await.unwrap();
    }
}
