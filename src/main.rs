use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use load_manager::batcher::Batcher;
use load_manager::config::{BackendAddr, Config};
use load_manager::queue::QueueAlgorithm;
use load_manager::registry::{Registry, TcpProbe};
use load_manager::selector::SelectorPolicy;
use load_manager::shutdown::install_shutdown_handler;
use load_manager::worker::{Strategy, WorkerPool};
use load_manager::{ingest, error};

#[derive(Parser, Debug)]
#[command(name = "load-manager")]
#[command(version)]
#[command(about = "Batching, load-balancing front for bulk CRUD backends")]
struct Args {
    /// Backend node address (host:port); repeat for multiple nodes
    #[arg(long = "backend", short = 'a', required = true)]
    backends: Vec<BackendAddr>,

    /// Queue ordering algorithm
    #[arg(long, value_enum, default_value = "fcfs")]
    queue: QueueAlgorithm,

    /// Node selection policy
    #[arg(long, value_enum, default_value = "round-robin")]
    selector: SelectorPolicy,

    /// Load-balancing strategy
    #[arg(long, value_enum, default_value = "mixed")]
    strategy: Strategy,

    /// Per-resource pending threshold that triggers an immediate flush
    #[arg(long, default_value = "10")]
    batch_size: usize,

    /// Flush timer period in milliseconds
    #[arg(long, default_value = "2000")]
    batch_timeout_ms: u64,

    /// Number of dispatch workers
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Address for the HTTP ingestion server
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config {
        queue: args.queue,
        selector: args.selector,
        strategy: args.strategy,
        batch_size: args.batch_size,
        batch_timeout: Duration::from_millis(args.batch_timeout_ms),
        workers: args.workers,
        backends: args.backends,
        listen_addr: args.listen,
    };
    config.validate()?;

    run(config).await?;
    Ok(())
}

async fn run(config: Config) -> error::Result<()> {
    tracing::info!(
        queue = ?config.queue,
        selector = ?config.selector,
        strategy = ?config.strategy,
        batch_size = config.batch_size,
        batch_timeout = ?config.batch_timeout,
        workers = config.workers,
        backends = config.backends.len(),
        listen = %config.listen_addr,
        "Starting load manager"
    );

    let cancel = install_shutdown_handler();

    let registry = Arc::new(Registry::new());
    for backend in &config.backends {
        registry.add(backend.host.clone(), backend.port);
    }

    let queue = config.queue.build();
    let batcher = Arc::new(Batcher::new(
        queue.clone(),
        config.batch_size,
        config.batch_timeout,
    ));
    let pool = WorkerPool::new(
        queue,
        registry.clone(),
        config.selector.build(),
        config.strategy,
        config.workers,
    );

    let health_registry = registry.clone();
    let health_cancel = cancel.clone();
    let health_handle = tokio::spawn(async move {
        health_registry
            .health_check_loop(&TcpProbe, health_cancel)
            .await;
    });

    let flush_batcher = batcher.clone();
    let flush_handle = tokio::spawn(async move { flush_batcher.run().await });

    let worker_handles = pool.spawn();

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    tracing::info!(addr = %config.listen_addr, "Ingestion server listening");
    let server_cancel = cancel.clone();
    axum::serve(listener, ingest::router(batcher.clone()))
        .with_graceful_shutdown(async move { server_cancel.cancelled().await })
        .await?;

    // Ingestion has stopped; drain in dependency order.
    batcher.stop();
    pool.stop();
    for handle in worker_handles {
        let _ = handle.await;
    }
    let _ = flush_handle.await;
    let _ = health_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
