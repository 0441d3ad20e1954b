use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod clients;
mod config;
mod domain;
mod errors;
mod health;
mod metrics;
mod models;
mod store;
mod utils;
#[cfg(test)]
mod testing;

use clients::{InventoryClient, PaymentClient, RemoteEndpoint};
use config::{AppConfig, StoreBackend};
use domain::order::{AggregationReader, OrderOrchestrator, OrderService};
use errors::Dependency;
use health::HealthCheckable;
use store::{InMemoryOrderStore, OrderStore, ScyllaOrderStore};
use utils::CircuitBreaker;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_service=debug"))
        )
        .init();

    tracing::info!("🚀 Starting order service");

    // === 1. Configuration ===
    let config = AppConfig::from_env()?;
    tracing::info!(
        product_service = %config.product_service_url,
        payment_service = %config.payment_service_url,
        shared_breaker = config.shared_breaker,
        "Configuration loaded"
    );

    // === 2. Initialize Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Circuit breakers ===
    // A shared breaker lets an outage of one dependency short-circuit calls
    // to the other.
    let (product_breaker, payment_breaker) = if config.shared_breaker {
        let shared = Arc::new(
            CircuitBreaker::new("external", config.breaker.clone()).with_metrics(metrics.clone()),
        );
        (shared.clone(), shared)
    } else {
        let breaker = |dependency: Dependency| {
            Arc::new(
                CircuitBreaker::new(dependency.name(), config.breaker.clone())
                    .with_metrics(metrics.clone()),
            )
        };
        (
            breaker(Dependency::ProductService),
            breaker(Dependency::PaymentService),
        )
    };

    // === 4. Remote clients ===
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .build()?;

    let inventory = Arc::new(InventoryClient::new(RemoteEndpoint::new(
        Dependency::ProductService,
        config.product_service_url.clone(),
        http.clone(),
        product_breaker,
        config.retry.clone(),
        metrics.clone(),
    )));
    let payments = Arc::new(PaymentClient::new(RemoteEndpoint::new(
        Dependency::PaymentService,
        config.payment_service_url.clone(),
        http,
        payment_breaker,
        config.retry.clone(),
        metrics.clone(),
    )));

    // === 5. Order store ===
    let store: Arc<dyn OrderStore> = match &config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory order store; orders are lost on restart");
            Arc::new(InMemoryOrderStore::new())
        }
        StoreBackend::Scylla { nodes, keyspace } => {
            Arc::new(ScyllaOrderStore::connect(nodes, keyspace).await?)
        }
    };

    // === 6. Orchestration ===
    let service = OrderService::new(
        OrderOrchestrator::new(inventory.clone(), payments.clone(), store.clone())
            .with_metrics(metrics.clone()),
        AggregationReader::new(store, inventory.clone(), payments.clone())
            .with_metrics(metrics.clone()),
    );

    let health: Vec<Arc<dyn HealthCheckable>> = vec![inventory, payments];

    // === 7. HTTP API ===
    api::start_server(
        api::AppState {
            service: Arc::new(service),
            metrics,
            health,
        },
        &config.http_host,
        config.http_port,
    )
    .await?;

    tracing::info!("👋 Order service stopped");
    Ok(())
}
