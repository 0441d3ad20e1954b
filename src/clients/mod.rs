// ============================================================================
// Remote Clients - Product and Payment services
// ============================================================================
//
// Each client owns a `RemoteEndpoint`: base URL, shared reqwest client with
// bounded timeouts, circuit breaker handle, retry policy for lookups, and
// metrics. Every call goes through the breaker; failures are routed through
// one fallback:
//
// - circuit open          -> ServiceUnavailable (request never sent)
// - unreachable / timeout -> ServiceUnavailable
// - decoded error body    -> that same decoded error
//
// Only transport failures and 5xx responses count against the breaker; a 4xx
// business rejection means the dependency is healthy.
//
// ============================================================================

mod decoder;
mod inventory;
mod payment;
#[cfg(test)]
pub(crate) mod stub;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::domain::order::{OrderId, PaymentId, ProductId};
use crate::errors::{Dependency, OrderServiceError};
use crate::health::{ComponentHealth, HealthStatus};
use crate::metrics::Metrics;
use crate::models::{PaymentDetails, PaymentRequest, ProductDetails};
use crate::utils::{retry_on_transient, CircuitBreaker, CircuitBreakerError, CircuitState, IsTransient, RetryConfig};

pub use inventory::InventoryClient;
pub use payment::PaymentClient;

/// Stock side of the product service
#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn reduce_quantity(&self, product_id: ProductId, quantity: i64) -> Result<(), OrderServiceError>;

    async fn get_product(&self, product_id: ProductId) -> Result<ProductDetails, OrderServiceError>;
}

#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn do_payment(&self, request: &PaymentRequest) -> Result<PaymentId, OrderServiceError>;

    async fn get_payment_by_order(&self, order_id: OrderId) -> Result<PaymentDetails, OrderServiceError>;
}

/// Failure of a single remote attempt, before the fallback runs
#[derive(Debug, thiserror::Error)]
pub enum RemoteFailure {
    #[error("{dependency} unreachable: {reason}")]
    Unreachable { dependency: Dependency, reason: String },

    #[error(transparent)]
    Rejected(OrderServiceError),
}

impl RemoteFailure {
    fn counts_as_failure(&self) -> bool {
        match self {
            RemoteFailure::Unreachable { .. } => true,
            RemoteFailure::Rejected(error) => error.status() >= 500,
        }
    }
}

impl IsTransient for CircuitBreakerError<RemoteFailure> {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            CircuitBreakerError::OperationFailed(RemoteFailure::Unreachable { .. })
        )
    }
}

pub struct RemoteEndpoint {
    dependency: Dependency,
    base_url: String,
    http: reqwest::Client,
    breaker: Arc<CircuitBreaker>,
    retry: RetryConfig,
    metrics: Arc<Metrics>,
}

impl RemoteEndpoint {
    pub fn new(
        dependency: Dependency,
        base_url: impl Into<String>,
        http: reqwest::Client,
        breaker: Arc<CircuitBreaker>,
        retry: RetryConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            dependency,
            base_url,
            http,
            breaker,
            retry,
            metrics,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn unreachable(&self, err: reqwest::Error) -> RemoteFailure {
        let reason = if err.is_timeout() {
            format!("timed out: {}", err)
        } else {
            err.to_string()
        };
        RemoteFailure::Unreachable {
            dependency: self.dependency,
            reason,
        }
    }

    /// Send a request; non-success statuses go through the error translator
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteFailure> {
        let response = request.send().await.map_err(|e| self.unreachable(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.map_err(|e| self.unreachable(e))?;
        Err(RemoteFailure::Rejected(decoder::translate(status.as_u16(), &body)))
    }

    pub async fn send_empty(&self, request: reqwest::RequestBuilder) -> Result<(), RemoteFailure> {
        self.send(request).await.map(|_| ())
    }

    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RemoteFailure> {
        let response = self.send(request).await?;
        response.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                tracing::warn!(
                    dependency = self.dependency.name(),
                    error = %e,
                    "Undecodable success body from remote service"
                );
                RemoteFailure::Rejected(OrderServiceError::internal())
            } else {
                self.unreachable(e)
            }
        })
    }

    /// Single attempt through the breaker, then the fallback
    pub async fn guarded<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, OrderServiceError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RemoteFailure>>,
    {
        self.attempt(operation, &call)
            .await
            .map_err(|err| self.fallback(operation, err))
    }

    /// Idempotent lookups: transient failures are retried, each attempt
    /// passing through the breaker
    pub async fn guarded_lookup<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, OrderServiceError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RemoteFailure>>,
    {
        let call = &call;
        retry_on_transient(operation, &self.retry, move |_attempt| self.attempt(operation, call))
            .await
            .into_result()
            .map_err(|err| self.fallback(operation, err))
    }

    async fn attempt<T, F, Fut>(
        &self,
        operation: &'static str,
        call: &F,
    ) -> Result<T, CircuitBreakerError<RemoteFailure>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RemoteFailure>>,
    {
        let started = Instant::now();
        let result = self
            .breaker
            .call_filtered(call(), RemoteFailure::counts_as_failure)
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(CircuitBreakerError::CircuitOpen) => "short_circuited",
            Err(CircuitBreakerError::OperationFailed(RemoteFailure::Unreachable { .. })) => "unavailable",
            Err(CircuitBreakerError::OperationFailed(RemoteFailure::Rejected(_))) => "rejected",
        };
        self.metrics.record_remote_call(
            self.dependency.name(),
            operation,
            outcome,
            started.elapsed().as_secs_f64(),
        );

        result
    }

    fn fallback(&self, operation: &'static str, err: CircuitBreakerError<RemoteFailure>) -> OrderServiceError {
        match err {
            CircuitBreakerError::CircuitOpen => {
                tracing::warn!(
                    dependency = self.dependency.name(),
                    operation,
                    breaker = self.breaker.name(),
                    "Circuit breaker open - short-circuiting to fallback"
                );
                OrderServiceError::unavailable(self.dependency)
            }
            CircuitBreakerError::OperationFailed(RemoteFailure::Unreachable { reason, .. }) => {
                tracing::error!(
                    dependency = self.dependency.name(),
                    operation,
                    reason = %reason,
                    "Remote service unreachable"
                );
                OrderServiceError::unavailable(self.dependency)
            }
            CircuitBreakerError::OperationFailed(RemoteFailure::Rejected(error)) => {
                tracing::warn!(
                    dependency = self.dependency.name(),
                    operation,
                    error_code = error.error_code(),
                    status = error.status(),
                    "Remote service rejected the request"
                );
                error
            }
        }
    }

    pub async fn check_health(&self) -> ComponentHealth {
        let state = self.breaker.get_state().await;
        let failures = self.breaker.get_failure_count().await;

        let status = match state {
            CircuitState::Closed => HealthStatus::Healthy,
            CircuitState::HalfOpen => HealthStatus::Degraded("circuit half-open, probing".to_string()),
            CircuitState::Open => HealthStatus::Unhealthy("circuit open".to_string()),
        };

        ComponentHealth::new(self.dependency.name(), status).with_details(format!(
            "breaker={} failures_in_window={}",
            self.breaker.name(),
            failures
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::stub;
    use super::*;
    use crate::utils::CircuitBreakerConfig;
    use actix_web::{web, HttpResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn endpoint(base_url: &str, breaker: Arc<CircuitBreaker>) -> RemoteEndpoint {
        RemoteEndpoint::new(
            Dependency::ProductService,
            base_url,
            stub::http_client(Duration::from_millis(300)),
            breaker,
            stub::fast_retry(3),
            Arc::new(Metrics::new().unwrap()),
        )
    }

    fn breaker(minimum_calls: usize) -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(
            "product-service",
            CircuitBreakerConfig {
                window_size: minimum_calls,
                minimum_calls,
                timeout: Duration::from_secs(60),
                ..CircuitBreakerConfig::default()
            },
        ))
    }

    #[actix_web::test]
    async fn test_url_joins_without_double_slash() {
        let endpoint = endpoint("http://product:8080/", breaker(5));
        assert_eq!(endpoint.url("/product/1"), "http://product:8080/product/1");
    }

    #[actix_web::test]
    async fn test_business_rejections_do_not_trip_breaker() {
        let server = stub::start(|cfg| {
            cfg.route(
                "/product/{id}",
                web::get().to(|| async {
                    stub::error_response(404, "PRODUCT_NOT_FOUND", "Product with given id not found!")
                }),
            );
        })
        .await;
        let breaker = breaker(2);
        let endpoint = endpoint(&server.base_url, breaker.clone());
        let url = endpoint.url("/product/3");

        for _ in 0..4 {
            let err = endpoint
                .guarded_lookup("get_product", || endpoint.send_json::<ProductDetails>(endpoint.http().get(&url)))
                .await
                .unwrap_err();
            assert_eq!(err.error_code(), "PRODUCT_NOT_FOUND");
        }

        assert_eq!(breaker.get_state().await, CircuitState::Closed);
    }

    #[actix_web::test]
    async fn test_server_errors_trip_breaker_then_short_circuit() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let server = stub::start(move |cfg| {
            let counter = counter.clone();
            cfg.route(
                "/product/{id}",
                web::get().to(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        HttpResponse::InternalServerError().body("boom")
                    }
                }),
            );
        })
        .await;
        let breaker = breaker(2);
        let endpoint = endpoint(&server.base_url, breaker.clone());
        let url = endpoint.url("/product/3");
        let lookup = || endpoint.send_json::<ProductDetails>(endpoint.http().get(&url));

        // Undecodable 5xx bodies surface as the translator's internal error
        for _ in 0..2 {
            let err = endpoint.guarded("get_product", lookup).await.unwrap_err();
            assert_eq!(err.error_code(), "INTERNAL_SERVER_ERROR");
        }
        assert_eq!(breaker.get_state().await, CircuitState::Open);

        let err = endpoint.guarded("get_product", lookup).await.unwrap_err();
        assert_eq!(err, OrderServiceError::unavailable(Dependency::ProductService));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[actix_web::test]
    async fn test_unreachable_lookup_is_retried_then_unavailable() {
        let endpoint = endpoint(stub::UNREACHABLE_URL, breaker(10));
        let url = endpoint.url("/product/1");

        let err = endpoint
            .guarded_lookup("get_product", || endpoint.send_json::<ProductDetails>(endpoint.http().get(&url)))
            .await
            .unwrap_err();

        assert!(err.is_unavailable());
        assert_eq!(err.error_code(), "PRODUCT_SERVICE_OFFLINE");
        assert_eq!(
            endpoint
                .metrics
                .remote_calls
                .with_label_values(&["product-service", "get_product", "unavailable"])
                .get(),
            3
        );
    }

    #[actix_web::test]
    async fn test_slow_dependency_times_out() {
        let server = stub::start(|cfg| {
            cfg.route(
                "/product/{id}",
                web::get().to(|| async {
                    actix_web::rt::time::sleep(Duration::from_secs(2)).await;
                    HttpResponse::Ok().finish()
                }),
            );
        })
        .await;
        let endpoint = endpoint(&server.base_url, breaker(10));
        let url = endpoint.url("/product/1");

        let started = Instant::now();
        let err = endpoint
            .guarded("get_product", || endpoint.send_json::<ProductDetails>(endpoint.http().get(&url)))
            .await
            .unwrap_err();

        assert!(err.is_unavailable());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[actix_web::test]
    async fn test_shared_breaker_couples_dependencies() {
        let shared = breaker(2);
        let payments = RemoteEndpoint::new(
            Dependency::PaymentService,
            stub::UNREACHABLE_URL,
            stub::http_client(Duration::from_millis(300)),
            shared.clone(),
            stub::fast_retry(1),
            Arc::new(Metrics::new().unwrap()),
        );
        let products = endpoint("http://127.0.0.1:9", shared.clone());

        let url = payments.url("/payment");
        for _ in 0..2 {
            let err = payments
                .guarded("do_payment", || payments.send_json::<i64>(payments.http().post(&url)))
                .await
                .unwrap_err();
            assert_eq!(err.error_code(), "PAYMENT_SERVICE_OFFLINE");
        }
        assert_eq!(shared.get_state().await, CircuitState::Open);

        // Product service was never called, yet it is reported offline
        let url = products.url("/product/1");
        let err = products
            .guarded("reduce_quantity", || products.send_empty(products.http().put(&url)))
            .await
            .unwrap_err();
        assert_eq!(err, OrderServiceError::unavailable(Dependency::ProductService));
        assert_eq!(
            products
                .metrics
                .remote_calls
                .with_label_values(&["product-service", "reduce_quantity", "short_circuited"])
                .get(),
            1
        );
    }

    #[actix_web::test]
    async fn test_health_follows_breaker_state() {
        let breaker = breaker(1);
        let endpoint = endpoint(stub::UNREACHABLE_URL, breaker.clone());
        assert_eq!(endpoint.check_health().await.status, HealthStatus::Healthy);

        let url = endpoint.url("/product/1");
        let _ = endpoint
            .guarded("get_product", || endpoint.send_json::<ProductDetails>(endpoint.http().get(&url)))
            .await;

        let health = endpoint.check_health().await;
        assert!(health.status.is_unhealthy());
        assert_eq!(health.name, "product-service");
    }
}
