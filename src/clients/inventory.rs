use async_trait::async_trait;

use super::{InventoryApi, RemoteEndpoint};
use crate::domain::order::ProductId;
use crate::errors::OrderServiceError;
use crate::health::{ComponentHealth, HealthCheckable};
use crate::models::ProductDetails;

/// HTTP client for the product service
pub struct InventoryClient {
    endpoint: RemoteEndpoint,
}

impl InventoryClient {
    pub fn new(endpoint: RemoteEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl InventoryApi for InventoryClient {
    async fn reduce_quantity(&self, product_id: ProductId, quantity: i64) -> Result<(), OrderServiceError> {
        let url = self
            .endpoint
            .url(&format!("/product/reduceQuantity/{}?quantity={}", product_id, quantity));

        tracing::debug!(product_id, quantity, "Reducing product stock");

        // Not idempotent: a single attempt, never retried
        self.endpoint
            .guarded("reduce_quantity", || {
                self.endpoint.send_empty(self.endpoint.http().put(&url))
            })
            .await
    }

    async fn get_product(&self, product_id: ProductId) -> Result<ProductDetails, OrderServiceError> {
        let url = self.endpoint.url(&format!("/product/{}", product_id));

        self.endpoint
            .guarded_lookup("get_product", || {
                self.endpoint.send_json::<ProductDetails>(self.endpoint.http().get(&url))
            })
            .await
    }
}

#[async_trait]
impl HealthCheckable for InventoryClient {
    async fn check_health(&self) -> ComponentHealth {
        self.endpoint.check_health().await
    }
}
