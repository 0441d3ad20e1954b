use std::sync::Arc;

use futures_util::future::try_join;

use crate::clients::{InventoryApi, PaymentApi};
use crate::errors::OrderServiceError;
use crate::metrics::Metrics;
use crate::models::OrderView;
use crate::store::OrderStore;

use super::value_objects::OrderId;

/// Read path: one local lookup and two remote lookups stitched into an
/// `OrderView`. Both remote lookups run concurrently; either failing fails
/// the whole read, there is no partial view.
pub struct AggregationReader {
    store: Arc<dyn OrderStore>,
    inventory: Arc<dyn InventoryApi>,
    payments: Arc<dyn PaymentApi>,
    metrics: Option<Arc<Metrics>>,
}

impl AggregationReader {
    pub fn new(
        store: Arc<dyn OrderStore>,
        inventory: Arc<dyn InventoryApi>,
        payments: Arc<dyn PaymentApi>,
    ) -> Self {
        Self {
            store,
            inventory,
            payments,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<OrderView, OrderServiceError> {
        let result = self.assemble(order_id).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_order_read(result.is_ok());
        }
        result
    }

    async fn assemble(&self, order_id: OrderId) -> Result<OrderView, OrderServiceError> {
        let order = self
            .store
            .find_by_id(order_id)
            .await
            .map_err(OrderServiceError::storage)?
            .ok_or_else(|| OrderServiceError::order_not_found(order_id))?;

        if !order.status.is_terminal() {
            // Placement crashed or is still running between its two writes
            tracing::warn!(order_id, status = %order.status, "Reading order without a terminal status");
        }

        let (product, payment) = try_join(
            self.inventory.get_product(order.product_id),
            self.payments.get_payment_by_order(order_id),
        )
        .await
        .inspect_err(|e| {
            tracing::warn!(order_id, error_code = e.error_code(), "Order read failed");
        })?;

        tracing::debug!(order_id, "Order view assembled");
        Ok(OrderView::assemble(order, product, payment))
    }
}
