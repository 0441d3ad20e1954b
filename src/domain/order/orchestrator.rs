use std::sync::Arc;

use crate::clients::{InventoryApi, PaymentApi};
use crate::errors::OrderServiceError;
use crate::metrics::Metrics;
use crate::models::{PaymentRequest, PlaceOrderRequest};
use crate::store::OrderStore;

use super::aggregate::{validate_terms, OrderDraft};
use super::value_objects::{OrderId, OrderStatus};

// ============================================================================
// Order Orchestrator - Placement Workflow
// ============================================================================
//
// Validate → Reduce stock → Persist CREATED → Charge → Persist terminal status
//
// - Stock reduction failures abort before any row exists.
// - Payment failures are swallowed: the order is stored as PAYMENT_FAILED and
//   the caller still receives its id. Reduced stock is NOT released.
// - Exactly two store writes per order that reaches the payment step.
//
// ============================================================================

pub struct OrderOrchestrator {
    inventory: Arc<dyn InventoryApi>,
    payments: Arc<dyn PaymentApi>,
    store: Arc<dyn OrderStore>,
    metrics: Option<Arc<Metrics>>,
}

impl OrderOrchestrator {
    pub fn new(
        inventory: Arc<dyn InventoryApi>,
        payments: Arc<dyn PaymentApi>,
        store: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            inventory,
            payments,
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderId, OrderServiceError> {
        let result = self.run(request).await;

        let outcome = match &result {
            Ok((_, OrderStatus::Placed)) => "placed",
            Ok(_) => "payment_failed",
            Err(_) => "rejected",
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_order_placed(outcome);
        }

        result.map(|(order_id, _)| order_id)
    }

    async fn run(&self, request: &PlaceOrderRequest) -> Result<(OrderId, OrderStatus), OrderServiceError> {
        validate_terms(request.quantity, request.total_amount)?;

        tracing::info!(
            product_id = request.product_id,
            quantity = request.quantity,
            amount = request.total_amount,
            "Placing order"
        );

        // 1. Reserve stock; nothing is stored if this fails
        self.inventory
            .reduce_quantity(request.product_id, request.quantity)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    product_id = request.product_id,
                    error_code = e.error_code(),
                    offline = e.is_unavailable(),
                    "Stock reduction failed, order not created"
                )
            })?;

        // 2. First write: CREATED
        let draft = OrderDraft::new(request.product_id, request.quantity, request.total_amount);
        let order_id = self
            .store
            .create(&draft)
            .await
            .map_err(OrderServiceError::storage)?;
        let mut order = draft.into_order(order_id);

        tracing::debug!(order_id, "Order created, charging payment");

        // 3. Charge; any failure downgrades the order instead of aborting
        let payment = PaymentRequest {
            order_id,
            amount: request.total_amount,
            reference_number: None,
            payment_mode: request.payment_mode,
        };
        let status = match self.payments.do_payment(&payment).await {
            Ok(payment_id) => {
                tracing::info!(order_id, payment_id, "Payment done");
                OrderStatus::Placed
            }
            Err(e) => {
                tracing::error!(
                    order_id,
                    error_code = e.error_code(),
                    error = %e,
                    "Payment failed, marking order PAYMENT_FAILED"
                );
                OrderStatus::PaymentFailed
            }
        };

        // 4. Second write: terminal status
        order.complete(status)?;
        self.store
            .update(&order)
            .await
            .map_err(OrderServiceError::storage)?;

        tracing::info!(order_id, status = %status, "✅ Order placed");
        Ok((order_id, status))
    }
}
