use crate::errors::OrderServiceError;
use crate::models::{OrderView, PlaceOrderRequest};

use super::orchestrator::OrderOrchestrator;
use super::reader::AggregationReader;
use super::value_objects::OrderId;

/// Entry point for the API layer: writes go to the orchestrator, reads to
/// the aggregation reader
pub struct OrderService {
    orchestrator: OrderOrchestrator,
    reader: AggregationReader,
}

impl OrderService {
    pub fn new(orchestrator: OrderOrchestrator, reader: AggregationReader) -> Self {
        Self { orchestrator, reader }
    }

    pub async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderId, OrderServiceError> {
        self.orchestrator.place_order(request).await
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<OrderView, OrderServiceError> {
        self.reader.get_order(order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderStatus, PaymentMode};
    use crate::testing::{RecordingStore, StubInventory, StubPayments};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_place_then_read_back() {
        let inventory = Arc::new(StubInventory::with_stock(1, 200));
        let payments = Arc::new(StubPayments::succeeding(1));
        let store = Arc::new(RecordingStore::default());
        let service = OrderService::new(
            OrderOrchestrator::new(inventory.clone(), payments.clone(), store.clone()),
            AggregationReader::new(store, inventory, payments),
        );

        let order_id = service
            .place_order(&PlaceOrderRequest {
                product_id: 1,
                quantity: 2,
                total_amount: 2000,
                payment_mode: PaymentMode::ApplePay,
            })
            .await
            .unwrap();

        let view = service.get_order(order_id).await.unwrap();
        assert_eq!(view.order_status, OrderStatus::Placed);
        assert_eq!(view.product_details.quantity, 198);
        assert_eq!(view.payment_details.payment_mode, PaymentMode::ApplePay);
    }
}
