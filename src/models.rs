use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::domain::order::{Order, OrderId, OrderStatus, PaymentId, PaymentMode, ProductId};

// ============================================================================
// Wire Models
// ============================================================================
//
// JSON shapes exchanged with callers and with the product and payment
// services. Field names are camelCase on the wire.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub total_amount: i64,
    pub payment_mode: PaymentMode,
}

/// Body of the charge call to the payment service
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    pub payment_mode: PaymentMode,
}

/// Product record as served by the product service
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: i64,
    pub quantity: i64,
}

/// Payment record as served by the payment service
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub amount: i64,
    pub payment_mode: PaymentMode,
    pub status: String,
    pub payment_date: DateTime<Utc>,
}

/// Read-path composite of the order and both remote records.
/// Rebuilt on every read, never stored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_id: OrderId,
    pub order_date: DateTime<Utc>,
    pub order_status: OrderStatus,
    pub amount: i64,
    pub quantity: i64,
    pub product_details: ProductDetails,
    pub payment_details: PaymentDetails,
}

impl OrderView {
    pub fn assemble(order: Order, product: ProductDetails, payment: PaymentDetails) -> Self {
        Self {
            order_id: order.id,
            order_date: order.order_date,
            order_status: order.status,
            amount: order.amount,
            quantity: order.quantity,
            product_details: product,
            payment_details: payment,
        }
    }
}

/// Error body, in both directions
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: String,
    pub error_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderDraft;

    #[test]
    fn test_place_order_request_from_json() {
        let request: PlaceOrderRequest = serde_json::from_str(
            r#"{"productId":1,"quantity":10,"totalAmount":200,"paymentMode":"CASH"}"#,
        )
        .unwrap();

        assert_eq!(request.product_id, 1);
        assert_eq!(request.quantity, 10);
        assert_eq!(request.total_amount, 200);
        assert_eq!(request.payment_mode, PaymentMode::Cash);
    }

    #[test]
    fn test_payment_request_omits_missing_reference() {
        let request = PaymentRequest {
            order_id: 3,
            amount: 200,
            reference_number: None,
            payment_mode: PaymentMode::Paypal,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["orderId"], 3);
        assert_eq!(json["paymentMode"], "PAYPAL");
        assert!(json.get("referenceNumber").is_none());
    }

    #[test]
    fn test_order_view_carries_upstream_fields() {
        let order = OrderDraft::new(1, 2, 2000).into_order(5);
        let product = ProductDetails {
            product_id: 1,
            product_name: "iPhone".to_string(),
            price: 1000,
            quantity: 198,
        };
        let payment = PaymentDetails {
            payment_id: 9,
            order_id: 5,
            amount: 2000,
            payment_mode: PaymentMode::Cash,
            status: "SUCCESS".to_string(),
            payment_date: Utc::now(),
        };

        let view = OrderView::assemble(order, product.clone(), payment.clone());
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["orderId"], 5);
        assert_eq!(json["orderStatus"], "CREATED");
        assert_eq!(json["productDetails"]["productName"], "iPhone");
        assert_eq!(json["paymentDetails"]["status"], "SUCCESS");
        assert_eq!(view.product_details, product);
        assert_eq!(view.payment_details, payment);
    }
}
