use async_trait::async_trait;

use super::{PaymentApi, RemoteEndpoint};
use crate::domain::order::{OrderId, PaymentId};
use crate::errors::OrderServiceError;
use crate::health::{ComponentHealth, HealthCheckable};
use crate::models::{PaymentDetails, PaymentRequest};

/// HTTP client for the payment service
pub struct PaymentClient {
    endpoint: RemoteEndpoint,
}

impl PaymentClient {
    pub fn new(endpoint: RemoteEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl PaymentApi for PaymentClient {
    async fn do_payment(&self, request: &PaymentRequest) -> Result<PaymentId, OrderServiceError> {
        let url = self.endpoint.url("/payment");

        tracing::debug!(
            order_id = request.order_id,
            amount = request.amount,
            payment_mode = ?request.payment_mode,
            "Charging payment"
        );

        // A retried charge could bill twice
        self.endpoint
            .guarded("do_payment", || {
                self.endpoint
                    .send_json::<PaymentId>(self.endpoint.http().post(&url).json(request))
            })
            .await
    }

    async fn get_payment_by_order(&self, order_id: OrderId) -> Result<PaymentDetails, OrderServiceError> {
        let url = self.endpoint.url(&format!("/payment/order/{}", order_id));

        self.endpoint
            .guarded_lookup("get_payment_by_order", || {
                self.endpoint.send_json::<PaymentDetails>(self.endpoint.http().get(&url))
            })
            .await
    }
}

#[async_trait]
impl HealthCheckable for PaymentClient {
    async fn check_health(&self) -> ComponentHealth {
        self.endpoint.check_health().await
    }
}
