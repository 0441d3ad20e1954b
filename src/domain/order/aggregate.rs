use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use super::value_objects::{OrderId, OrderStatus, ProductId};
use super::errors::OrderError;

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// An order only gets an identity when the store persists it, so the record
// exists in two shapes: `OrderDraft` before the first write and `Order`
// afterwards. The only mutation an `Order` accepts is the single move from
// CREATED to a terminal status.
//
// ============================================================================

/// Check the request terms before any remote call is made
pub fn validate_terms(quantity: i64, amount: i64) -> Result<(), OrderError> {
    if quantity <= 0 {
        return Err(OrderError::InvalidQuantity(quantity));
    }
    if amount < 0 {
        return Err(OrderError::InvalidAmount(amount));
    }
    Ok(())
}

/// Order that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub product_id: ProductId,
    pub quantity: i64,
    pub amount: i64,
    pub order_date: DateTime<Utc>,
}

impl OrderDraft {
    pub fn new(product_id: ProductId, quantity: i64, amount: i64) -> Self {
        Self {
            product_id,
            quantity,
            amount,
            order_date: Utc::now(),
        }
    }

    /// Attach the identity assigned by the store
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            product_id: self.product_id,
            quantity: self.quantity,
            amount: self.amount,
            order_date: self.order_date,
            status: OrderStatus::Created,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    // Identity
    pub id: OrderId,

    pub product_id: ProductId,
    pub quantity: i64,
    pub amount: i64,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
}

impl Order {
    /// Move the order to its terminal status
    pub fn complete(&mut self, outcome: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(outcome) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: outcome,
            });
        }
        self.status = outcome;
        Ok(())
    }
}
