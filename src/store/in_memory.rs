use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::OrderStore;
use crate::domain::order::{Order, OrderDraft, OrderId};

/// Process-local order store, ids start at 1
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    next_id: AtomicI64,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, draft: &OrderDraft) -> Result<OrderId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let order = draft.clone().into_order(id);

        self.orders.write().await.insert(id, order);
        tracing::debug!(order_id = id, "Order row created");

        Ok(id)
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => bail!("Cannot update missing order {}", order.id),
        }
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }
}
