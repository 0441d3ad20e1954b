// ============================================================================
// Order Store - Persistence for the order record
// ============================================================================
//
// The orchestrator writes an order twice per placement (create, then the
// terminal status update) and the reader looks it up by id. Backends:
// - in_memory: process-local map, sequential ids
// - scylla:    ScyllaDB table, random 63-bit ids
//
// ============================================================================

mod in_memory;
mod scylla_store;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::order::{Order, OrderDraft, OrderId};

pub use in_memory::InMemoryOrderStore;
pub use scylla_store::ScyllaOrderStore;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order and return the identity assigned to it
    async fn create(&self, draft: &OrderDraft) -> Result<OrderId>;

    /// Overwrite an existing order
    async fn update(&self, order: &Order) -> Result<()>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;
}
