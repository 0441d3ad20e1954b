use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::response::query_result::QueryResult;
use scylla::value::{CqlValue, Row};
use uuid::Uuid;

use super::OrderStore;
use crate::domain::order::{Order, OrderDraft, OrderId, OrderStatus};

// ============================================================================
// ScyllaDB Order Store
// ============================================================================
//
// One row per order in `orders`, keyed by id. ScyllaDB has no sequences, so
// ids are drawn from the random bits of a v4 UUID and truncated to a positive
// 63-bit integer, matching the integer ids the product and payment services
// use on the wire.
//
// Writes are lightweight transactions: a create only claims an id nobody holds
// and an update only touches a row that exists, so the backend behaves like
// the in-memory store.
//
// ============================================================================

type OrderRow = (i64, i64, i64, i64, String, DateTime<Utc>);

const MAX_ID_ATTEMPTS: u32 = 5;

pub struct ScyllaOrderStore {
    session: Arc<Session>,
}

impl ScyllaOrderStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Connect, make sure the keyspace and table exist, and switch to the keyspace
    pub async fn connect(nodes: &[String], keyspace: &str) -> Result<Self> {
        if !is_valid_identifier(keyspace) {
            bail!("Invalid keyspace name: {}", keyspace);
        }

        tracing::info!(nodes = ?nodes, keyspace = keyspace, "Connecting to ScyllaDB...");
        let session: Session = SessionBuilder::new()
            .known_nodes(nodes)
            .build()
            .await
            .context("Failed to connect to ScyllaDB")?;

        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    keyspace
                ),
                &[],
            )
            .await?;

        session.use_keyspace(keyspace, false).await?;

        session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS orders (
                    id bigint PRIMARY KEY,
                    product_id bigint,
                    quantity bigint,
                    amount bigint,
                    status text,
                    order_date timestamp
                )",
                &[],
            )
            .await?;

        Ok(Self::new(Arc::new(session)))
    }
}

#[async_trait]
impl OrderStore for ScyllaOrderStore {
    async fn create(&self, draft: &OrderDraft) -> Result<OrderId> {
        let id = claim_id(generate_order_id, |id| async move {
            let result = self
                .session
                .query_unpaged(
                    "INSERT INTO orders (id, product_id, quantity, amount, status, order_date)
                     VALUES (?, ?, ?, ?, ?, ?) IF NOT EXISTS",
                    (
                        id,
                        draft.product_id,
                        draft.quantity,
                        draft.amount,
                        OrderStatus::Created.as_str(),
                        draft.order_date,
                    ),
                )
                .await?;
            applied(result)
        })
        .await?;

        tracing::debug!(order_id = id, "Order row created");
        Ok(id)
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let result = self
            .session
            .query_unpaged(
                "UPDATE orders SET product_id = ?, quantity = ?, amount = ?, status = ?, order_date = ?
                 WHERE id = ? IF EXISTS",
                (
                    order.product_id,
                    order.quantity,
                    order.amount,
                    order.status.as_str(),
                    order.order_date,
                    order.id,
                ),
            )
            .await?;

        if !applied(result)? {
            bail!("Cannot update missing order {}", order.id);
        }

        tracing::debug!(order_id = order.id, status = %order.status, "Order row updated");
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let result = self
            .session
            .query_unpaged(
                "SELECT id, product_id, quantity, amount, status, order_date
                 FROM orders WHERE id = ?",
                (id,),
            )
            .await?;

        let rows_result = match result.into_rows_result() {
            Ok(rows) => rows,
            Err(_) => return Ok(None), // No rows
        };

        match rows_result.maybe_first_row::<OrderRow>()? {
            Some(row) => Ok(Some(order_from_row(row)?)),
            None => Ok(None),
        }
    }
}

fn order_from_row(row: OrderRow) -> Result<Order> {
    let (id, product_id, quantity, amount, status, order_date) = row;
    let status = status.parse::<OrderStatus>().map_err(anyhow::Error::msg)?;

    Ok(Order {
        id,
        product_id,
        quantity,
        amount,
        order_date,
        status,
    })
}

/// Read the `[applied]` flag a conditional write answers with
fn applied(result: QueryResult) -> Result<bool> {
    let rows = result
        .into_rows_result()
        .context("Conditional write returned no rows")?;
    let row = rows
        .maybe_first_row::<Row>()?
        .context("Conditional write returned an empty result")?;
    Ok(was_applied(&row))
}

fn was_applied(row: &Row) -> bool {
    matches!(row.columns.first(), Some(Some(CqlValue::Boolean(true))))
}

/// Draw ids until `try_insert` reports one was free
async fn claim_id<G, F, Fut>(mut generate: G, mut try_insert: F) -> Result<OrderId>
where
    G: FnMut() -> OrderId,
    F: FnMut(OrderId) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 1..=MAX_ID_ATTEMPTS {
        let id = generate();
        if try_insert(id).await? {
            return Ok(id);
        }
        tracing::warn!(order_id = id, attempt, "Order id already taken, drawing another");
    }
    bail!("No free order id after {} attempts", MAX_ID_ATTEMPTS)
}

fn generate_order_id() -> OrderId {
    let (high, _) = Uuid::new_v4().as_u64_pair();
    ((high >> 1) as i64).max(1)
}

fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 48
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

// ============================================================================
// Unit Tests
// ============================================================================
//
// Database round trips need a running ScyllaDB; these cover the row mapping,
// id generation and the conditional-write handling.
//
// ============================================================================
