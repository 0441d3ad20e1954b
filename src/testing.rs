//! In-process doubles for the remote services and the order store

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::clients::{InventoryApi, PaymentApi};
use crate::domain::order::{Order, OrderDraft, OrderId, PaymentId, PaymentMode, ProductId};
use crate::errors::{OrderServiceError, INSUFFICIENT_QUANTITY};
use crate::models::{PaymentDetails, PaymentRequest, ProductDetails};
use crate::store::{InMemoryOrderStore, OrderStore};

// ============================================================================
// Inventory
// ============================================================================

#[derive(Default)]
pub struct StubInventory {
    stock: Mutex<HashMap<ProductId, i64>>,
    failure: Mutex<Option<OrderServiceError>>,
    lookup_failure: Mutex<Option<OrderServiceError>>,
    pub reduce_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
}

impl StubInventory {
    pub fn with_stock(product_id: ProductId, quantity: i64) -> Self {
        let inventory = Self::default();
        inventory.stock.lock().unwrap().insert(product_id, quantity);
        inventory
    }

    /// Every call fails with `error` from now on
    pub fn fail_with(&self, error: OrderServiceError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    /// Only product lookups fail with `error`
    pub fn fail_lookups_with(&self, error: OrderServiceError) {
        *self.lookup_failure.lock().unwrap() = Some(error);
    }

    pub fn stock_of(&self, product_id: ProductId) -> i64 {
        self.stock.lock().unwrap().get(&product_id).copied().unwrap_or(0)
    }

    fn scripted_failure(&self) -> Result<(), OrderServiceError> {
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InventoryApi for StubInventory {
    async fn reduce_quantity(&self, product_id: ProductId, quantity: i64) -> Result<(), OrderServiceError> {
        self.reduce_calls.fetch_add(1, Ordering::SeqCst);
        self.scripted_failure()?;

        let mut stock = self.stock.lock().unwrap();
        let available = stock.entry(product_id).or_insert(0);
        if *available < quantity {
            return Err(OrderServiceError::InsufficientResource {
                message: "Product doesn't have sufficient quantity!".to_string(),
                error_code: INSUFFICIENT_QUANTITY.to_string(),
                status: 400,
            });
        }
        *available -= quantity;
        Ok(())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<ProductDetails, OrderServiceError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.scripted_failure()?;
        if let Some(error) = self.lookup_failure.lock().unwrap().clone() {
            return Err(error);
        }

        Ok(ProductDetails {
            product_id,
            product_name: "iPhone".to_string(),
            price: 1000,
            quantity: self.stock_of(product_id),
        })
    }
}

// ============================================================================
// Payments
// ============================================================================

pub struct StubPayments {
    outcome: Mutex<Result<PaymentId, OrderServiceError>>,
    lookup_failure: Mutex<Option<OrderServiceError>>,
    requests: Mutex<Vec<PaymentRequest>>,
    delay: Duration,
    pub lookup_calls: AtomicUsize,
}

impl StubPayments {
    pub fn succeeding(payment_id: PaymentId) -> Self {
        Self {
            outcome: Mutex::new(Ok(payment_id)),
            lookup_failure: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            lookup_calls: AtomicUsize::new(0),
        }
    }

    /// Each charge takes `delay` before it answers
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(error: OrderServiceError) -> Self {
        let payments = Self::succeeding(0);
        *payments.outcome.lock().unwrap() = Err(error);
        payments
    }

    pub fn fail_lookups_with(&self, error: OrderServiceError) {
        *self.lookup_failure.lock().unwrap() = Some(error);
    }

    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentApi for StubPayments {
    async fn do_payment(&self, request: &PaymentRequest) -> Result<PaymentId, OrderServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.lock().unwrap().clone()
    }

    async fn get_payment_by_order(&self, order_id: OrderId) -> Result<PaymentDetails, OrderServiceError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.lookup_failure.lock().unwrap().clone() {
            return Err(error);
        }

        let payment_mode = self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.order_id == order_id)
            .map(|r| r.payment_mode)
            .unwrap_or(PaymentMode::Cash);

        Ok(PaymentDetails {
            payment_id: 1,
            order_id,
            amount: 1000,
            payment_mode,
            status: "SUCCESS".to_string(),
            payment_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        })
    }
}

// ============================================================================
// Store
// ============================================================================

/// In-memory store that counts writes
#[derive(Default)]
pub struct RecordingStore {
    inner: InMemoryOrderStore,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl RecordingStore {
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.creates.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl OrderStore for RecordingStore {
    async fn create(&self, draft: &OrderDraft) -> anyhow::Result<OrderId> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("connection reset by peer");
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(draft).await
    }

    async fn update(&self, order: &Order) -> anyhow::Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(order).await
    }

    async fn find_by_id(&self, id: OrderId) -> anyhow::Result<Option<Order>> {
        self.inner.find_by_id(id).await
    }
}
