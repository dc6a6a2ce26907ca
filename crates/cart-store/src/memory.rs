use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{CartLineId, OrderId, ProductId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    CartLine, CartLineView, InMemoryCatalog, Order, OrderLine, OrderSummary, Result, StoreError,
    store::{CheckoutTx, StorefrontStore},
};

#[derive(Debug, Default)]
struct StoreState {
    cart_lines: Vec<CartLine>,
    orders: Vec<Order>,
    order_lines: Vec<OrderLine>,
}

/// In-memory store implementation for tests and demo mode.
///
/// Provides the same contract as the PostgreSQL implementation. Per-user
/// serialization is a `tokio::sync::Mutex` per user id: mutations hold it
/// for the duration of one write, a checkout transaction holds it for its
/// whole lifetime. Checkout writes are staged on the transaction and applied
/// only at commit, so a dropped transaction leaves no trace.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    catalog: InMemoryCatalog,
    state: Arc<RwLock<StoreState>>,
    user_locks: Arc<std::sync::Mutex<HashMap<UserId, Arc<Mutex<()>>>>>,
    fail_order_line_writes: Arc<AtomicBool>,
    commit_conflicts: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Creates a new empty store reading prices from the given catalog.
    pub fn new(catalog: InMemoryCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Returns the catalog this store joins cart lines against.
    pub fn catalog(&self) -> &InMemoryCatalog {
        &self.catalog
    }

    /// Returns the total number of cart lines across all users.
    pub async fn cart_line_count(&self) -> usize {
        self.state.read().await.cart_lines.len()
    }

    /// Returns the total number of orders across all users.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Configures the next order-line write to fail.
    ///
    /// Lets tests verify that a checkout failing halfway leaves nothing
    /// behind.
    pub fn fail_next_order_line_write(&self) {
        self.fail_order_line_writes.store(true, Ordering::SeqCst);
    }

    /// Configures the next `n` checkout commits to fail with a conflict.
    pub fn conflict_next_commits(&self, n: usize) {
        self.commit_conflicts.store(n, Ordering::SeqCst);
    }

    fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap();
        locks.entry(user_id).or_default().clone()
    }

    fn take_commit_conflict(&self) -> bool {
        self.commit_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn view_lines(state: &StoreState, catalog: &InMemoryCatalog, user_id: UserId) -> Vec<CartLineView> {
    let mut lines: Vec<_> = state
        .cart_lines
        .iter()
        .filter(|line| line.user_id == user_id)
        .cloned()
        .collect();
    // stable sort: equal timestamps keep insertion order
    lines.sort_by_key(|line| line.added_at);

    lines
        .into_iter()
        .filter_map(|line| {
            let product = catalog.snapshot(line.product_id)?;
            Some(CartLineView {
                line_id: line.id,
                product_id: line.product_id,
                quantity: line.quantity,
                name: product.name,
                unit_price: product.price,
                image_url: product.image_url,
                added_at: line.added_at,
            })
        })
        .collect()
}

#[async_trait]
impl StorefrontStore for InMemoryStore {
    type Tx = InMemoryCheckoutTx;

    async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLine> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut state = self.state.write().await;
        if let Some(line) = state
            .cart_lines
            .iter_mut()
            .find(|line| line.user_id == user_id && line.product_id == product_id)
        {
            line.quantity += quantity;
            return Ok(line.clone());
        }

        let line = CartLine {
            id: CartLineId::new(),
            user_id,
            product_id,
            quantity,
            added_at: Utc::now(),
        };
        state.cart_lines.push(line.clone());
        Ok(line)
    }

    async fn set_cart_line_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<()> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut state = self.state.write().await;
        let line = state
            .cart_lines
            .iter_mut()
            .find(|line| line.id == line_id && line.user_id == user_id)
            .ok_or(StoreError::LineNotFound)?;
        line.quantity = quantity;
        Ok(())
    }

    async fn delete_cart_line(&self, user_id: UserId, line_id: CartLineId) -> Result<()> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut state = self.state.write().await;
        let position = state
            .cart_lines
            .iter()
            .position(|line| line.id == line_id && line.user_id == user_id)
            .ok_or(StoreError::LineNotFound)?;
        state.cart_lines.remove(position);
        Ok(())
    }

    async fn cart_view(&self, user_id: UserId) -> Result<Vec<CartLineView>> {
        let state = self.state.read().await;
        Ok(view_lines(&state, &self.catalog, user_id))
    }

    async fn begin_checkout(&self, user_id: UserId) -> Result<Self::Tx> {
        let guard = self.user_lock(user_id).lock_owned().await;
        Ok(InMemoryCheckoutTx {
            store: self.clone(),
            user_id,
            staged_order: None,
            staged_lines: Vec::new(),
            clear_cart: false,
            _guard: guard,
        })
    }

    async fn order_with_lines(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<(Order, Vec<OrderLine>)>> {
        let state = self.state.read().await;
        let order = state
            .orders
            .iter()
            .find(|order| order.id == order_id && order.user_id == user_id)
            .cloned();

        Ok(order.map(|order| {
            let lines: Vec<_> = state
                .order_lines
                .iter()
                .filter(|line| line.order_id == order_id)
                .cloned()
                .collect();
            (order, lines)
        }))
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .iter()
            .rev()
            .filter(|order| order.user_id == user_id)
            .map(|order| OrderSummary {
                id: order.id,
                total: order.total,
                status: order.status,
                created_at: order.created_at,
                item_count: state
                    .order_lines
                    .iter()
                    .filter(|line| line.order_id == order.id)
                    .count() as i64,
            })
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

/// Checkout transaction over the in-memory store.
///
/// Holds the per-user mutex for its whole lifetime, which is what blocks
/// concurrent cart mutations for the same user until commit or drop.
pub struct InMemoryCheckoutTx {
    store: InMemoryStore,
    user_id: UserId,
    staged_order: Option<Order>,
    staged_lines: Vec<OrderLine>,
    clear_cart: bool,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl CheckoutTx for InMemoryCheckoutTx {
    async fn cart_snapshot(&mut self) -> Result<Vec<CartLineView>> {
        let state = self.store.state.read().await;
        Ok(view_lines(&state, &self.store.catalog, self.user_id))
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.staged_order = Some(order.clone());
        Ok(())
    }

    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<()> {
        if self.store.fail_order_line_writes.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Internal(
                "injected order line write failure".to_string(),
            ));
        }
        self.staged_lines.extend_from_slice(lines);
        Ok(())
    }

    async fn clear_cart(&mut self) -> Result<()> {
        self.clear_cart = true;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        if self.store.take_commit_conflict() {
            return Err(StoreError::Conflict);
        }

        let mut state = self.store.state.write().await;
        if let Some(order) = self.staged_order {
            state.orders.push(order);
        }
        state.order_lines.extend(self.staged_lines);
        if self.clear_cart {
            let user_id = self.user_id;
            state.cart_lines.retain(|line| line.user_id != user_id);
        }
        Ok(())
    }
}
