//! The cart-to-order commit and owner-scoped order reads.

use std::time::Instant;

use cart_store::{CheckoutTx, Order, OrderLine, OrderSummary, StoreError, StorefrontStore};
use common::{OrderId, UserId};

use crate::error::DomainError;
use crate::pricing;

/// How many times a checkout is re-run after losing a transaction conflict
/// before the failure is surfaced to the caller.
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Service that converts carts into orders, exactly once per cart.
///
/// The whole conversion runs inside one store transaction: snapshot the
/// cart, write the order and its lines at snapshotted prices, clear the
/// cart. Any failure rolls everything back and leaves the cart as it was.
pub struct CheckoutService<S> {
    store: S,
}

impl<S: StorefrontStore> CheckoutService<S> {
    /// Creates a new checkout service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Drains the user's cart into a new pending order.
    ///
    /// Fails with `EmptyCart` when there is nothing to commit and with
    /// `CommitFailed` when the transaction could not complete. In the
    /// latter case the cart is guaranteed untouched and the caller may
    /// simply resubmit. Conflict aborts are retried internally first.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, user_id: UserId) -> Result<Order, DomainError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_place_order(user_id).await {
                Err(DomainError::CommitFailed {
                    source: StoreError::Conflict,
                }) if attempt < MAX_COMMIT_ATTEMPTS => {
                    tracing::warn!(%user_id, attempt, "checkout conflict, retrying");
                    continue;
                }
                Err(err) => {
                    metrics::counter!("checkout_failures_total").increment(1);
                    return Err(err);
                }
                Ok(order) => {
                    metrics::counter!("orders_committed_total").increment(1);
                    metrics::histogram!("checkout_duration_seconds")
                        .record(started.elapsed().as_secs_f64());
                    tracing::info!(order_id = %order.id, total = %order.total, "order committed");
                    return Ok(order);
                }
            }
        }
    }

    async fn try_place_order(&self, user_id: UserId) -> Result<Order, DomainError> {
        let mut tx = self.store.begin_checkout(user_id).await?;

        // The one snapshot read every subsequent write derives from.
        let snapshot = tx.cart_snapshot().await?;
        if snapshot.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let total = pricing::compute_total(&snapshot);
        let order = Order::pending(user_id, total);
        let lines: Vec<OrderLine> = snapshot
            .iter()
            .map(|view| OrderLine {
                order_id: order.id,
                product_id: view.product_id,
                quantity: view.quantity,
                unit_price: view.unit_price,
            })
            .collect();

        tx.insert_order(&order).await.map_err(commit_failed)?;
        tx.insert_order_lines(&lines).await.map_err(commit_failed)?;
        tx.clear_cart().await.map_err(commit_failed)?;
        tx.commit().await.map_err(commit_failed)?;

        Ok(order)
    }

    /// Loads one of the user's orders with its lines.
    ///
    /// Orders belonging to other users are reported as `NotFound`, exactly
    /// like orders that do not exist.
    #[tracing::instrument(skip(self))]
    pub async fn order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<(Order, Vec<OrderLine>), DomainError> {
        self.store
            .order_with_lines(user_id, order_id)
            .await?
            .ok_or(DomainError::NotFound)
    }

    /// Lists the user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn orders(&self, user_id: UserId) -> Result<Vec<OrderSummary>, DomainError> {
        Ok(self.store.orders_for_user(user_id).await?)
    }
}

fn commit_failed(source: StoreError) -> DomainError {
    DomainError::CommitFailed { source }
}
