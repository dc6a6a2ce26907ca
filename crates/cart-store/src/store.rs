//! Storage traits for the cart-to-order core.

use async_trait::async_trait;
use common::{CartLineId, OrderId, ProductId, UserId};

use crate::{CartLine, CartLineView, Order, OrderLine, OrderSummary, Result};

/// Core trait for storefront storage implementations.
///
/// The shared mutable resource is the set of cart lines belonging to one
/// user. Implementations must guarantee:
///
/// - `add_cart_line` is an atomic increment-or-insert, never a visible
///   read-then-write pair: two concurrent adds for the same `(user,
///   product)` both land.
/// - while a [`CheckoutTx`] for a user is open, no cart mutation for that
///   same user may interleave with it. Different users never contend.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait StorefrontStore: Send + Sync {
    /// The checkout transaction type produced by [`begin_checkout`].
    ///
    /// [`begin_checkout`]: StorefrontStore::begin_checkout
    type Tx: CheckoutTx;

    /// Adds `quantity` of a product to the user's cart.
    ///
    /// If a line for `(user_id, product_id)` already exists its quantity is
    /// incremented, otherwise a new line is created. Returns the resulting
    /// line. Callers validate `quantity > 0` and product existence first;
    /// a backing store may still report `UnknownProduct` if the product
    /// vanished in between.
    async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLine>;

    /// Replaces the stored quantity of a cart line (absolute set).
    ///
    /// Fails with `LineNotFound` if the line does not exist or belongs to a
    /// different user.
    async fn set_cart_line_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<()>;

    /// Deletes a cart line.
    ///
    /// Fails with `LineNotFound` if the line does not exist or belongs to a
    /// different user.
    async fn delete_cart_line(&self, user_id: UserId, line_id: CartLineId) -> Result<()>;

    /// Returns the user's cart lines joined with the current catalog
    /// snapshot, ordered by insertion time.
    ///
    /// Lines whose product has left the catalog are omitted. Pure read, no
    /// side effects.
    async fn cart_view(&self, user_id: UserId) -> Result<Vec<CartLineView>>;

    /// Opens a checkout transaction for the user.
    ///
    /// Acquires the per-user exclusion scope; cart mutations for this user
    /// block until the transaction commits or is dropped.
    async fn begin_checkout(&self, user_id: UserId) -> Result<Self::Tx>;

    /// Loads an order with its lines, scoped to the owning user.
    ///
    /// Returns None when the order does not exist, including when it
    /// exists but belongs to someone else.
    async fn order_with_lines(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<(Order, Vec<OrderLine>)>>;

    /// Lists a user's orders, newest first, with line counts.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>>;
}

/// A checkout transaction: the scoped context for draining one user's cart
/// into an order.
///
/// All writes staged through it become visible only after [`commit`]
/// succeeds. Dropping the transaction without committing discards every
/// staged write and releases the per-user exclusion scope; this is the
/// rollback path for errors and cancellation alike.
///
/// [`commit`]: CheckoutTx::commit
#[async_trait]
pub trait CheckoutTx: Send {
    /// Reads the cart snapshot this transaction will operate on.
    ///
    /// Read once per transaction; every subsequent write derives from it.
    async fn cart_snapshot(&mut self) -> Result<Vec<CartLineView>>;

    /// Stages the order header row.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Stages the order line rows.
    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<()>;

    /// Stages deletion of all of the user's cart lines.
    async fn clear_cart(&mut self) -> Result<()>;

    /// Commits every staged write atomically.
    ///
    /// On `Conflict` the transaction was rolled back and may be retried
    /// from `begin_checkout`.
    async fn commit(self) -> Result<()>;
}
