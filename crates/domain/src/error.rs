//! Domain error types.

use cart_store::StoreError;
use common::ProductId;
use thiserror::Error;

/// Errors that can occur during cart and checkout operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The referenced product is not in the catalog.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// An add was attempted with a non-positive quantity.
    #[error("quantity must be a positive integer, got {0}")]
    InvalidQuantity(i32),

    /// Checkout was attempted on an empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// The addressed cart line or order does not exist for the caller.
    ///
    /// Deliberately covers "exists but owned by someone else" too.
    #[error("not found")]
    NotFound,

    /// The checkout transaction failed and was rolled back; the cart is
    /// untouched and the request can be retried.
    #[error("checkout could not be completed: {source}")]
    CommitFailed { source: StoreError },

    /// An unexpected storage failure outside the checkout write path.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
