//! Business core of the storefront: cart maintenance, pricing, and the
//! cart-to-order commit.
//!
//! Storage and catalog access come in through the `cart-store` traits; this
//! crate owns the contracts: quantity invariants, ownership checks, the
//! single-snapshot total, and the all-or-nothing checkout.

pub mod cart;
pub mod checkout;
pub mod error;
pub mod pricing;

pub use cart::{CartService, CartView};
pub use checkout::CheckoutService;
pub use error::DomainError;
