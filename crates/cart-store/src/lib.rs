pub mod catalog;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use catalog::{CatalogReader, InMemoryCatalog, ProductSnapshot};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use models::{CartLine, CartLineView, Order, OrderLine, OrderStatus, OrderSummary};
pub use postgres::{PostgresCatalog, PostgresStore};
pub use store::{CheckoutTx, StorefrontStore};
