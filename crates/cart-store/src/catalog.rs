//! The catalog seam: read-only product lookups.
//!
//! The product catalog is owned by an external system; the cart core only
//! ever reads `(name, price, image)` snapshots from it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, ProductId};

use crate::Result;

/// A point-in-time view of one catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub image_url: Option<String>,
}

/// Read-only access to the product catalog.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Looks up a single product.
    ///
    /// Returns None if the product does not exist.
    async fn product(&self, id: ProductId) -> Result<Option<ProductSnapshot>>;

    /// Lists all products, ordered by name.
    async fn products(&self) -> Result<Vec<ProductSnapshot>>;
}

/// In-memory catalog for tests and demo mode.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, ProductSnapshot>>>,
}

impl InMemoryCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub fn insert(&self, product: ProductSnapshot) {
        self.products
            .write()
            .unwrap()
            .insert(product.id, product);
    }

    /// Changes the price of an existing product.
    ///
    /// Returns false if the product is not in the catalog.
    pub fn set_price(&self, id: ProductId, price: Money) -> bool {
        match self.products.write().unwrap().get_mut(&id) {
            Some(product) => {
                product.price = price;
                true
            }
            None => false,
        }
    }

    /// Removes a product. Returns true if it was present.
    pub fn remove(&self, id: ProductId) -> bool {
        self.products.write().unwrap().remove(&id).is_some()
    }

    /// Synchronous lookup used internally by the in-memory store.
    pub fn snapshot(&self, id: ProductId) -> Option<ProductSnapshot> {
        self.products.read().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn product(&self, id: ProductId) -> Result<Option<ProductSnapshot>> {
        Ok(self.snapshot(id))
    }

    async fn products(&self) -> Result<Vec<ProductSnapshot>> {
        let mut products: Vec<_> = self.products.read().unwrap().values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }
}
