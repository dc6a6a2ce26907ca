//! Cart maintenance: add, update, and read the per-user cart aggregate.

use cart_store::{CartLine, CartLineView, CatalogReader, StoreError, StorefrontStore};
use common::{CartLineId, Money, ProductId, UserId};

use crate::error::DomainError;
use crate::pricing;

/// A user's cart joined with the catalog, plus its total.
///
/// Lines and total come from one snapshot read, so what the user sees is
/// exactly what a checkout at that instant would charge.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: Money,
}

impl CartView {
    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Service for maintaining per-user carts.
pub struct CartService<S, C> {
    store: S,
    catalog: C,
}

impl<S, C> CartService<S, C>
where
    S: StorefrontStore,
    C: CatalogReader,
{
    /// Creates a new cart service over the given store and catalog.
    pub fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// Adds `quantity` of a product to the user's cart.
    ///
    /// An existing line for the same product is incremented (merge-add);
    /// the increment happens atomically in the store. The product must
    /// exist in the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLine, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity(quantity));
        }
        if self.catalog.product(product_id).await?.is_none() {
            return Err(DomainError::ProductNotFound(product_id));
        }

        let line = self
            .store
            .add_cart_line(user_id, product_id, quantity)
            .await
            .map_err(|e| match e {
                // The product can vanish between the catalog check and the
                // write; the store surfaces that as its own error.
                StoreError::UnknownProduct(id) => DomainError::ProductNotFound(id),
                other => DomainError::Store(other),
            })?;

        metrics::counter!("cart_lines_added_total").increment(1);
        Ok(line)
    }

    /// Sets the quantity of a cart line (absolute, not an increment).
    ///
    /// A quantity of zero or less removes the line. Lines owned by other
    /// users look exactly like missing lines.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<(), DomainError> {
        let result = if quantity <= 0 {
            self.store.delete_cart_line(user_id, line_id).await
        } else {
            self.store
                .set_cart_line_quantity(user_id, line_id, quantity)
                .await
        };

        result.map_err(|e| match e {
            StoreError::LineNotFound => DomainError::NotFound,
            other => DomainError::Store(other),
        })
    }

    /// Returns the user's cart joined with current catalog prices.
    #[tracing::instrument(skip(self))]
    pub async fn cart(&self, user_id: UserId) -> Result<CartView, DomainError> {
        let lines = self.store.cart_view(user_id).await?;
        let total = pricing::compute_total(&lines);
        Ok(CartView { lines, total })
    }
}

#[cfg(test)]
mod tests {
    use cart_store::{InMemoryCatalog, InMemoryStore, ProductSnapshot};

    use super::*;

    fn service() -> (CartService<InMemoryStore, InMemoryCatalog>, ProductId) {
        let catalog = InMemoryCatalog::new();
        let product_id = ProductId::new();
        catalog.insert(ProductSnapshot {
            id: product_id,
            name: "Widget".to_string(),
            price: Money::from_cents(1000),
            image_url: None,
        });
        let store = InMemoryStore::new(catalog.clone());
        (CartService::new(store, catalog), product_id)
    }

    #[tokio::test]
    async fn add_item_rejects_non_positive_quantity() {
        let (service, product_id) = service();
        let user_id = UserId::new();

        for quantity in [0, -1, -100] {
            let result = service.add_item(user_id, product_id, quantity).await;
            assert!(matches!(result, Err(DomainError::InvalidQuantity(q)) if q == quantity));
        }

        let cart = service.cart(user_id).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn add_item_rejects_unknown_product() {
        let (service, _) = service();
        let user_id = UserId::new();

        let result = service.add_item(user_id, ProductId::new(), 1).await;
        assert!(matches!(result, Err(DomainError::ProductNotFound(_))));
        assert!(service.cart(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sequential_adds_accumulate() {
        let (service, product_id) = service();
        let user_id = UserId::new();

        for quantity in [2, 3, 5] {
            service.add_item(user_id, product_id, quantity).await.unwrap();
        }

        let cart = service.cart(user_id).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 10);
        assert_eq!(cart.total.cents(), 10_000);
    }

    #[tokio::test]
    async fn update_item_replaces_quantity() {
        let (service, product_id) = service();
        let user_id = UserId::new();

        let line = service.add_item(user_id, product_id, 5).await.unwrap();
        service.update_item(user_id, line.id, 2).await.unwrap();

        let cart = service.cart(user_id).await.unwrap();
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.total.cents(), 2000);
    }

    #[tokio::test]
    async fn update_to_zero_removes_line() {
        let (service, product_id) = service();
        let user_id = UserId::new();

        let line = service.add_item(user_id, product_id, 5).await.unwrap();
        service.update_item(user_id, line.id, 0).await.unwrap();

        let cart = service.cart(user_id).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total, Money::zero());
    }

    #[tokio::test]
    async fn update_does_not_cross_user_boundaries() {
        let (service, product_id) = service();
        let owner = UserId::new();
        let intruder = UserId::new();

        let line = service.add_item(owner, product_id, 3).await.unwrap();

        let result = service.update_item(intruder, line.id, 1).await;
        assert!(matches!(result, Err(DomainError::NotFound)));
        let result = service.update_item(intruder, line.id, 0).await;
        assert!(matches!(result, Err(DomainError::NotFound)));

        let cart = service.cart(owner).await.unwrap();
        assert_eq!(cart.lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn cart_total_matches_displayed_lines() {
        let (service, product_id) = service();
        let second = ProductId::new();
        service.catalog.insert(ProductSnapshot {
            id: second,
            name: "Gadget".to_string(),
            price: Money::from_cents(500),
            image_url: None,
        });
        let user_id = UserId::new();

        service.add_item(user_id, product_id, 2).await.unwrap();
        service.add_item(user_id, second, 1).await.unwrap();

        let cart = service.cart(user_id).await.unwrap();
        let summed: i64 = cart.lines.iter().map(|l| l.line_total().cents()).sum();
        assert_eq!(cart.total.cents(), summed);
        assert_eq!(cart.total.cents(), 2500);
    }
}
