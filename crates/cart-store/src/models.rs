//! Record types for the cart and order relations.

use chrono::{DateTime, Utc};
use common::{CartLineId, Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// One line of a user's cart: unpurchased intent for a single product.
///
/// Unique per `(user_id, product_id)`; `quantity` is always positive. A
/// line whose quantity would drop to zero is deleted instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

/// A cart line joined with the current catalog snapshot.
///
/// This is what both the cart page and the checkout committer consume; the
/// price here is the live catalog price at the moment of the read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub name: String,
    pub unit_price: Money,
    pub image_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl CartLineView {
    /// Returns the extended price for this line (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Lifecycle status of a committed order.
///
/// Orders are created `pending`; the `fulfilled`/`cancelled` transitions
/// belong to fulfillment tooling outside this service, but the states are
/// part of the stored contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Fulfilled | OrderStatus::Cancelled)
    }

    /// Returns true if this status may transition to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (
                OrderStatus::Pending,
                OrderStatus::Fulfilled | OrderStatus::Cancelled
            )
        )
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "fulfilled" => Some(OrderStatus::Fulfilled),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable record of a completed checkout.
///
/// Created only by the checkout transaction, together with its lines; only
/// `status` ever changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a fresh pending order for a user with the given total.
    pub fn pending(user_id: UserId, total: Money) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            total,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// One line of a committed order.
///
/// `unit_price` is the catalog price frozen at commit time; later catalog
/// changes never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns the extended price for this line.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Order header plus line count, for order history listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub item_count: i64,
}
