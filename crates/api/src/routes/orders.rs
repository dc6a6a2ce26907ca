//! Checkout and order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cart_store::{CatalogReader, Order, OrderLine, StorefrontStore};
use common::OrderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

// -- Request types --

/// Checkout form payload.
///
/// Shipping and payment details are accepted for interface compatibility
/// with the storefront form but are opaque to this core: nothing validates
/// or persists them, and card data in particular is never logged.
#[derive(Deserialize, Default)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub shipping: Option<ShippingDetails>,
    #[serde(default)]
    pub payment: Option<PaymentDetails>,
}

#[derive(Deserialize)]
pub struct ShippingDetails {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
}

#[derive(Deserialize)]
pub struct PaymentDetails {
    pub card_number: Option<String>,
    pub exp_date: Option<String>,
    pub cvv: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub order_id: String,
}

#[derive(Serialize)]
pub struct OrderSummaryResponse {
    pub id: String,
    pub total_cents: i64,
    pub status: String,
    pub created_at: String,
    pub item_count: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
    pub total_cents: i64,
    pub created_at: String,
    pub items: Vec<OrderLineResponse>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

fn order_response(order: Order, lines: Vec<OrderLine>) -> OrderResponse {
    OrderResponse {
        id: order.id.to_string(),
        status: order.status.to_string(),
        total_cents: order.total.cents(),
        created_at: order.created_at.to_rfc3339(),
        items: lines
            .iter()
            .map(|line| OrderLineResponse {
                product_id: line.product_id.to_string(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                line_total_cents: line.line_total().cents(),
            })
            .collect(),
    }
}

// -- Handlers --

/// POST /orders — commit the cart into a new order.
#[tracing::instrument(skip(state, _req))]
pub async fn place<S: StorefrontStore + 'static, C: CatalogReader + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    CurrentUser(user_id): CurrentUser,
    _req: Option<Json<PlaceOrderRequest>>,
) -> Result<(StatusCode, Json<PlaceOrderResponse>), ApiError> {
    let order = state.checkout.place_order(user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(PlaceOrderResponse {
            success: true,
            order_id: order.id.to_string(),
        }),
    ))
}

/// GET /orders — the user's order history, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: StorefrontStore + 'static, C: CatalogReader + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let summaries = state.checkout.orders(user_id).await?;

    Ok(Json(
        summaries
            .into_iter()
            .map(|summary| OrderSummaryResponse {
                id: summary.id.to_string(),
                total_cents: summary.total.cents(),
                status: summary.status.to_string(),
                created_at: summary.created_at.to_rfc3339(),
                item_count: summary.item_count,
            })
            .collect(),
    ))
}

/// GET /orders/:id — one order with its lines, scoped to the owner.
#[tracing::instrument(skip(state))]
pub async fn get<S: StorefrontStore + 'static, C: CatalogReader + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let (order, lines) = state.checkout.order(user_id, order_id).await?;

    Ok(Json(order_response(order, lines)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid =
        Uuid::parse_str(id).map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
