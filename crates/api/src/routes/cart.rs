//! Cart endpoints: view, add, update.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use cart_store::{CartLineView, CatalogReader, StorefrontStore};
use common::{CartLineId, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

// -- Response types --

#[derive(Serialize)]
pub struct AddItemResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct UpdateItemResponse {
    pub success: bool,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub image_url: Option<String>,
}

impl From<&CartLineView> for CartItemResponse {
    fn from(line: &CartLineView) -> Self {
        CartItemResponse {
            id: line.line_id.to_string(),
            product_id: line.product_id.to_string(),
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            line_total_cents: line.line_total().cents(),
            image_url: line.image_url.clone(),
        }
    }
}

// -- Handlers --

/// GET /cart — the user's cart lines with current prices and total.
#[tracing::instrument(skip(state))]
pub async fn get<S: StorefrontStore + 'static, C: CatalogReader + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.cart.cart(user_id).await?;

    Ok(Json(CartResponse {
        items: cart.lines.iter().map(CartItemResponse::from).collect(),
        total_cents: cart.total.cents(),
    }))
}

/// POST /cart/items — add a quantity of a product to the cart.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: StorefrontStore + 'static, C: CatalogReader + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<AddItemResponse>, ApiError> {
    state
        .cart
        .add_item(user_id, ProductId::from_uuid(req.product_id), req.quantity)
        .await?;

    Ok(Json(AddItemResponse {
        success: true,
        message: "product added to cart".to_string(),
    }))
}

/// PUT /cart/items/:id — set a line's quantity; zero or less removes it.
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: StorefrontStore + 'static, C: CatalogReader + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<UpdateItemResponse>, ApiError> {
    let line_id = parse_line_id(&id)?;
    state.cart.update_item(user_id, line_id, req.quantity).await?;

    Ok(Json(UpdateItemResponse { success: true }))
}

fn parse_line_id(id: &str) -> Result<CartLineId, ApiError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid cart item id: {e}")))?;
    Ok(CartLineId::from_uuid(uuid))
}
