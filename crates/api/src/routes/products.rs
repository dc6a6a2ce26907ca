//! Read-only product browsing over the catalog seam.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use cart_store::{CatalogReader, ProductSnapshot, StorefrontStore};
use common::ProductId;
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub image_url: Option<String>,
}

impl From<ProductSnapshot> for ProductResponse {
    fn from(product: ProductSnapshot) -> Self {
        ProductResponse {
            id: product.id.to_string(),
            name: product.name,
            price_cents: product.price.cents(),
            image_url: product.image_url,
        }
    }
}

/// GET /products — all catalog products, ordered by name.
#[tracing::instrument(skip(state))]
pub async fn list<S: StorefrontStore + 'static, C: CatalogReader + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state
        .catalog
        .products()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// GET /products/:id — one catalog product.
#[tracing::instrument(skip(state))]
pub async fn get<S: StorefrontStore + 'static, C: CatalogReader + 'static>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let uuid = Uuid::parse_str(&id)
        .map_err(|e| ApiError::BadRequest(format!("invalid product id: {e}")))?;

    let product = state
        .catalog
        .product(ProductId::from_uuid(uuid))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))?;

    Ok(Json(product.into()))
}
