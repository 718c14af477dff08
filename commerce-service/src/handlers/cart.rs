//! Cart handlers.
//!
//! The cart is keyed by an opaque `session_id` the client supplies; there is
//! no account system in front of it. Every mutation responds with the full
//! reconstructed cart.

use crate::models::{AddCartItem, UpdateCartItem};
use crate::services::metrics::CART_OPERATIONS_TOTAL;
use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use service_core::response::ok;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveCartQuery {
    pub session_id: Option<String>,
    pub product_id: Option<String>,
    #[serde(default)]
    pub clear_all: bool,
}

fn require_session(session_id: Option<String>) -> Result<String, AppError> {
    session_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow!("session_id is required")))
}

/// `GET /cart` - fetch the session's cart, creating it on first contact.
pub async fn get_cart(
    State(state): State<AppState>,
    Query(query): Query<CartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = require_session(query.session_id)?;
    let view = state.db.cart_view(&session_id).await?;
    Ok(ok(view))
}

/// `POST /cart` - add a product; re-adding merges quantities.
pub async fn add_to_cart(
    State(state): State<AppState>,
    Json(input): Json<AddCartItem>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let view = state
        .db
        .add_cart_item(&input.session_id, &input.product_id, input.quantity)
        .await?;
    CART_OPERATIONS_TOTAL.with_label_values(&["add"]).inc();
    Ok(ok(view))
}

/// `PUT /cart` - overwrite a line's quantity; zero removes the line.
pub async fn update_cart(
    State(state): State<AppState>,
    Json(input): Json<UpdateCartItem>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let view = state
        .db
        .set_cart_item_quantity(&input.session_id, &input.product_id, input.quantity)
        .await?;
    CART_OPERATIONS_TOTAL.with_label_values(&["update"]).inc();
    Ok(ok(view))
}

/// `DELETE /cart` - remove one line (`product_id`) or every line
/// (`clear_all=true`). Asking for neither is a bad request.
pub async fn remove_from_cart(
    State(state): State<AppState>,
    Query(query): Query<RemoveCartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = require_session(query.session_id)?;

    let view = if query.clear_all {
        CART_OPERATIONS_TOTAL.with_label_values(&["clear"]).inc();
        state.db.clear_cart(&session_id).await?
    } else {
        let product_id = query
            .product_id
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                AppError::BadRequest(anyhow!("product_id or clear_all=true is required"))
            })?;
        CART_OPERATIONS_TOTAL.with_label_values(&["remove"]).inc();
        state.db.remove_cart_item(&session_id, &product_id).await?
    };

    Ok(ok(view))
}
