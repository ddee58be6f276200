//! Cart API Handlers

use axum::extract::{Path, State};
use mercato_commerce::cart::{Cart, LineRequest};
use mercato_commerce::catalog::VariantSelector;
use mercato_commerce::{CartItemId, ProductId};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extract::{ApiJson, CurrentActor};
use crate::response::ApiResponse;
use crate::AppState;

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddItemBody {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub variant: Option<VariantSelector>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SyncBody {
    #[serde(default)]
    pub items: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CouponBody {
    pub code: String,
}

/// GET /cart
pub async fn get(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<ApiResponse<Cart>> {
    let cart = state.market.carts().get_or_create(&actor.id).await?;
    Ok(ApiResponse::ok("Cart retrieved", cart))
}

/// POST /cart
pub async fn add_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(body): ApiJson<AddItemBody>,
) -> ApiResult<ApiResponse<Cart>> {
    let cart = state
        .market
        .carts()
        .add_item(&actor.id, &body.product_id, body.quantity, body.variant)
        .await?;
    Ok(ApiResponse::ok("Item added to cart", cart))
}

/// DELETE /cart
pub async fn clear(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<ApiResponse<Cart>> {
    let cart = state.market.carts().clear_cart(&actor.id).await?;
    Ok(ApiResponse::ok("Cart cleared", cart))
}

/// PUT /cart/items/{id}
pub async fn update_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(item_id): Path<CartItemId>,
    ApiJson(body): ApiJson<QuantityBody>,
) -> ApiResult<ApiResponse<Cart>> {
    let cart = state
        .market
        .carts()
        .update_quantity(&actor.id, &item_id, body.quantity)
        .await?;
    Ok(ApiResponse::ok("Cart updated", cart))
}

/// DELETE /cart/items/{id}
pub async fn remove_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(item_id): Path<CartItemId>,
) -> ApiResult<ApiResponse<Cart>> {
    let cart = state.market.carts().remove_item(&actor.id, &item_id).await?;
    Ok(ApiResponse::ok("Item removed from cart", cart))
}

/// POST /cart/sync
pub async fn sync(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(body): ApiJson<SyncBody>,
) -> ApiResult<ApiResponse<Cart>> {
    let cart = state.market.carts().sync(&actor.id, body.items).await?;
    Ok(ApiResponse::ok("Cart synced", cart))
}

/// POST /cart/coupon
pub async fn apply_coupon(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(body): ApiJson<CouponBody>,
) -> ApiResult<ApiResponse<Cart>> {
    let cart = state.market.carts().apply_coupon(&actor.id, &body.code).await?;
    Ok(ApiResponse::ok("Coupon applied", cart))
}

/// DELETE /cart/coupon/{code}
pub async fn remove_coupon(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(code): Path<String>,
) -> ApiResult<ApiResponse<Cart>> {
    let cart = state.market.carts().remove_coupon(&actor.id, &code).await?;
    Ok(ApiResponse::ok("Coupon removed", cart))
}
