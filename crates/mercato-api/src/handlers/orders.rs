//! Order API Handlers

use axum::body::Bytes;
use axum::extract::{Path, State};
use mercato_commerce::checkout::{
    CheckoutRequest, Order, OrderQuery, OrderStatus, SellerOrderView, TrackingUpdate, TrackingView,
};
use mercato_commerce::identity::Role;
use mercato_commerce::OrderNumber;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{optional_json, ApiJson, ApiQuery, CurrentActor};
use crate::response::ApiResponse;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CancelBody {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// POST /orders
pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> ApiResult<ApiResponse<Order>> {
    let order = state.market.orders().checkout(&actor, request).await?;
    Ok(ApiResponse::created("Order placed successfully", order))
}

/// GET /orders
pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<ApiResponse<Vec<Order>>> {
    let orders = state.market.orders().list(&actor, &query).await?;
    Ok(ApiResponse::ok("Orders retrieved", orders))
}

/// GET /orders/{id}
pub async fn get(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(number): Path<OrderNumber>,
) -> ApiResult<ApiResponse<Order>> {
    let order = state.market.orders().get(&actor, &number).await?;
    Ok(ApiResponse::ok("Order retrieved", order))
}

/// PUT /orders/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(number): Path<OrderNumber>,
    body: Bytes,
) -> ApiResult<ApiResponse<Order>> {
    let body: CancelBody = optional_json(&body)?;
    let order = state
        .market
        .orders()
        .cancel(&actor, &number, body.reason)
        .await?;
    Ok(ApiResponse::ok("Order cancelled", order))
}

/// PUT /orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(number): Path<OrderNumber>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<ApiResponse<Order>> {
    if actor.role == Role::Customer {
        return Err(ApiError::Forbidden("seller or admin access required".into()));
    }
    let order = state
        .market
        .orders()
        .update_status(&actor, &number, body.status, body.note)
        .await?;
    Ok(ApiResponse::ok("Order status updated", order))
}

/// PUT /orders/{id}/tracking
pub async fn attach_tracking(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(number): Path<OrderNumber>,
    ApiJson(update): ApiJson<TrackingUpdate>,
) -> ApiResult<ApiResponse<Order>> {
    if actor.role == Role::Customer {
        return Err(ApiError::Forbidden("seller or admin access required".into()));
    }
    let order = state
        .market
        .orders()
        .attach_tracking(&actor, &number, update)
        .await?;
    Ok(ApiResponse::ok("Tracking updated", order))
}

/// GET /orders/{id}/track
pub async fn track(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(number): Path<OrderNumber>,
) -> ApiResult<ApiResponse<TrackingView>> {
    let view = state.market.orders().track(&actor, &number).await?;
    Ok(ApiResponse::ok("Tracking retrieved", view))
}

/// GET /seller/orders
pub async fn seller_list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<ApiResponse<Vec<SellerOrderView>>> {
    let views = state.market.orders().seller_orders(&actor, &query).await?;
    Ok(ApiResponse::ok("Seller orders retrieved", views))
}

/// GET /seller/orders/{id}
pub async fn seller_get(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(number): Path<OrderNumber>,
) -> ApiResult<ApiResponse<SellerOrderView>> {
    let view = state.market.orders().seller_order(&actor, &number).await?;
    Ok(ApiResponse::ok("Seller order retrieved", view))
}
