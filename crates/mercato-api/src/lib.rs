//! HTTP surface for the Mercato marketplace.
//!
//! An axum router over a [`Marketplace`]. Callers are identified by the
//! `x-user-*` headers a trusted gateway sets; every body is wrapped in
//! [`ApiResponse`].
//!
//! # Example
//!
//! ```rust,ignore
//! use mercato_api::{serve, AppState};
//! use mercato_commerce::{Marketplace, MarketplaceConfig};
//!
//! let state = AppState::new(Marketplace::new(MarketplaceConfig::default()));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! serve(listener, state).await?;
//! ```

mod error;
mod extract;
pub mod handlers;
mod middleware;
mod response;

pub use error::{ApiError, ApiResult};
pub use extract::{
    ApiJson, ApiQuery, CurrentActor, USER_EMAIL_HEADER, USER_ID_HEADER, USER_NAME_HEADER,
    USER_PHONE_HEADER, USER_ROLE_HEADER,
};
pub use response::ApiResponse;

use axum::routing::{get, post, put};
use axum::Router;
use mercato_commerce::Marketplace;
use tokio::net::TcpListener;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub market: Marketplace,
}

impl AppState {
    pub fn new(market: Marketplace) -> Self {
        Self { market }
    }
}

/// Build the full router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(cart_routes())
        .merge(order_routes())
        .layer(axum::middleware::from_fn(middleware::request_context))
        .with_state(state)
}

fn cart_routes() -> Router<AppState> {
    use handlers::cart;

    Router::new()
        .route(
            "/cart",
            get(cart::get).post(cart::add_item).delete(cart::clear),
        )
        .route(
            "/cart/items/{id}",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route("/cart/sync", post(cart::sync))
        .route("/cart/coupon", post(cart::apply_coupon))
        .route("/cart/coupon/{code}", axum::routing::delete(cart::remove_coupon))
}

fn order_routes() -> Router<AppState> {
    use handlers::orders;

    Router::new()
        .route("/orders", post(orders::create).get(orders::list))
        .route("/orders/{id}", get(orders::get))
        .route("/orders/{id}/cancel", put(orders::cancel))
        .route("/orders/{id}/status", put(orders::update_status))
        .route("/orders/{id}/tracking", put(orders::attach_tracking))
        .route("/orders/{id}/track", get(orders::track))
        .route("/seller/orders", get(orders::seller_list))
        .route("/seller/orders/{id}", get(orders::seller_get))
}

/// Serve the API until the process receives Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Mercato API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
