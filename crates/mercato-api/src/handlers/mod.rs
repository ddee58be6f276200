//! Route handlers.

pub mod cart;
pub mod orders;

use serde::Serialize;

use crate::response::ApiResponse;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> ApiResponse<Health> {
    ApiResponse::ok(
        "Service is healthy",
        Health {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}
