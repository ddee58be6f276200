//! Wiring of the in-memory collaborators and the two services.

use std::sync::Arc;

use mercato_store::MemoryStore;
use serde::{Deserialize, Serialize};

use crate::cart::{CartService, Coupon, MemoryCouponDirectory, PricingPolicy};
use crate::catalog::{MemoryCatalog, Product};
use crate::checkout::OrderService;
use crate::notify::{LogNotifier, Notifier};
use crate::retry::{RetryCoordinator, RetryPolicy};

/// Settings for a [`Marketplace`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    #[serde(default)]
    pub pricing: PricingPolicy,
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// A marketplace backed by one in-memory store, catalog and coupon
/// directory.
#[derive(Clone)]
pub struct Marketplace {
    store: Arc<MemoryStore>,
    catalog: Arc<MemoryCatalog>,
    coupons: Arc<MemoryCouponDirectory>,
    carts: CartService,
    orders: OrderService,
}

impl std::fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marketplace")
            .field("carts", &self.carts)
            .field("orders", &self.orders)
            .finish_non_exhaustive()
    }
}

impl Marketplace {
    /// Create a marketplace that logs notifications.
    pub fn new(config: MarketplaceConfig) -> Self {
        Self::with_notifier(config, Arc::new(LogNotifier))
    }

    /// Create a marketplace delivering notifications through `notifier`.
    pub fn with_notifier(config: MarketplaceConfig, notifier: Arc<dyn Notifier>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let catalog = Arc::new(MemoryCatalog::new());
        let coupons = Arc::new(MemoryCouponDirectory::new());
        let retry = RetryCoordinator::new(config.retry);

        let carts = CartService::new(
            Arc::clone(&store),
            catalog.clone(),
            catalog.ledger(),
            coupons.clone(),
        )
        .with_policy(config.pricing)
        .with_retry(retry);

        let orders = OrderService::new(
            Arc::clone(&store),
            carts.clone(),
            catalog.clone(),
            catalog.ledger(),
            coupons.clone(),
            notifier,
            config.pricing,
            retry,
        );

        Self {
            store,
            catalog,
            coupons,
            carts,
            orders,
        }
    }

    /// Add products and coupons.
    pub async fn seed(&self, products: Vec<Product>, coupons: Vec<Coupon>) {
        let (product_count, coupon_count) = (products.len(), coupons.len());
        for product in products {
            self.catalog.upsert(product).await;
        }
        for coupon in coupons {
            self.coupons.upsert(coupon).await;
        }
        tracing::info!(products = product_count, coupons = coupon_count, "Marketplace seeded");
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<MemoryCatalog> {
        &self.catalog
    }

    pub fn coupons(&self) -> &Arc<MemoryCouponDirectory> {
        &self.coupons
    }

    pub fn carts(&self) -> &CartService {
        &self.carts
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }
}
