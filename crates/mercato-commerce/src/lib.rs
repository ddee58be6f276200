//! Cart-to-order consistency core for the Mercato marketplace.
//!
//! This crate turns concurrently edited shopping carts into immutable,
//! multi-seller orders:
//!
//! - **Catalog**: read-only product view and the atomic stock ledger
//! - **Cart**: cart documents, pure cart commands, pricing, coupons
//! - **Retry**: bounded exponential-backoff retry of version conflicts
//! - **Checkout**: order builder, status state machine, seller views
//!
//! # Example
//!
//! ```rust,ignore
//! use mercato_commerce::prelude::*;
//!
//! let market = Marketplace::new(MarketplaceConfig::default());
//! market.catalog().upsert(product).await;
//!
//! let customer = Actor::customer("cust-1");
//! market.carts().add_item(&customer.id, &product_id, 2, None).await?;
//! let order = market.orders().checkout(&customer, request).await?;
//! println!("Total: {}", order.pricing.total);
//! ```

pub mod error;
pub mod identity;
pub mod ids;
pub mod money;
pub mod notify;
pub mod retry;

pub mod cart;
pub mod catalog;
pub mod checkout;

mod marketplace;

pub use error::{CommerceError, ErrorKind};
pub use ids::*;
pub use marketplace::{Marketplace, MarketplaceConfig};
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{CommerceError, ErrorKind};
    pub use crate::identity::{Actor, Role};
    pub use crate::ids::*;
    pub use crate::marketplace::{Marketplace, MarketplaceConfig};
    pub use crate::money::{Currency, Money};
    pub use crate::notify::{LogNotifier, MemoryNotifier, Notifier, OrderEvent};
    pub use crate::retry::{RetryCoordinator, RetryPolicy};

    // Catalog
    pub use crate::catalog::{
        Catalog, MemoryCatalog, MemoryStockLedger, Product, ProductStatus, ProductVariant,
        StockLedger, VariantSelector,
    };

    // Cart
    pub use crate::cart::{
        Cart, CartItem, CartService, CartStatus, Coupon, CouponKind, LineRequest,
        MemoryCouponDirectory, PricingBreakdown, PricingPolicy,
    };

    // Checkout
    pub use crate::checkout::{
        Address, CheckoutRequest, Order, OrderItem, OrderQuery, OrderService, OrderStatus,
        PaymentMethod, PaymentStatus, SellerOrderView, TrackingUpdate, TrackingView,
    };
}
