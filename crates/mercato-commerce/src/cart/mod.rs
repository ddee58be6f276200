//! Shopping cart module.
//!
//! Contains the cart document, the commands that mutate it, pricing,
//! coupons, and the service that persists carts with optimistic
//! concurrency.

mod cart;
mod command;
mod coupon;
mod pricing;
mod service;

pub use cart::{Cart, CartItem, CartStatus, MAX_QUANTITY_PER_ITEM};
pub use command::{CartCommand, PricedLine};
pub use coupon::{normalize_code, AppliedCoupon, Coupon, CouponDirectory, CouponKind, MemoryCouponDirectory};
pub use pricing::{PricingBreakdown, PricingPolicy};
pub use service::{CartService, LineRequest, CART_NAMESPACE};
