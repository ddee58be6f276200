//! Checkout module.
//!
//! Contains addresses, the order record, the status state machine, the
//! order builder, per-seller views, and the order service.

mod address;
mod builder;
mod order;
mod service;
mod splitter;
mod status;

pub use address::Address;
pub use builder::{
    demand_by_product, generate_order_number, validate_shape, CheckoutRequest, OrderBuilder,
    OrderLine, DEFAULT_SHIPPING_METHOD,
};
pub use order::{
    CustomerSnapshot, Order, OrderItem, OrderStatus, Payment, PaymentMethod, PaymentStatus,
    Reservation, ShippingInfo, StatusEntry,
};
pub use service::{OrderQuery, OrderService, TrackingView, ORDER_NAMESPACE};
pub use splitter::{seller_view, SellerOrderView};
pub use status::{check_transition, TrackingUpdate, Transition};
