//! Order builder.
//!
//! Turns a cart or an explicit item list into a pending [`Order`]. Building
//! validates and snapshots but never mutates stock; the order service
//! persists the result and then reserves.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cart::{AppliedCoupon, CartItem, LineRequest, PricingPolicy};
use crate::catalog::{Catalog, Product, StockLedger, VariantSelector};
use crate::checkout::{
    Address, CustomerSnapshot, Order, OrderItem, OrderStatus, Payment, PaymentMethod,
    PaymentStatus, Reservation, ShippingInfo, StatusEntry,
};
use crate::error::CommerceError;
use crate::identity::Actor;
use crate::ids::{OrderNumber, ProductId};
use crate::money::Money;

/// Shipping method used when the request names none.
pub const DEFAULT_SHIPPING_METHOD: &str = "standard";

/// Checkout input.
///
/// With no `items`, the order is built from the customer's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub shipping_address: Address,
    /// Defaults to the shipping address.
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Extra coupon codes to apply.
    #[serde(default)]
    pub coupon_codes: Vec<String>,
}

/// An item to order. `unit_price` is the cart snapshot, or `None` to
/// take the catalog price.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub variant: Option<VariantSelector>,
    pub unit_price: Option<Money>,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            variant: item.variant.clone(),
            unit_price: Some(item.unit_price),
        }
    }
}

impl From<&LineRequest> for OrderLine {
    fn from(item: &LineRequest) -> Self {
        Self {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            variant: VariantSelector::normalize(item.variant.clone()),
            unit_price: None,
        }
    }
}

/// Generate an order number: `ORD`, the last six digits of the millisecond
/// clock, then four random uppercase alphanumerics.
pub fn generate_order_number(now: DateTime<Utc>) -> OrderNumber {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let millis = now.timestamp_millis().rem_euclid(1_000_000);
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    OrderNumber::new(format!("ORD{millis:06}{suffix}"))
}

/// Units demanded per product, summed across lines, in first-seen order.
pub fn demand_by_product(lines: &[OrderLine]) -> Vec<Reservation> {
    let mut demand: Vec<Reservation> = Vec::new();
    for line in lines {
        match demand.iter_mut().find(|r| r.product_id == line.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => demand.push(Reservation {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            }),
        }
    }
    demand
}

/// Check the request shape. Returns the payment method.
pub fn validate_shape(
    lines: &[OrderLine],
    request: &CheckoutRequest,
) -> Result<PaymentMethod, CommerceError> {
    let mut problems = Vec::new();

    if lines.is_empty() {
        problems.push("at least one item is required".to_string());
    }
    if let Some(line) = lines.iter().find(|l| l.quantity < 1) {
        problems.push(format!(
            "quantity for {} must be at least 1",
            line.product_id
        ));
    }
    let missing = request.shipping_address.missing_fields();
    if !missing.is_empty() {
        problems.push(format!("shipping address is missing {}", missing.join(", ")));
    }
    if request.payment_method.is_none() {
        problems.push("payment method is required".to_string());
    }

    match (problems.is_empty(), request.payment_method) {
        (true, Some(method)) => Ok(method),
        _ => Err(CommerceError::Validation(problems.join("; "))),
    }
}

/// Validates lines against the catalog and ledger and assembles orders.
#[derive(Clone)]
pub struct OrderBuilder {
    catalog: Arc<dyn Catalog>,
    ledger: Arc<dyn StockLedger>,
    policy: PricingPolicy,
}

impl OrderBuilder {
    pub fn new(catalog: Arc<dyn Catalog>, ledger: Arc<dyn StockLedger>, policy: PricingPolicy) -> Self {
        Self {
            catalog,
            ledger,
            policy,
        }
    }

    /// Build a pending order. Nothing is persisted and no stock moves.
    pub async fn build(
        &self,
        customer: &Actor,
        lines: &[OrderLine],
        mut coupons: Vec<AppliedCoupon>,
        request: &CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<Order, CommerceError> {
        let payment_method = validate_shape(lines, request)?;

        let mut products: HashMap<ProductId, Product> = HashMap::new();
        for line in lines {
            if products.contains_key(&line.product_id) {
                continue;
            }
            match self.catalog.get_product(&line.product_id).await? {
                Some(product) if product.is_active() => {
                    products.insert(line.product_id.clone(), product);
                }
                _ => return Err(CommerceError::ProductNotFound(line.product_id.to_string())),
            }
        }

        for demand in demand_by_product(lines) {
            let available = self.ledger.available(&demand.product_id).await?;
            if demand.quantity > available {
                return Err(CommerceError::InsufficientStock {
                    product_id: demand.product_id.to_string(),
                    requested: demand.quantity,
                    available,
                });
            }
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| CommerceError::ProductNotFound(line.product_id.to_string()))?;
            items.push(OrderItem {
                product_id: line.product_id.clone(),
                seller_id: product.seller_id.clone(),
                name: product.name.clone(),
                sku: product.sku_for(line.variant.as_ref()),
                image: product.image.clone(),
                quantity: line.quantity,
                unit_price: line
                    .unit_price
                    .unwrap_or_else(|| product.price_for(line.variant.as_ref())),
                variant: line.variant.clone(),
            });
        }

        let pricing = self
            .policy
            .price(items.iter().map(|i| (i.unit_price, i.quantity)), &mut coupons)?;

        Ok(Order {
            order_number: generate_order_number(now),
            customer_id: customer.id.clone(),
            customer: CustomerSnapshot {
                name: customer.name.clone(),
                email: customer.email.clone(),
                phone: customer.phone.clone(),
            },
            items,
            pricing,
            billing_address: request
                .billing_address
                .clone()
                .unwrap_or_else(|| request.shipping_address.clone()),
            shipping_address: request.shipping_address.clone(),
            payment: Payment {
                method: payment_method,
                status: PaymentStatus::Pending,
                transaction_id: None,
                paid_at: None,
            },
            shipping: ShippingInfo {
                method: request
                    .shipping_method
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_SHIPPING_METHOD.to_string()),
                ..ShippingInfo::default()
            },
            status: OrderStatus::Pending,
            history: vec![StatusEntry {
                status: OrderStatus::Pending,
                at: now,
                note: Some("Order placed".to_string()),
                actor: Some(customer.id.clone()),
            }],
            coupons,
            notes: request.notes.clone(),
            reservations: Vec::new(),
            stock_shortfall: Vec::new(),
            stock_released_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }
}
