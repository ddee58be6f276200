//! Per-seller order views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkout::{Address, Order, OrderItem, OrderStatus, PaymentStatus, ShippingInfo};
use crate::error::CommerceError;
use crate::ids::{OrderNumber, UserId};
use crate::money::Money;

/// The part of an order one seller may see.
///
/// Other sellers' items, order-wide totals and payment method details are
/// left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerOrderView {
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    /// Units across the seller's items.
    pub item_count: i64,
    /// Sum of the seller's line totals.
    pub subtotal: Money,
    pub shipping_address: Address,
    pub shipping: ShippingInfo,
    pub payment_status: PaymentStatus,
}

/// Build the seller's view of an order. `None` when the order has none of
/// the seller's items.
pub fn seller_view(order: &Order, seller_id: &UserId) -> Result<Option<SellerOrderView>, CommerceError> {
    let items: Vec<OrderItem> = order
        .items
        .iter()
        .filter(|i| &i.seller_id == seller_id)
        .cloned()
        .collect();
    if items.is_empty() {
        return Ok(None);
    }

    let mut subtotal = Money::zero(order.pricing.subtotal.currency);
    for item in &items {
        subtotal = subtotal
            .try_add(&item.line_total()?)
            .ok_or(CommerceError::Overflow)?;
    }

    Ok(Some(SellerOrderView {
        order_number: order.order_number.clone(),
        status: order.status,
        created_at: order.created_at,
        item_count: items.iter().map(|i| i.quantity).sum(),
        items,
        subtotal,
        shipping_address: order.shipping_address.clone(),
        shipping: order.shipping.clone(),
        payment_status: order.payment.status,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::PricingBreakdown;
    use crate::checkout::{CustomerSnapshot, Payment, PaymentMethod};
    use crate::ids::ProductId;
    use crate::money::Currency;

    fn item(product: &str, seller: &str, quantity: i64, price: i64) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(product),
            seller_id: UserId::new(seller),
            name: product.to_string(),
            sku: product.to_uppercase(),
            image: None,
            quantity,
            unit_price: Money::new(price, Currency::USD),
            variant: None,
        }
    }

    fn two_seller_order() -> Order {
        let now = Utc::now();
        Order {
            order_number: OrderNumber::new("ORD0000010AAA"),
            customer_id: UserId::new("c1"),
            customer: CustomerSnapshot::default(),
            items: vec![
                item("mug", "s1", 2, 1200),
                item("tee", "s2", 1, 2500),
                item("cap", "s1", 1, 900),
            ],
            pricing: PricingBreakdown::zero(Currency::USD),
            shipping_address: Address::default(),
            billing_address: Address::default(),
            payment: Payment {
                method: PaymentMethod::Card,
                status: PaymentStatus::Completed,
                transaction_id: Some("txn-1".into()),
                paid_at: Some(now),
            },
            shipping: ShippingInfo::default(),
            status: OrderStatus::Confirmed,
            history: Vec::new(),
            coupons: Vec::new(),
            notes: None,
            reservations: Vec::new(),
            stock_shortfall: Vec::new(),
            stock_released_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[test]
    fn test_view_contains_only_sellers_items() {
        let view = seller_view(&two_seller_order(), &UserId::new("s1"))
            .unwrap()
            .unwrap();
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal.amount_cents, 2 * 1200 + 900);
        assert_eq!(view.payment_status, PaymentStatus::Completed);
    }

    #[test]
    fn test_view_hides_payment_method() {
        let view = seller_view(&two_seller_order(), &UserId::new("s2"))
            .unwrap()
            .unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("payment").is_none());
        assert!(json.get("pricing").is_none());
        assert_eq!(json["payment_status"], "completed");
    }

    #[test]
    fn test_unrelated_seller_gets_none() {
        assert!(seller_view(&two_seller_order(), &UserId::new("s3"))
            .unwrap()
            .is_none());
    }
}
