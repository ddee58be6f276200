//! Cart and cart item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::{AppliedCoupon, PricingBreakdown, PricingPolicy};
use crate::catalog::VariantSelector;
use crate::error::CommerceError;
use crate::ids::{CartItemId, ProductId, UserId};
use crate::money::Money;

/// Maximum quantity allowed per cart item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// Lifecycle of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    /// Cart is being edited.
    #[default]
    Active,
    /// Marked by an external sweep after inactivity.
    Abandoned,
    /// An order was built from the cart.
    Converted,
}

/// A customer's shopping cart.
///
/// Items, coupons and totals change only through [`Cart::apply`], which
/// reprices the cart after every command, so the totals are always the
/// result of the current items and coupons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Owning customer. Also the cart's storage key.
    pub customer_id: UserId,
    pub(crate) items: Vec<CartItem>,
    pub(crate) coupons: Vec<AppliedCoupon>,
    pub(crate) totals: PricingBreakdown,
    /// Cart status.
    pub status: CartStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last mutation.
    pub last_activity: DateTime<Utc>,
    /// Version token of the stored document this cart was read at.
    #[serde(default)]
    pub version: u64,
}

impl Cart {
    /// Create an empty active cart, priced under `policy`.
    pub fn new(customer_id: UserId, policy: &PricingPolicy, now: DateTime<Utc>) -> Self {
        Self {
            customer_id,
            items: Vec::new(),
            coupons: Vec::new(),
            totals: policy.empty_totals(),
            status: CartStatus::Active,
            created_at: now,
            last_activity: now,
            version: 0,
        }
    }

    /// Items in the cart.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Applied coupons.
    pub fn coupons(&self) -> &[AppliedCoupon] {
        &self.coupons
    }

    /// Computed totals.
    pub fn totals(&self) -> &PricingBreakdown {
        &self.totals
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get an item by ID.
    pub fn get_item(&self, item_id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == item_id)
    }

    /// Find the line for a product and variant.
    pub fn find_line(
        &self,
        product_id: &ProductId,
        variant: Option<&VariantSelector>,
    ) -> Option<&CartItem> {
        self.items.iter().find(|i| i.matches(product_id, variant))
    }

    /// Check if a coupon code is applied.
    pub fn has_coupon(&self, code: &str) -> bool {
        self.coupons.iter().any(|c| c.code == code)
    }

    /// Recompute totals from items and coupons.
    pub(crate) fn reprice(&mut self, policy: &PricingPolicy) -> Result<(), CommerceError> {
        let lines = self.items.iter().map(|i| (i.unit_price, i.quantity));
        self.totals = policy.price(lines, &mut self.coupons)?;
        Ok(())
    }
}

/// A line in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Unique item identifier.
    pub id: CartItemId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Quantity, at least 1.
    pub quantity: i64,
    /// Selected variant, if any.
    #[serde(default)]
    pub variant: Option<VariantSelector>,
    /// Unit price when the line was added.
    pub unit_price: Money,
    /// When the line was added.
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Check if this line holds the given product and variant.
    pub fn matches(&self, product_id: &ProductId, variant: Option<&VariantSelector>) -> bool {
        &self.product_id == product_id && self.variant.as_ref() == variant
    }

    /// `unit_price * quantity`.
    pub fn line_total(&self) -> Result<Money, CommerceError> {
        self.unit_price
            .try_multiply(self.quantity)
            .ok_or(CommerceError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_new_cart_is_empty_and_active() {
        let policy = PricingPolicy::default();
        let cart = Cart::new(UserId::new("c1"), &policy, Utc::now());
        assert!(cart.is_empty());
        assert_eq!(cart.status, CartStatus::Active);
        assert_eq!(cart.totals().shipping, Money::new(999, Currency::USD));
        assert_eq!(cart.totals(), &policy.price(Vec::new(), &mut []).unwrap());
    }

    #[test]
    fn test_line_matching_respects_variant() {
        let red = VariantSelector {
            color: Some("Red".into()),
            ..Default::default()
        };
        let item = CartItem {
            id: CartItemId::new("i1"),
            product_id: ProductId::new("p1"),
            quantity: 2,
            variant: Some(red.clone()),
            unit_price: Money::new(1250, Currency::USD),
            added_at: Utc::now(),
        };

        assert!(item.matches(&ProductId::new("p1"), Some(&red)));
        assert!(!item.matches(&ProductId::new("p1"), None));
        assert_eq!(item.line_total().unwrap().amount_cents, 2500);
    }

    #[test]
    fn test_totals_survive_serialization() {
        let cart = Cart::new(UserId::new("c1"), &PricingPolicy::default(), Utc::now());
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["status"], "active");
        assert!(json["totals"]["total"].is_object());
    }
}
