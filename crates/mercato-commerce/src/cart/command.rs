//! Cart commands.
//!
//! A command carries everything it needs (resolved prices, stock snapshots,
//! validated coupons), so applying it is a pure function of the cart. The
//! cart service can re-run [`Cart::apply`] against a freshly read cart on
//! every retry.

use chrono::{DateTime, Utc};

use crate::cart::{AppliedCoupon, Cart, CartItem, CartStatus, Coupon, PricingPolicy};
use crate::cart::MAX_QUANTITY_PER_ITEM;
use crate::catalog::VariantSelector;
use crate::error::CommerceError;
use crate::ids::{CartItemId, ProductId};
use crate::money::Money;

/// A product line with its resolved unit price.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub variant: Option<VariantSelector>,
    pub quantity: i64,
    pub unit_price: Money,
}

/// A cart mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum CartCommand {
    /// Add units of a product, merging into an existing line.
    AddItem {
        line: PricedLine,
        /// Units the ledger can supply.
        available: i64,
    },
    /// Overwrite a line's quantity. Zero removes the line.
    UpdateQuantity {
        item_id: CartItemId,
        quantity: i64,
        /// Units the ledger can supply for the line's product.
        available: i64,
    },
    /// Remove a line.
    RemoveItem { item_id: CartItemId },
    /// Remove every line and coupon.
    Clear,
    /// Apply a coupon the caller already found in the directory.
    ApplyCoupon { coupon: Coupon },
    /// Remove an applied coupon.
    RemoveCoupon { code: String },
    /// Replace every line. Lines for the same product and variant merge;
    /// lines with an unusable quantity are skipped.
    ReplaceItems { lines: Vec<PricedLine> },
    /// Empty the cart after an order was built from it.
    MarkConverted,
    /// Flag an idle cart. Leaves the last-activity time untouched.
    MarkAbandoned,
}

impl CartCommand {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            CartCommand::AddItem { .. } => "add_item",
            CartCommand::UpdateQuantity { .. } => "update_quantity",
            CartCommand::RemoveItem { .. } => "remove_item",
            CartCommand::Clear => "clear",
            CartCommand::ApplyCoupon { .. } => "apply_coupon",
            CartCommand::RemoveCoupon { .. } => "remove_coupon",
            CartCommand::ReplaceItems { .. } => "replace_items",
            CartCommand::MarkConverted => "mark_converted",
            CartCommand::MarkAbandoned => "mark_abandoned",
        }
    }
}

fn check_quantity(quantity: i64) -> Result<(), CommerceError> {
    if quantity <= 0 {
        return Err(CommerceError::InvalidQuantity(quantity));
    }
    if quantity > MAX_QUANTITY_PER_ITEM {
        return Err(CommerceError::validation(format!(
            "quantity {quantity} exceeds the limit of {MAX_QUANTITY_PER_ITEM}"
        )));
    }
    Ok(())
}

/// Units of `product_id` held by lines other than `skip`, across variants.
fn units_of(cart: &Cart, product_id: &ProductId, skip: Option<&CartItemId>) -> Result<i64, CommerceError> {
    cart.items
        .iter()
        .filter(|i| &i.product_id == product_id && Some(&i.id) != skip)
        .try_fold(0i64, |acc, i| acc.checked_add(i.quantity))
        .ok_or(CommerceError::Overflow)
}

fn check_stock(product_id: &ProductId, requested: i64, available: i64) -> Result<(), CommerceError> {
    if requested > available {
        return Err(CommerceError::InsufficientStock {
            product_id: product_id.to_string(),
            requested,
            available,
        });
    }
    Ok(())
}

impl Cart {
    /// Apply a command, returning the updated cart.
    ///
    /// Any mutation makes an abandoned or converted cart active again,
    /// except the two status commands themselves.
    pub fn apply(
        &self,
        command: CartCommand,
        policy: &PricingPolicy,
        now: DateTime<Utc>,
    ) -> Result<Cart, CommerceError> {
        let mut cart = self.clone();
        cart.status = CartStatus::Active;

        match command {
            CartCommand::AddItem { line, available } => {
                check_quantity(line.quantity)?;
                let variant = VariantSelector::normalize(line.variant);
                let wanted = units_of(&cart, &line.product_id, None)?
                    .checked_add(line.quantity)
                    .ok_or(CommerceError::Overflow)?;
                check_stock(&line.product_id, wanted, available)?;

                let existing = cart
                    .items
                    .iter_mut()
                    .find(|i| i.matches(&line.product_id, variant.as_ref()));

                match existing {
                    Some(item) => {
                        let quantity = item
                            .quantity
                            .checked_add(line.quantity)
                            .ok_or(CommerceError::Overflow)?;
                        check_quantity(quantity)?;
                        item.quantity = quantity;
                    }
                    None => {
                        cart.items.push(CartItem {
                            id: CartItemId::generate(),
                            product_id: line.product_id,
                            quantity: line.quantity,
                            variant,
                            unit_price: line.unit_price,
                            added_at: now,
                        });
                    }
                }
            }
            CartCommand::UpdateQuantity {
                item_id,
                quantity,
                available,
            } => {
                if quantity == 0 {
                    remove_item(&mut cart, &item_id)?;
                } else {
                    check_quantity(quantity)?;
                    let product_id = cart
                        .get_item(&item_id)
                        .map(|i| i.product_id.clone())
                        .ok_or_else(|| CommerceError::CartItemNotFound(item_id.to_string()))?;
                    let wanted = units_of(&cart, &product_id, Some(&item_id))?
                        .checked_add(quantity)
                        .ok_or(CommerceError::Overflow)?;
                    check_stock(&product_id, wanted, available)?;
                    if let Some(item) = cart.items.iter_mut().find(|i| i.id == item_id) {
                        item.quantity = quantity;
                    }
                }
            }
            CartCommand::RemoveItem { item_id } => remove_item(&mut cart, &item_id)?,
            CartCommand::Clear => {
                cart.items.clear();
                cart.coupons.clear();
            }
            CartCommand::ApplyCoupon { coupon } => {
                let applied = AppliedCoupon::from_coupon(&coupon);
                if cart.has_coupon(&applied.code) {
                    return Err(CommerceError::DuplicateCoupon(applied.code));
                }
                cart.coupons.push(applied);
            }
            CartCommand::RemoveCoupon { code } => {
                let code = crate::cart::normalize_code(&code);
                let before = cart.coupons.len();
                cart.coupons.retain(|c| c.code != code);
                if cart.coupons.len() == before {
                    return Err(CommerceError::CouponNotApplied(code));
                }
            }
            CartCommand::ReplaceItems { lines } => {
                let previous = std::mem::take(&mut cart.items);
                for line in lines {
                    if check_quantity(line.quantity).is_err() {
                        continue;
                    }
                    let variant = VariantSelector::normalize(line.variant);
                    if let Some(item) = cart
                        .items
                        .iter_mut()
                        .find(|i| i.matches(&line.product_id, variant.as_ref()))
                    {
                        match item.quantity.checked_add(line.quantity) {
                            Some(quantity) if quantity <= MAX_QUANTITY_PER_ITEM => item.quantity = quantity,
                            _ => {}
                        }
                        continue;
                    }
                    // keep id and added_at of a line that survives the sync
                    let kept = previous
                        .iter()
                        .find(|i| i.matches(&line.product_id, variant.as_ref()));
                    cart.items.push(CartItem {
                        id: kept.map(|i| i.id.clone()).unwrap_or_else(CartItemId::generate),
                        added_at: kept.map(|i| i.added_at).unwrap_or(now),
                        product_id: line.product_id,
                        quantity: line.quantity,
                        variant,
                        unit_price: line.unit_price,
                    });
                }
            }
            CartCommand::MarkConverted => {
                cart.items.clear();
                cart.coupons.clear();
                cart.status = CartStatus::Converted;
            }
            CartCommand::MarkAbandoned => {
                cart.status = CartStatus::Abandoned;
                return Ok(cart);
            }
        }

        cart.last_activity = now;
        cart.reprice(policy)?;
        Ok(cart)
    }
}

fn remove_item(cart: &mut Cart, item_id: &CartItemId) -> Result<(), CommerceError> {
    let before = cart.items.len();
    cart.items.retain(|i| &i.id != item_id);
    if cart.items.len() == before {
        return Err(CommerceError::CartItemNotFound(item_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;
    use crate::money::Currency;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn line(product: &str, quantity: i64, price: i64) -> PricedLine {
        PricedLine {
            product_id: ProductId::new(product),
            variant: None,
            quantity,
            unit_price: usd(price),
        }
    }

    fn add(cart: &Cart, product: &str, quantity: i64, price: i64) -> Result<Cart, CommerceError> {
        cart.apply(
            CartCommand::AddItem {
                line: line(product, quantity, price),
                available: 10,
            },
            &PricingPolicy::default(),
            Utc::now(),
        )
    }

    fn empty() -> Cart {
        Cart::new(UserId::new("c1"), &PricingPolicy::default(), Utc::now())
    }

    #[test]
    fn test_add_item_prices_cart() {
        let cart = add(&empty(), "p1", 2, 3000).unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.totals().subtotal, usd(6000));
        assert_eq!(cart.totals().tax, usd(510));
        assert_eq!(cart.totals().total, usd(6510));
    }

    #[test]
    fn test_add_same_item_increases_quantity() {
        let cart = add(&empty(), "p1", 1, 1000).unwrap();
        let cart = add(&cart, "p1", 2, 1000).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_same_product_different_variant_is_new_line() {
        let cart = add(&empty(), "p1", 1, 1000).unwrap();
        let mut red = line("p1", 1, 1200);
        red.variant = Some(VariantSelector {
            color: Some("Red".into()),
            ..Default::default()
        });
        let cart = cart
            .apply(
                CartCommand::AddItem { line: red, available: 10 },
                &PricingPolicy::default(),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_add_beyond_stock_counts_existing_line() {
        let cart = add(&empty(), "p1", 8, 1000).unwrap();
        let err = add(&cart, "p1", 3, 1000).unwrap_err();
        match err {
            CommerceError::InsufficientStock { requested, available, .. } => {
                assert_eq!(requested, 11);
                assert_eq!(available, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_quantity() {
        assert!(matches!(
            add(&empty(), "p1", 0, 1000),
            Err(CommerceError::InvalidQuantity(0))
        ));
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let cart = add(&empty(), "p1", 2, 1000).unwrap();
        let item_id = cart.items()[0].id.clone();
        let cart = cart
            .apply(
                CartCommand::UpdateQuantity { item_id, quantity: 0, available: 10 },
                &PricingPolicy::default(),
                Utc::now(),
            )
            .unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.totals().shipping, usd(999));
        assert_eq!(cart.totals().total, usd(999));
    }

    #[test]
    fn test_update_unknown_item() {
        let err = empty()
            .apply(
                CartCommand::UpdateQuantity {
                    item_id: CartItemId::new("missing"),
                    quantity: 2,
                    available: 10,
                },
                &PricingPolicy::default(),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CommerceError::CartItemNotFound(_)));
    }

    #[test]
    fn test_duplicate_coupon_rejected() {
        let policy = PricingPolicy::default();
        let cart = add(&empty(), "p1", 2, 3000).unwrap();
        let coupon = Coupon::percentage("SAVE10", 10);
        let cart = cart
            .apply(CartCommand::ApplyCoupon { coupon: coupon.clone() }, &policy, Utc::now())
            .unwrap();
        assert_eq!(cart.totals().discount, usd(600));
        assert_eq!(cart.totals().total, usd(5910));

        let err = cart
            .apply(CartCommand::ApplyCoupon { coupon }, &policy, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CommerceError::DuplicateCoupon(_)));
    }

    #[test]
    fn test_remove_coupon_absent() {
        let err = empty()
            .apply(
                CartCommand::RemoveCoupon { code: "NOPE".into() },
                &PricingPolicy::default(),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CommerceError::CouponNotApplied(_)));
    }

    #[test]
    fn test_replace_items_merges_and_keeps_ids() {
        let policy = PricingPolicy::default();
        let lines = vec![line("p1", 1, 1000), line("p2", 1, 500), line("p1", 2, 1000)];

        let first = empty()
            .apply(CartCommand::ReplaceItems { lines: lines.clone() }, &policy, Utc::now())
            .unwrap();
        assert_eq!(first.items().len(), 2);
        assert_eq!(first.find_line(&ProductId::new("p1"), None).unwrap().quantity, 3);

        let second = first
            .apply(CartCommand::ReplaceItems { lines }, &policy, Utc::now())
            .unwrap();
        assert_eq!(second.items(), first.items());
        assert_eq!(second.totals(), first.totals());
    }

    #[test]
    fn test_mark_abandoned_keeps_items_and_activity() {
        let cart = add(&empty(), "p1", 1, 1000).unwrap();
        let abandoned = cart
            .apply(CartCommand::MarkAbandoned, &PricingPolicy::default(), Utc::now())
            .unwrap();
        assert_eq!(abandoned.status, CartStatus::Abandoned);
        assert_eq!(abandoned.items(), cart.items());
        assert_eq!(abandoned.last_activity, cart.last_activity);
    }

    #[test]
    fn test_mark_converted_then_reactivate() {
        let policy = PricingPolicy::default();
        let cart = add(&empty(), "p1", 1, 1000).unwrap();
        let cart = cart
            .apply(CartCommand::MarkConverted, &policy, Utc::now())
            .unwrap();
        assert_eq!(cart.status, CartStatus::Converted);
        assert!(cart.is_empty());
        assert!(cart.coupons().is_empty());

        let cart = add(&cart, "p1", 1, 1000).unwrap();
        assert_eq!(cart.status, CartStatus::Active);
    }

    fn colored(product: &str, color: &str, quantity: i64) -> PricedLine {
        PricedLine {
            variant: Some(VariantSelector {
                color: Some(color.into()),
                ..Default::default()
            }),
            ..line(product, quantity, 1500)
        }
    }

    #[test]
    fn test_variants_share_product_stock() {
        let policy = PricingPolicy::default();
        let cart = empty()
            .apply(CartCommand::AddItem { line: colored("tee", "Red", 2), available: 3 }, &policy, Utc::now())
            .unwrap();

        let err = cart
            .apply(CartCommand::AddItem { line: colored("tee", "Blue", 2), available: 3 }, &policy, Utc::now())
            .unwrap_err();
        match err {
            CommerceError::InsufficientStock { requested, available, .. } => {
                assert_eq!(requested, 4);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let cart = cart
            .apply(CartCommand::AddItem { line: colored("tee", "Blue", 1), available: 3 }, &policy, Utc::now())
            .unwrap();
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_update_counts_other_variant_lines() {
        let policy = PricingPolicy::default();
        let cart = empty()
            .apply(CartCommand::AddItem { line: colored("tee", "Red", 2), available: 3 }, &policy, Utc::now())
            .unwrap()
            .apply(CartCommand::AddItem { line: colored("tee", "Blue", 1), available: 3 }, &policy, Utc::now())
            .unwrap();
        let blue = cart.items()[1].id.clone();

        let update = |quantity| CartCommand::UpdateQuantity {
            item_id: blue.clone(),
            quantity,
            available: 3,
        };
        assert!(matches!(
            cart.apply(update(2), &policy, Utc::now()),
            Err(CommerceError::InsufficientStock { requested: 4, .. })
        ));
        // replacing the line's own units is not double counted
        let cart = cart.apply(update(1), &policy, Utc::now()).unwrap();
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_replace_items_skips_unusable_quantities() {
        let lines = vec![
            line("p1", 1, 1000),
            line("p2", MAX_QUANTITY_PER_ITEM + 1, 500),
            line("p3", 0, 500),
        ];
        let cart = empty()
            .apply(CartCommand::ReplaceItems { lines }, &PricingPolicy::default(), Utc::now())
            .unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product_id, ProductId::new("p1"));
    }
}
