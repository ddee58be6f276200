//! Cart and order pricing.
//!
//! Totals are a pure function of the priced lines and the applied coupons:
//!
//! ```text
//! subtotal = sum(unit_price * quantity)
//! tax      = subtotal * tax_rate
//! shipping = 0 if subtotal >= free_shipping_threshold else flat_shipping
//! discount = sum(coupon contributions)
//! total    = max(0, subtotal + tax + shipping - discount)
//! ```

use crate::cart::AppliedCoupon;
use crate::error::CommerceError;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Pricing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Currency all amounts are priced in.
    #[serde(default)]
    pub currency: Currency,
    /// Tax rate in basis points (850 = 8.5%).
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: i64,
    /// Subtotal at or above which shipping is free.
    #[serde(default = "default_free_shipping_threshold_cents")]
    pub free_shipping_threshold_cents: i64,
    /// Shipping charged below the threshold.
    #[serde(default = "default_flat_shipping_cents")]
    pub flat_shipping_cents: i64,
}

fn default_tax_rate_bps() -> i64 {
    850
}

fn default_free_shipping_threshold_cents() -> i64 {
    5000
}

fn default_flat_shipping_cents() -> i64 {
    999
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            tax_rate_bps: default_tax_rate_bps(),
            free_shipping_threshold_cents: default_free_shipping_threshold_cents(),
            flat_shipping_cents: default_flat_shipping_cents(),
        }
    }
}

impl PricingPolicy {
    /// Sum of `unit_price * quantity` over the lines.
    pub fn subtotal<I>(&self, lines: I) -> Result<Money, CommerceError>
    where
        I: IntoIterator<Item = (Money, i64)>,
    {
        lines
            .into_iter()
            .try_fold(Money::zero(self.currency), |acc, (unit_price, quantity)| {
                if unit_price.currency != self.currency {
                    return Err(CommerceError::CurrencyMismatch {
                        expected: self.currency.code().to_string(),
                        got: unit_price.currency.code().to_string(),
                    });
                }
                let line = unit_price
                    .try_multiply(quantity)
                    .ok_or(CommerceError::Overflow)?;
                acc.try_add(&line).ok_or(CommerceError::Overflow)
            })
    }

    /// Shipping charge for a subtotal. The flat fee applies to any subtotal
    /// under the threshold, an empty one included.
    pub fn shipping_for(&self, subtotal: &Money) -> Money {
        if subtotal.amount_cents >= self.free_shipping_threshold_cents {
            Money::zero(self.currency)
        } else {
            Money::new(self.flat_shipping_cents, self.currency)
        }
    }

    /// Totals of a cart with no lines and no coupons.
    pub fn empty_totals(&self) -> PricingBreakdown {
        let zero = Money::zero(self.currency);
        let shipping = self.shipping_for(&zero);
        PricingBreakdown {
            shipping,
            total: shipping,
            ..PricingBreakdown::zero(self.currency)
        }
    }

    /// Price a set of lines. Each coupon's `discount` is refreshed against
    /// the new subtotal.
    pub fn price<I>(
        &self,
        lines: I,
        coupons: &mut [AppliedCoupon],
    ) -> Result<PricingBreakdown, CommerceError>
    where
        I: IntoIterator<Item = (Money, i64)>,
    {
        let subtotal = self.subtotal(lines)?;
        let tax = subtotal.apply_basis_points(self.tax_rate_bps);
        let shipping = self.shipping_for(&subtotal);

        let mut discount = Money::zero(self.currency);
        for coupon in coupons.iter_mut() {
            coupon.discount = coupon.contribution(&subtotal);
            discount = discount
                .try_add(&coupon.discount)
                .ok_or(CommerceError::Overflow)?;
        }

        let total = subtotal
            .try_add(&tax)
            .and_then(|m| m.try_add(&shipping))
            .and_then(|m| m.try_subtract(&discount))
            .ok_or(CommerceError::Overflow)?
            .non_negative();

        Ok(PricingBreakdown {
            subtotal,
            tax,
            shipping,
            discount,
            total,
        })
    }
}

/// Computed money figures for a cart or order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PricingBreakdown {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
}

impl PricingBreakdown {
    /// All-zero figures in a currency.
    pub fn zero(currency: Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            subtotal: zero,
            tax: zero,
            shipping: zero,
            discount: zero,
            total: zero,
        }
    }

    /// Check if any discount applies.
    pub fn has_discount(&self) -> bool {
        self.discount.amount_cents > 0
    }
}
