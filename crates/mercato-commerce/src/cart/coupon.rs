//! Coupon types and the coupon directory.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::CommerceError;
use crate::money::Money;

/// How a coupon's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    /// `value` is a whole percent of the subtotal.
    Percentage,
    /// `value` is a flat amount in cents.
    Fixed,
}

impl CouponKind {
    /// Discount for a subtotal, rounded half-up to the cent.
    ///
    /// Fixed amounts are not capped at the subtotal; the order total is
    /// clamped at zero instead.
    pub fn contribution(&self, value: i64, subtotal: &Money) -> Money {
        match self {
            CouponKind::Percentage => subtotal.apply_basis_points(value.saturating_mul(100)),
            CouponKind::Fixed => Money::new(value, subtotal.currency),
        }
    }
}

/// A coupon definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    /// Coupon code (e.g., "SAVE10"). Codes are matched case-insensitively.
    pub code: String,
    /// Type of discount.
    #[serde(rename = "type")]
    pub kind: CouponKind,
    /// Percent or cents, depending on `kind`.
    pub value: i64,
    /// Whether the coupon can be applied.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Expiry instant.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Minimum cart subtotal, in cents.
    #[serde(default)]
    pub min_subtotal_cents: Option<i64>,
    /// Display text.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Coupon {
    /// Create a new percentage coupon.
    pub fn percentage(code: impl Into<String>, percent: i64) -> Self {
        Self {
            code: normalize_code(&code.into()),
            kind: CouponKind::Percentage,
            value: percent,
            active: true,
            expires_at: None,
            min_subtotal_cents: None,
            description: None,
        }
    }

    /// Create a new fixed amount coupon.
    pub fn fixed(code: impl Into<String>, amount: Money) -> Self {
        Self {
            code: normalize_code(&code.into()),
            kind: CouponKind::Fixed,
            value: amount.amount_cents,
            active: true,
            expires_at: None,
            min_subtotal_cents: None,
            description: None,
        }
    }

    /// Set expiration instant.
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Require a minimum subtotal.
    pub fn with_minimum_subtotal(mut self, amount: Money) -> Self {
        self.min_subtotal_cents = Some(amount.amount_cents);
        self
    }

    /// Check if the coupon has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now > at).unwrap_or(false)
    }

    /// Check that the coupon can be applied to a cart with `subtotal`.
    pub fn check_applicable(&self, subtotal: &Money, now: DateTime<Utc>) -> Result<(), CommerceError> {
        let reject = |reason: &str| CommerceError::InvalidCoupon {
            code: self.code.clone(),
            reason: reason.to_string(),
        };

        if !self.active {
            return Err(reject("coupon is not active"));
        }
        if self.is_expired(now) {
            return Err(reject("coupon has expired"));
        }
        if let Some(minimum) = self.min_subtotal_cents {
            if subtotal.amount_cents < minimum {
                let minimum = Money::new(minimum, subtotal.currency);
                return Err(reject(&format!("requires a subtotal of at least {minimum}")));
            }
        }
        Ok(())
    }
}

/// Canonical form of a coupon code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A coupon that has been applied to a cart.
///
/// The coupon's terms are copied at apply time; `discount` is recomputed
/// whenever the cart is repriced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedCoupon {
    /// The coupon code used.
    pub code: String,
    /// Type of discount.
    #[serde(rename = "type")]
    pub kind: CouponKind,
    /// Percent or cents, depending on `kind`.
    pub value: i64,
    /// Amount discounted at the last repricing.
    pub discount: Money,
}

impl AppliedCoupon {
    /// Snapshot a coupon definition.
    pub fn from_coupon(coupon: &Coupon) -> Self {
        Self {
            code: normalize_code(&coupon.code),
            kind: coupon.kind,
            value: coupon.value,
            discount: Money::default(),
        }
    }

    /// Discount for a subtotal.
    pub fn contribution(&self, subtotal: &Money) -> Money {
        self.kind.contribution(self.value, subtotal)
    }
}

/// Lookup of coupon definitions by code.
#[async_trait]
pub trait CouponDirectory: Send + Sync {
    /// Find a coupon. Returns `None` for unknown codes.
    async fn find(&self, code: &str) -> Result<Option<Coupon>, CommerceError>;
}

/// In-memory [`CouponDirectory`].
#[derive(Debug, Default)]
pub struct MemoryCouponDirectory {
    coupons: RwLock<HashMap<String, Coupon>>,
}

impl MemoryCouponDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a coupon.
    pub async fn upsert(&self, mut coupon: Coupon) {
        coupon.code = normalize_code(&coupon.code);
        self.coupons.write().await.insert(coupon.code.clone(), coupon);
    }
}

#[async_trait]
impl CouponDirectory for MemoryCouponDirectory {
    async fn find(&self, code: &str) -> Result<Option<Coupon>, CommerceError> {
        Ok(self.coupons.read().await.get(&normalize_code(code)).cloned())
    }
}
