//! Cart service.
//!
//! Every mutation is a read-modify-write of the customer's cart document:
//! read the cart and its version, apply a [`CartCommand`], then
//! compare-and-swap the result. Version conflicts are retried by the
//! [`RetryCoordinator`], so two concurrent edits of one cart both land.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mercato_store::{Collection, MemoryStore, ABSENT};
use serde::{Deserialize, Serialize};

use crate::cart::{
    Cart, CartCommand, CartStatus, CouponDirectory, PricedLine, PricingPolicy, MAX_QUANTITY_PER_ITEM,
};
use crate::catalog::{Catalog, Product, StockLedger, VariantSelector};
use crate::error::CommerceError;
use crate::ids::{CartItemId, ProductId, UserId};
use crate::retry::RetryCoordinator;

/// Store namespace for carts.
pub const CART_NAMESPACE: &str = "cart";

/// A requested cart line, as sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub variant: Option<VariantSelector>,
}

/// Cart operations for customers.
#[derive(Clone)]
pub struct CartService {
    carts: Collection<Cart>,
    catalog: Arc<dyn Catalog>,
    ledger: Arc<dyn StockLedger>,
    coupons: Arc<dyn CouponDirectory>,
    policy: PricingPolicy,
    retry: RetryCoordinator,
}

impl std::fmt::Debug for CartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService")
            .field("carts", &self.carts)
            .field("policy", &self.policy)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl CartService {
    /// Create a cart service over a shared store.
    pub fn new(
        store: Arc<MemoryStore>,
        catalog: Arc<dyn Catalog>,
        ledger: Arc<dyn StockLedger>,
        coupons: Arc<dyn CouponDirectory>,
    ) -> Self {
        Self {
            carts: Collection::new(store, CART_NAMESPACE),
            catalog,
            ledger,
            coupons,
            policy: PricingPolicy::default(),
            retry: RetryCoordinator::default(),
        }
    }

    /// Use a pricing policy.
    pub fn with_policy(mut self, policy: PricingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a retry coordinator.
    pub fn with_retry(mut self, retry: RetryCoordinator) -> Self {
        self.retry = retry;
        self
    }

    /// The pricing policy carts are priced with.
    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Read the customer's cart, or a fresh unsaved one at [`ABSENT`].
    async fn load(&self, customer_id: &UserId) -> Result<Cart, CommerceError> {
        match self.carts.get(customer_id.as_str()).await? {
            Some(stored) => {
                let mut cart = stored.value;
                cart.version = stored.version;
                Ok(cart)
            }
            None => Ok(Cart::new(customer_id.clone(), &self.policy, Utc::now())),
        }
    }

    async fn apply_once(
        &self,
        customer_id: &UserId,
        command: CartCommand,
    ) -> Result<Cart, CommerceError> {
        let current = self.load(customer_id).await?;
        let mut next = current.apply(command, &self.policy, Utc::now())?;
        next.version = self
            .carts
            .compare_and_swap(customer_id.as_str(), current.version, &next)
            .await?;
        Ok(next)
    }

    async fn mutate(
        &self,
        customer_id: &UserId,
        command: CartCommand,
    ) -> Result<Cart, CommerceError> {
        let name = command.name();
        let cart = self
            .retry
            .run(name, move || {
                let command = command.clone();
                async move { self.apply_once(customer_id, command).await }
            })
            .await?;
        tracing::debug!(
            customer_id = %customer_id,
            command = name,
            items = cart.items().len(),
            total_cents = cart.totals().total.amount_cents,
            version = cart.version,
            "Cart updated"
        );
        Ok(cart)
    }

    /// Get the customer's cart, creating it on first access.
    pub async fn get_or_create(&self, customer_id: &UserId) -> Result<Cart, CommerceError> {
        self.retry
            .run("get_or_create", move || async move {
                let mut cart = self.load(customer_id).await?;
                if cart.version == ABSENT {
                    cart.version = self
                        .carts
                        .compare_and_swap(customer_id.as_str(), ABSENT, &cart)
                        .await?;
                    tracing::debug!(customer_id = %customer_id, "Cart created");
                }
                Ok::<_, CommerceError>(cart)
            })
            .await
    }

    /// Resolve a purchasable product or fail with `ProductNotFound`.
    async fn purchasable(&self, product_id: &ProductId) -> Result<Product, CommerceError> {
        match self.catalog.get_product(product_id).await? {
            Some(product) if product.is_active() => Ok(product),
            _ => Err(CommerceError::ProductNotFound(product_id.to_string())),
        }
    }

    /// Add units of a product. Availability is checked, not reserved.
    pub async fn add_item(
        &self,
        customer_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
        variant: Option<VariantSelector>,
    ) -> Result<Cart, CommerceError> {
        if quantity < 1 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let product = self.purchasable(product_id).await?;
        let variant = VariantSelector::normalize(variant);
        let unit_price = product.price_for(variant.as_ref());
        let available = self.ledger.available(product_id).await?;

        self.mutate(
            customer_id,
            CartCommand::AddItem {
                line: PricedLine {
                    product_id: product_id.clone(),
                    variant,
                    quantity,
                    unit_price,
                },
                available,
            },
        )
        .await
    }

    /// Overwrite a line's quantity. Zero removes the line.
    pub async fn update_quantity(
        &self,
        customer_id: &UserId,
        item_id: &CartItemId,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        if quantity < 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let cart = self.load(customer_id).await?;
        let item = cart
            .get_item(item_id)
            .ok_or_else(|| CommerceError::CartItemNotFound(item_id.to_string()))?;
        let available = if quantity > 0 {
            self.ledger.available(&item.product_id).await?
        } else {
            0
        };

        self.mutate(
            customer_id,
            CartCommand::UpdateQuantity {
                item_id: item_id.clone(),
                quantity,
                available,
            },
        )
        .await
    }

    /// Remove a line.
    pub async fn remove_item(
        &self,
        customer_id: &UserId,
        item_id: &CartItemId,
    ) -> Result<Cart, CommerceError> {
        self.mutate(
            customer_id,
            CartCommand::RemoveItem {
                item_id: item_id.clone(),
            },
        )
        .await
    }

    /// Remove every line and coupon.
    pub async fn clear_cart(&self, customer_id: &UserId) -> Result<Cart, CommerceError> {
        self.mutate(customer_id, CartCommand::Clear).await
    }

    /// Apply a coupon by code.
    pub async fn apply_coupon(&self, customer_id: &UserId, code: &str) -> Result<Cart, CommerceError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CommerceError::validation("coupon code is required"));
        }
        let coupon = self
            .coupons
            .find(code)
            .await?
            .ok_or_else(|| CommerceError::InvalidCoupon {
                code: code.to_uppercase(),
                reason: "unknown coupon".into(),
            })?;
        let cart = self.load(customer_id).await?;
        coupon.check_applicable(&cart.totals().subtotal, Utc::now())?;

        self.mutate(customer_id, CartCommand::ApplyCoupon { coupon })
            .await
    }

    /// Remove an applied coupon.
    pub async fn remove_coupon(&self, customer_id: &UserId, code: &str) -> Result<Cart, CommerceError> {
        self.mutate(
            customer_id,
            CartCommand::RemoveCoupon {
                code: code.to_string(),
            },
        )
        .await
    }

    /// Replace the cart's lines with `items`.
    ///
    /// Entries with a quantity below one or above the per-line limit, a
    /// missing or inactive product, or more units than the ledger holds are
    /// dropped. Entries for the same product and variant are merged before
    /// the checks, and the stock check counts every variant of a product.
    pub async fn sync(&self, customer_id: &UserId, items: Vec<LineRequest>) -> Result<Cart, CommerceError> {
        let mut merged: Vec<LineRequest> = Vec::new();
        for mut item in items {
            if item.quantity < 1 {
                tracing::debug!(product_id = %item.product_id, quantity = item.quantity, "Sync dropped line: bad quantity");
                continue;
            }
            item.variant = VariantSelector::normalize(item.variant);
            match merged
                .iter_mut()
                .find(|m| m.product_id == item.product_id && m.variant == item.variant)
            {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
                None => merged.push(item),
            }
        }

        let mut lines = Vec::with_capacity(merged.len());
        let mut claimed: HashMap<ProductId, i64> = HashMap::new();
        for item in merged {
            if item.quantity > MAX_QUANTITY_PER_ITEM {
                tracing::debug!(product_id = %item.product_id, quantity = item.quantity, "Sync dropped line: over limit");
                continue;
            }
            let in_cart = claimed.get(&item.product_id).copied().unwrap_or(0);
            match self.price_line(&item, in_cart).await {
                Ok(line) => {
                    *claimed.entry(line.product_id.clone()).or_insert(0) += line.quantity;
                    lines.push(line);
                }
                Err(e) => {
                    tracing::debug!(product_id = %item.product_id, error = %e, "Sync dropped line");
                }
            }
        }

        self.mutate(customer_id, CartCommand::ReplaceItems { lines })
            .await
    }

    /// Price a sync line. `in_cart` is what earlier lines already hold of
    /// the same product.
    async fn price_line(&self, item: &LineRequest, in_cart: i64) -> Result<PricedLine, CommerceError> {
        let product = self.purchasable(&item.product_id).await?;
        let available = self.ledger.available(&item.product_id).await?;
        let requested = in_cart.saturating_add(item.quantity);
        if requested > available {
            return Err(CommerceError::InsufficientStock {
                product_id: item.product_id.to_string(),
                requested,
                available,
            });
        }
        Ok(PricedLine {
            product_id: item.product_id.clone(),
            variant: item.variant.clone(),
            quantity: item.quantity,
            unit_price: product.price_for(item.variant.as_ref()),
        })
    }

    /// Empty the cart after checkout and mark it converted.
    ///
    /// With `seen`, the cart is converted only while it is still at that
    /// version; a cart edited since then is left untouched and the call fails
    /// with `VersionConflict`. Without it the conversion is retried like any
    /// other mutation.
    pub async fn mark_converted(
        &self,
        customer_id: &UserId,
        seen: Option<u64>,
    ) -> Result<Cart, CommerceError> {
        let Some(version) = seen else {
            return self.mutate(customer_id, CartCommand::MarkConverted).await;
        };
        let current = self.load(customer_id).await?;
        let mut next = current.apply(CartCommand::MarkConverted, &self.policy, Utc::now())?;
        next.version = self
            .carts
            .compare_and_swap(customer_id.as_str(), version, &next)
            .await?;
        Ok(next)
    }

    /// Mark non-empty active carts idle since before `cutoff` as abandoned.
    ///
    /// Carts that change while the sweep runs are skipped. Returns the
    /// number of carts marked.
    pub async fn sweep_abandoned(&self, cutoff: DateTime<Utc>) -> Result<usize, CommerceError> {
        let mut marked = 0;
        for stored in self.carts.all().await? {
            let cart = stored.value;
            if cart.status != CartStatus::Active || cart.is_empty() || cart.last_activity >= cutoff {
                continue;
            }
            let next = cart.apply(CartCommand::MarkAbandoned, &self.policy, Utc::now())?;
            match self
                .carts
                .compare_and_swap(cart.customer_id.as_str(), stored.version, &next)
                .await
            {
                Ok(_) => marked += 1,
                Err(e) if e.is_conflict() => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if marked > 0 {
            tracing::info!(marked, cutoff = %cutoff, "Abandoned carts swept");
        }
        Ok(marked)
    }
}
