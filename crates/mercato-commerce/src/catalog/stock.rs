//! Stock ledger.
//!
//! Each product has an available counter and a sold counter. A reservation
//! is a single compare-and-decrement on the available counter, so two
//! checkouts racing for the last unit can never both win.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::CommerceError;
use crate::ids::ProductId;

/// Point-in-time stock figures for a product.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StockLevel {
    /// Units that can still be reserved.
    pub available: i64,
    /// Units reserved by orders and not released.
    pub sold: i64,
}

impl StockLevel {
    /// Check if a quantity can be supplied right now.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.available >= quantity
    }

    /// Check if out of stock.
    pub fn is_out_of_stock(&self) -> bool {
        self.available <= 0
    }
}

/// Owner of per-product stock counters.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Current figures for a product.
    async fn level(&self, product_id: &ProductId) -> Result<StockLevel, CommerceError>;

    /// Atomically take `quantity` units, failing with
    /// [`CommerceError::InsufficientStock`] if fewer are available.
    async fn reserve(&self, product_id: &ProductId, quantity: i64) -> Result<(), CommerceError>;

    /// Return `quantity` previously reserved units.
    async fn release(&self, product_id: &ProductId, quantity: i64) -> Result<(), CommerceError>;

    /// Units that can still be reserved.
    async fn available(&self, product_id: &ProductId) -> Result<i64, CommerceError> {
        Ok(self.level(product_id).await?.available)
    }
}

#[derive(Debug, Default)]
struct StockCounter {
    available: AtomicI64,
    sold: AtomicI64,
}

impl StockCounter {
    fn level(&self) -> StockLevel {
        StockLevel {
            available: self.available.load(Ordering::SeqCst),
            sold: self.sold.load(Ordering::SeqCst),
        }
    }
}

/// In-process [`StockLedger`] backed by atomics.
#[derive(Debug, Default)]
pub struct MemoryStockLedger {
    counters: RwLock<HashMap<ProductId, Arc<StockCounter>>>,
}

impl MemoryStockLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the available units for a product, registering it if unknown.
    pub async fn set_stock(&self, product_id: &ProductId, available: i64) {
        let mut counters = self.counters.write().await;
        let counter = counters.entry(product_id.clone()).or_default();
        counter.available.store(available.max(0), Ordering::SeqCst);
    }

    async fn counter(&self, product_id: &ProductId) -> Result<Arc<StockCounter>, CommerceError> {
        self.counters
            .read()
            .await
            .get(product_id)
            .cloned()
            .ok_or_else(|| CommerceError::ProductNotFound(product_id.to_string()))
    }
}

fn check_quantity(quantity: i64) -> Result<(), CommerceError> {
    if quantity <= 0 {
        return Err(CommerceError::InvalidQuantity(quantity));
    }
    Ok(())
}

#[async_trait]
impl StockLedger for MemoryStockLedger {
    async fn level(&self, product_id: &ProductId) -> Result<StockLevel, CommerceError> {
        Ok(self.counter(product_id).await?.level())
    }

    async fn reserve(&self, product_id: &ProductId, quantity: i64) -> Result<(), CommerceError> {
        check_quantity(quantity)?;
        let counter = self.counter(product_id).await?;
        counter
            .available
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current >= quantity).then(|| current - quantity)
            })
            .map_err(|available| CommerceError::InsufficientStock {
                product_id: product_id.to_string(),
                requested: quantity,
                available,
            })?;
        counter.sold.fetch_add(quantity, Ordering::SeqCst);
        tracing::debug!(product_id = %product_id, quantity, "Stock reserved");
        Ok(())
    }

    async fn release(&self, product_id: &ProductId, quantity: i64) -> Result<(), CommerceError> {
        check_quantity(quantity)?;
        let counter = self.counter(product_id).await?;
        counter.available.fetch_add(quantity, Ordering::SeqCst);
        // sold never goes below zero, even for releases of stock seeded later
        let _ = counter
            .sold
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |sold| {
                Some((sold - quantity).max(0))
            });
        tracing::debug!(product_id = %product_id, quantity, "Stock released");
        Ok(())
    }
}
