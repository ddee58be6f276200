//! In-memory catalog.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Catalog, MemoryStockLedger, Product, StockLedger};
use crate::error::CommerceError;
use crate::ids::{ProductId, UserId};

/// Catalog held in memory, with stock figures read live from a
/// [`MemoryStockLedger`].
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
    ledger: Arc<MemoryStockLedger>,
}

impl MemoryCatalog {
    /// Create an empty catalog with its own ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// The ledger holding this catalog's stock counters.
    pub fn ledger(&self) -> Arc<MemoryStockLedger> {
        Arc::clone(&self.ledger)
    }

    /// Add or replace a product. Its `stock` field seeds the ledger.
    pub async fn upsert(&self, product: Product) {
        self.ledger.set_stock(&product.id, product.stock).await;
        self.products.write().await.insert(product.id.clone(), product);
    }

    /// Reassign a product to another seller.
    pub async fn reassign_seller(
        &self,
        product_id: &ProductId,
        seller_id: UserId,
    ) -> Result<(), CommerceError> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| CommerceError::ProductNotFound(product_id.to_string()))?;
        product.seller_id = seller_id;
        Ok(())
    }

    /// Number of products.
    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    /// Check if the catalog is empty.
    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CommerceError> {
        let Some(mut product) = self.products.read().await.get(id).cloned() else {
            return Ok(None);
        };
        let level = self.ledger.level(id).await?;
        product.stock = level.available;
        product.sales_count = level.sold;
        Ok(Some(product))
    }
}
