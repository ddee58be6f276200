//! Product catalog module.
//!
//! The catalog itself is an external collaborator; this module holds the
//! read-only view the core consults and the stock ledger that owns the
//! per-product counters.

mod memory;
mod product;
mod stock;

pub use memory::MemoryCatalog;
pub use product::{Product, ProductStatus, ProductVariant, VariantSelector};
pub use stock::{MemoryStockLedger, StockLedger, StockLevel};

use async_trait::async_trait;

use crate::error::CommerceError;
use crate::ids::ProductId;

/// Read access to the product catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Look up a product. Returns `None` if it doesn't exist.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CommerceError>;
}
