//! Product and variant types.

use crate::ids::{ProductId, UserId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Product status in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Product is in draft mode, not visible to customers.
    Draft,
    /// Product is active and purchasable.
    #[default]
    Active,
    /// Product is archived, not purchasable but data preserved.
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }
}

/// Variant selector (e.g., Color: Red, Size: M).
///
/// Two selectors denote the same variant when every dimension matches,
/// compared case-insensitively after trimming.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq)]
pub struct VariantSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl VariantSelector {
    /// Check if no dimension is set.
    pub fn is_empty(&self) -> bool {
        [&self.color, &self.material, &self.size]
            .iter()
            .all(|d| d.as_deref().map(str::trim).unwrap_or("").is_empty())
    }

    /// `None` for empty selectors so "no variant" has a single representation.
    pub fn normalize(selector: Option<VariantSelector>) -> Option<VariantSelector> {
        selector.filter(|s| !s.is_empty())
    }

    /// Human-readable label (e.g., "Red / M").
    pub fn label(&self) -> String {
        [&self.color, &self.material, &self.size]
            .iter()
            .filter_map(|d| d.as_deref())
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

fn dimension_eq(a: &Option<String>, b: &Option<String>) -> bool {
    let a = a.as_deref().map(str::trim).unwrap_or("");
    let b = b.as_deref().map(str::trim).unwrap_or("");
    a.eq_ignore_ascii_case(b)
}

impl PartialEq for VariantSelector {
    fn eq(&self, other: &Self) -> bool {
        dimension_eq(&self.color, &other.color)
            && dimension_eq(&self.material, &other.material)
            && dimension_eq(&self.size, &other.size)
    }
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductVariant {
    /// Dimensions identifying this variant.
    #[serde(flatten)]
    pub selector: VariantSelector,
    /// Variant SKU, if different from the product's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Variant-specific price; falls back to the product price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
}

/// A product as seen by the core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Stock keeping unit.
    pub sku: String,
    /// Product name.
    pub name: String,
    /// Primary image URL.
    pub image: Option<String>,
    /// Base price.
    pub price: Money,
    /// Units available, as last read from the stock ledger.
    pub stock: i64,
    /// Units sold.
    pub sales_count: i64,
    /// Seller currently listing the product.
    pub seller_id: UserId,
    /// Visibility status.
    pub status: ProductStatus,
    /// Purchasable variants.
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Create a new active product with no variants.
    pub fn new(
        id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        seller_id: UserId,
    ) -> Self {
        Self {
            id,
            sku: sku.into(),
            name: name.into(),
            image: None,
            price,
            stock: 0,
            sales_count: 0,
            seller_id,
            status: ProductStatus::Active,
            variants: Vec::new(),
        }
    }

    /// Check if the product can be bought.
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Find the variant matching a selector.
    pub fn find_variant(&self, selector: &VariantSelector) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.selector == selector)
    }

    /// Unit price for a selector: the matching variant's price, else the base price.
    pub fn price_for(&self, selector: Option<&VariantSelector>) -> Money {
        selector
            .and_then(|s| self.find_variant(s))
            .and_then(|v| v.price)
            .unwrap_or(self.price)
    }

    /// SKU for a selector: the matching variant's SKU, else the product SKU.
    pub fn sku_for(&self, selector: Option<&VariantSelector>) -> String {
        selector
            .and_then(|s| self.find_variant(s))
            .and_then(|v| v.sku.clone())
            .unwrap_or_else(|| self.sku.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn shirt() -> Product {
        let mut product = Product::new(
            ProductId::new("shirt"),
            "SHIRT-001",
            "Shirt",
            Money::new(3000, Currency::USD),
            UserId::new("seller-1"),
        );
        product.variants.push(ProductVariant {
            selector: VariantSelector {
                color: Some("Red".into()),
                material: None,
                size: Some("L".into()),
            },
            sku: Some("SHIRT-001-RED-L".into()),
            price: Some(Money::new(3500, Currency::USD)),
        });
        product
    }

    #[test]
    fn test_variant_price_used_when_selector_matches() {
        let product = shirt();
        let selector = VariantSelector {
            color: Some("red".into()),
            material: None,
            size: Some(" L ".into()),
        };
        assert_eq!(product.price_for(Some(&selector)).amount_cents, 3500);
        assert_eq!(product.sku_for(Some(&selector)), "SHIRT-001-RED-L");
    }

    #[test]
    fn test_base_price_when_no_variant_matches() {
        let product = shirt();
        let selector = VariantSelector {
            color: Some("Blue".into()),
            material: None,
            size: None,
        };
        assert_eq!(product.price_for(Some(&selector)).amount_cents, 3000);
        assert_eq!(product.price_for(None).amount_cents, 3000);
        assert_eq!(product.sku_for(None), "SHIRT-001");
    }

    #[test]
    fn test_selector_normalize_and_label() {
        assert!(VariantSelector::normalize(Some(VariantSelector::default())).is_none());
        let selector = VariantSelector {
            color: Some("Red".into()),
            material: Some("".into()),
            size: Some("M".into()),
        };
        assert_eq!(selector.label(), "Red / M");
    }

    #[test]
    fn test_inactive_product() {
        let mut product = shirt();
        assert!(product.is_active());
        product.status = ProductStatus::Archived;
        assert!(!product.is_active());
    }
}
