//! Mercato configuration file (`mercato.toml`).

use std::path::Path;

use anyhow::{Context, Result};
use mercato_commerce::cart::{Coupon, PricingPolicy};
use mercato_commerce::catalog::{Product, ProductStatus, ProductVariant};
use mercato_commerce::retry::RetryPolicy;
use mercato_commerce::{MarketplaceConfig, Money, ProductId, UserId};
use mercato_observability::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Names searched for, in order, when no `--config` is given.
pub const CONFIG_NAMES: [&str; 2] = ["mercato.toml", ".mercato.toml"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MercatoConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pricing: PricingPolicy,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Products and coupons loaded at startup.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl MercatoConfig {
    /// Load config from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    pub fn marketplace(&self) -> MarketplaceConfig {
        MarketplaceConfig {
            pricing: self.pricing,
            retry: self.retry,
        }
    }

    /// Catalog seeds as domain values, priced in the configured currency.
    pub fn seeds(&self) -> (Vec<Product>, Vec<Coupon>) {
        let currency = self.pricing.currency;
        let products = self
            .catalog
            .products
            .iter()
            .map(|seed| seed.to_product(currency))
            .collect();
        (products, self.catalog.coupons.clone())
    }

    /// Problems that would make the marketplace misbehave.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!("server.bind '{}' is not a socket address", self.server.bind));
        }
        if !(0..=10_000).contains(&self.pricing.tax_rate_bps) {
            errors.push("pricing.tax_rate_bps must be 0-10000".to_string());
        }
        if self.pricing.flat_shipping_cents < 0 || self.pricing.free_shipping_threshold_cents < 0 {
            errors.push("pricing amounts must not be negative".to_string());
        }

        let mut ids = std::collections::HashSet::new();
        for (i, product) in self.catalog.products.iter().enumerate() {
            if product.id.trim().is_empty() {
                errors.push(format!("catalog.products[{i}].id is required"));
            } else if !ids.insert(product.id.as_str()) {
                errors.push(format!("catalog.products[{i}].id '{}' is duplicated", product.id));
            }
            if product.price_cents < 0 || product.stock < 0 {
                errors.push(format!("catalog.products[{i}] has a negative price or stock"));
            }
        }
        for (i, coupon) in self.catalog.coupons.iter().enumerate() {
            if coupon.code.trim().is_empty() {
                errors.push(format!("catalog.coupons[{i}].code is required"));
            }
            if coupon.value < 0 {
                errors.push(format!("catalog.coupons[{i}].value must not be negative"));
            }
        }
        errors
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Catalog seed data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub products: Vec<ProductSeed>,
    #[serde(default)]
    pub coupons: Vec<Coupon>,
}

/// A product as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSeed {
    pub id: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub name: String,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
    pub seller_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<ProductVariant>,
}

impl ProductSeed {
    fn to_product(&self, currency: mercato_commerce::Currency) -> Product {
        let sku = self.sku.clone().unwrap_or_else(|| self.id.to_uppercase());
        let mut product = Product::new(
            ProductId::new(self.id.as_str()),
            sku,
            self.name.as_str(),
            Money::new(self.price_cents, currency),
            UserId::new(self.seller_id.as_str()),
        );
        product.stock = self.stock;
        product.image = self.image.clone();
        product.variants = self.variants.clone();
        product.status = ProductStatus::Active;
        product
    }
}

/// Contents written by `mercato config init`.
pub fn generate_default_config() -> String {
    r#"# Mercato marketplace configuration

[server]
bind = "127.0.0.1:8080"

[logging]
level = "info"
format = "human"
# filter = "mercato_commerce=debug"

[pricing]
currency = "USD"
tax_rate_bps = 850
free_shipping_threshold_cents = 5000
flat_shipping_cents = 999

[retry]
max_retries = 3
base_delay_ms = 100

[[catalog.products]]
id = "mug"
name = "Stoneware Mug"
price_cents = 3000
stock = 25
seller_id = "seller-1"

[[catalog.products]]
id = "tee"
name = "Organic Tee"
price_cents = 2500
stock = 40
seller_id = "seller-2"

[[catalog.products.variants]]
size = "L"
price = { amount_cents = 2700, currency = "USD" }

[[catalog.coupons]]
code = "SAVE10"
type = "percentage"
value = 10
description = "10% off"

[[catalog.coupons]]
code = "FIVEOFF"
type = "fixed"
value = 500
min_subtotal_cents = 2000
"#
    .to_string()
}
