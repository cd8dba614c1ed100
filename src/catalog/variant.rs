//! Product variants (e.g. "Red Shirt", "128 GB") and their attribute links.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductVariant {
    #[serde(skip)]
    pub id: i64,
    pub uuid: Uuid,
    #[serde(skip)]
    pub product_id: i64,
    pub sku: String,
    pub price: Decimal,
    pub stock: u32,
}

/// Field values for inserting or overwriting a variant
#[derive(Debug, Clone, Deserialize)]
pub struct NewVariant {
    pub product_id: i64,
    pub sku: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
}

impl NewVariant {
    pub fn new(product_id: i64, sku: impl Into<String>, price: Decimal) -> Self {
        Self {
            product_id,
            sku: sku.into(),
            price,
            stock: 0,
        }
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }
}

impl From<&ProductVariant> for NewVariant {
    fn from(variant: &ProductVariant) -> Self {
        Self {
            product_id: variant.product_id,
            sku: variant.sku.clone(),
            price: variant.price,
            stock: variant.stock,
        }
    }
}

/// Connects a variant with one attribute option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantAttribute {
    #[serde(skip)]
    pub id: i64,
    pub uuid: Uuid,
    #[serde(skip)]
    pub variant_id: i64,
    #[serde(skip)]
    pub attribute_option_id: i64,
}
