//! Products and the records a product owns (gallery media, specifications).

use crate::catalog::{Brand, Category};
use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product, e.g. Samsung Galaxy S21.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    #[serde(skip)]
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub base_price: Decimal,
    pub description: String,
    /// Relative media path, empty when unset
    pub thumbnail: String,
    #[serde(skip)]
    pub brand_id: Option<i64>,
    #[serde(skip)]
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Field values for inserting or overwriting a product
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    pub brand_id: Option<i64>,
    pub category_id: i64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, base_price: Decimal, category_id: i64) -> Self {
        Self {
            name: name.into(),
            base_price,
            description: String::new(),
            thumbnail: String::new(),
            brand_id: None,
            category_id,
        }
    }

    pub fn with_brand(mut self, brand_id: i64) -> Self {
        self.brand_id = Some(brand_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = thumbnail.into();
        self
    }
}

impl From<&Product> for NewProduct {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            base_price: product.base_price,
            description: product.description.clone(),
            thumbnail: product.thumbnail.clone(),
            brand_id: product.brand_id,
            category_id: product.category_id,
        }
    }
}

/// A product together with its category and brand, as returned by the
/// `products` query.
#[derive(Debug, Clone, PartialEq, Serialize, SimpleObject)]
#[graphql(name = "ProductType")]
pub struct ProductListing {
    #[serde(skip)]
    #[graphql(skip)]
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub base_price: Decimal,
    pub description: String,
    pub thumbnail: String,
    pub brand: Option<Brand>,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductListing {
    pub fn new(product: Product, category: Category, brand: Option<Brand>) -> Self {
        Self {
            id: product.id,
            uuid: product.uuid,
            name: product.name,
            base_price: product.base_price,
            description: product.description,
            thumbnail: product.thumbnail,
            brand,
            category,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// An image or video attached to a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductGallery {
    #[serde(skip)]
    pub id: i64,
    pub uuid: Uuid,
    #[serde(skip)]
    pub product_id: i64,
    pub media: String,
    /// Bumped on every save
    pub uploaded_at: DateTime<Utc>,
}

/// A named specification of a product, e.g. "Screen: 6.2 inch".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSpecification {
    #[serde(skip)]
    pub id: i64,
    pub uuid: Uuid,
    #[serde(skip)]
    pub product_id: i64,
    pub name: String,
    pub value: String,
}

impl std::fmt::Display for ProductSpecification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}
