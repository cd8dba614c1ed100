//! Catalog entities
//!
//! Nine record types make up the catalog:
//! - `Brand`, `Category`: standalone, named
//! - `Product`: belongs to one `Category`, optionally attached to one `Brand`
//! - `ProductGallery`, `ProductSpecification`, `ProductVariant`: owned by a product
//! - `AttributeType` / `AttributeOption`: e.g. Color / Red
//! - `VariantAttribute`: links a variant to an attribute option
//!
//! Every record has an internal numeric `id` (never exposed on the query
//! surface) and a generated `uuid` that is the public identifier.

pub mod attribute;
pub mod brand;
pub mod category;
pub mod media;
pub mod price;
pub mod product;
pub mod variant;

pub use attribute::{AttributeOption, AttributeType};
pub use brand::{Brand, NewBrand};
pub use category::{Category, NewCategory};
pub use product::{NewProduct, Product, ProductGallery, ProductListing, ProductSpecification};
pub use variant::{NewVariant, ProductVariant, VariantAttribute};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// The kinds of record stored in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Brand,
    Category,
    Product,
    Gallery,
    Specification,
    AttributeType,
    AttributeOption,
    Variant,
    VariantAttribute,
}

impl EntityKind {
    /// Get the string representation of the entity kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Brand => "brand",
            EntityKind::Category => "category",
            EntityKind::Product => "product",
            EntityKind::Gallery => "gallery",
            EntityKind::Specification => "specification",
            EntityKind::AttributeType => "attribute_type",
            EntityKind::AttributeOption => "attribute_option",
            EntityKind::Variant => "variant",
            EntityKind::VariantAttribute => "variant_attribute",
        }
    }

    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Brand => "brands",
            EntityKind::Category => "categories",
            EntityKind::Product => "products",
            EntityKind::Gallery => "product_gallery",
            EntityKind::Specification => "product_specifications",
            EntityKind::AttributeType => "product_attribute_types",
            EntityKind::AttributeOption => "product_attribute_options",
            EntityKind::Variant => "product_variants",
            EntityKind::VariantAttribute => "product_variant_attributes",
        }
    }

    /// All entity kinds, parents before children
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Brand,
            EntityKind::Category,
            EntityKind::Product,
            EntityKind::Gallery,
            EntityKind::Specification,
            EntityKind::AttributeType,
            EntityKind::AttributeOption,
            EntityKind::Variant,
            EntityKind::VariantAttribute,
        ]
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "brand" | "brands" => Ok(EntityKind::Brand),
            "category" | "categories" => Ok(EntityKind::Category),
            "product" | "products" => Ok(EntityKind::Product),
            "gallery" | "media" => Ok(EntityKind::Gallery),
            "specification" | "spec" | "specs" => Ok(EntityKind::Specification),
            "attribute_type" | "attribute" => Ok(EntityKind::AttributeType),
            "attribute_option" | "option" => Ok(EntityKind::AttributeOption),
            "variant" | "variants" => Ok(EntityKind::Variant),
            "variant_attribute" => Ok(EntityKind::VariantAttribute),
            _ => Err(Error::UnknownEntity(s.to_string())),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a public identifier
pub fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).map_err(|e| Error::InvalidUuid(format!("{s}: {e}")))
}
