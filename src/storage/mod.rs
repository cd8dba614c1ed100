//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - brands(uuid, name, description, created_at, updated_at)
//! - categories(uuid, name, description, created_at, updated_at)
//! - products(uuid, name, base_price, description, thumbnail, brand_id, category_id, ...)
//! - product_gallery(uuid, product_id, media, uploaded_at)
//! - product_specifications(uuid, product_id, name, value)
//! - product_attribute_types(uuid, name)
//! - product_attribute_options(uuid, attribute_type_id, name)
//! - product_variants(uuid, product_id, sku, price, stock)
//! - product_variant_attributes(uuid, variant_id, attribute_option_id)

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, SqliteStore, DEFAULT_BUSY_TIMEOUT};
