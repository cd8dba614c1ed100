//! Catalog query service
//!
//! The three read operations exposed on the query surface:
//! - `list_brands`: every brand, insertion order
//! - `list_categories`: every category, insertion order
//! - `list_products`: every product with category and brand joined eagerly
//!
//! plus the batched reverse lookups behind `CategoryType.products` and
//! `BrandType.product`.

use std::collections::HashMap;
use crate::Result;
use crate::catalog::{Brand, Category, ProductListing};
use crate::storage::SqliteStore;

/// Read-only queries over a catalog store
pub struct CatalogQuery<'a> {
    store: &'a SqliteStore,
}

impl<'a> CatalogQuery<'a> {
    /// Create a new query service
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    pub fn list_brands(&self) -> Result<Vec<Brand>> {
        let brands = self.store.all_brands()?;
        tracing::debug!(count = brands.len(), "listed brands");
        Ok(brands)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = self.store.all_categories()?;
        tracing::debug!(count = categories.len(), "listed categories");
        Ok(categories)
    }

    /// Products with their category and optional brand.
    ///
    /// One joined statement; no per-row lookups.
    pub fn list_products(&self) -> Result<Vec<ProductListing>> {
        let products = self.store.product_listings()?;
        tracing::debug!(count = products.len(), "listed products");
        Ok(products)
    }

    /// Products of each requested category, keyed by category id.
    ///
    /// Categories without products are absent from the map.
    pub fn products_by_category(&self, category_ids: &[i64]) -> Result<HashMap<i64, Vec<ProductListing>>> {
        let mut grouped: HashMap<i64, Vec<ProductListing>> = HashMap::new();
        for listing in self.store.listings_in_categories(category_ids)? {
            grouped.entry(listing.category.id).or_default().push(listing);
        }
        tracing::debug!(categories = category_ids.len(), "loaded products by category");
        Ok(grouped)
    }

    /// The product attached to each requested brand, keyed by brand id
    pub fn product_by_brand(&self, brand_ids: &[i64]) -> Result<HashMap<i64, ProductListing>> {
        let mut attached = HashMap::new();
        for listing in self.store.listings_for_brands(brand_ids)? {
            if let Some(brand_id) = listing.brand.as_ref().map(|b| b.id) {
                attached.insert(brand_id, listing);
            }
        }
        Ok(attached)
    }
}
