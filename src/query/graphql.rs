//! GraphQL query surface
//!
//! Three root fields, `brands`, `categories` and `products`. Each resolver
//! opens its own read-only connection on the blocking pool, so concurrent
//! requests never share a connection.
//!
//! `CategoryType.products` and `BrandType.product` go through a
//! `DataLoader`: all keys requested in one pass are fetched with a single
//! `IN (...)` statement.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use async_graphql::dataloader::{DataLoader, Loader};
use async_graphql::{ComplexObject, Context, EmptyMutation, EmptySubscription, Object, Schema};
use crate::catalog::{Brand, Category, ProductListing};
use crate::query::CatalogQuery;
use crate::storage::{DEFAULT_BUSY_TIMEOUT, SqliteStore};
use crate::{Error, Result};

pub type CatalogSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Message returned to clients for every backend failure
pub const STORAGE_UNAVAILABLE: &str = "storage unavailable";

/// Where and how to reach the catalog database from async code
#[derive(Debug, Clone)]
pub struct StoreHandle {
    database_path: PathBuf,
    busy_timeout: Duration,
}

impl StoreHandle {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Run a read against a fresh read-only connection on the blocking pool
    pub async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&CatalogQuery<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.database_path.clone();
        let busy_timeout = self.busy_timeout;
        tokio::task::spawn_blocking(move || {
            let store = SqliteStore::open_read_only(&path)?;
            store.set_busy_timeout(busy_timeout)?;
            f(&CatalogQuery::new(&store))
        })
        .await
        .map_err(|e| Error::Unavailable(e.to_string()))?
    }

    pub async fn list_brands(&self) -> Result<Vec<Brand>> {
        self.read(|query| query.list_brands()).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.read(|query| query.list_categories()).await
    }

    pub async fn list_products(&self) -> Result<Vec<ProductListing>> {
        self.read(|query| query.list_products()).await
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// All brands
    async fn brands(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Brand>> {
        let store = ctx.data::<StoreHandle>()?;
        store.list_brands().await.map_err(unavailable)
    }

    /// All categories
    async fn categories(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Category>> {
        let store = ctx.data::<StoreHandle>()?;
        store.list_categories().await.map_err(unavailable)
    }

    /// All products with their category and brand
    async fn products(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<ProductListing>> {
        let store = ctx.data::<StoreHandle>()?;
        store.list_products().await.map_err(unavailable)
    }
}

/// Products of a category, by category id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CategoryProducts(pub i64);

/// Product attached to a brand, by brand id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrandProduct(pub i64);

/// Batches reverse-relation lookups
pub struct RelationLoader {
    store: StoreHandle,
}

impl RelationLoader {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }
}

impl Loader<CategoryProducts> for RelationLoader {
    type Value = Vec<ProductListing>;
    type Error = Arc<Error>;

    async fn load(
        &self,
        keys: &[CategoryProducts],
    ) -> std::result::Result<HashMap<CategoryProducts, Self::Value>, Self::Error> {
        let ids: Vec<i64> = keys.iter().map(|key| key.0).collect();
        let grouped = self
            .store
            .read(move |query| query.products_by_category(&ids))
            .await
            .map_err(Arc::new)?;
        Ok(grouped
            .into_iter()
            .map(|(id, products)| (CategoryProducts(id), products))
            .collect())
    }
}

impl Loader<BrandProduct> for RelationLoader {
    type Value = ProductListing;
    type Error = Arc<Error>;

    async fn load(
        &self,
        keys: &[BrandProduct],
    ) -> std::result::Result<HashMap<BrandProduct, Self::Value>, Self::Error> {
        let ids: Vec<i64> = keys.iter().map(|key| key.0).collect();
        let attached = self
            .store
            .read(move |query| query.product_by_brand(&ids))
            .await
            .map_err(Arc::new)?;
        Ok(attached
            .into_iter()
            .map(|(id, product)| (BrandProduct(id), product))
            .collect())
    }
}

#[ComplexObject]
impl Category {
    /// Products in this category
    async fn products(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<ProductListing>> {
        let loader = ctx.data::<DataLoader<RelationLoader>>()?;
        let products = loader
            .load_one(CategoryProducts(self.id))
            .await
            .map_err(unavailable)?;
        Ok(products.unwrap_or_default())
    }
}

#[ComplexObject]
impl Brand {
    /// The product this brand is attached to, if any
    async fn product(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<ProductListing>> {
        let loader = ctx.data::<DataLoader<RelationLoader>>()?;
        loader.load_one(BrandProduct(self.id)).await.map_err(unavailable)
    }
}

fn unavailable(err: impl Display) -> async_graphql::Error {
    tracing::error!(error = %err, "catalog query failed");
    async_graphql::Error::new(STORAGE_UNAVAILABLE)
}

pub fn build_schema(store: StoreHandle) -> CatalogSchema {
    let loader = DataLoader::new(RelationLoader::new(store.clone()), tokio::spawn);
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(store)
        .data(loader)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewBrand, NewCategory, NewProduct};
    use rust_decimal::Decimal;

    fn seeded() -> (tempfile::TempDir, StoreHandle) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        let store = SqliteStore::open(&path).unwrap();
        let phones = store.create_category(&NewCategory::new("Phones")).unwrap();
        let samsung = store.create_brand(&NewBrand::new("Samsung")).unwrap();
        store
            .create_product(&NewProduct::new("Galaxy S21", Decimal::new(69900, 2), phones.id).with_brand(samsung.id))
            .unwrap();
        (dir, StoreHandle::new(path))
    }

    #[tokio::test]
    async fn test_products_query_resolves_relations() {
        let (_dir, store) = seeded();
        let schema = build_schema(store);

        let response = schema
            .execute("{ products { name basePrice category { name } brand { name } } }")
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);

        let data = response.data.into_json().unwrap();
        assert_eq!(
            data,
            serde_json::json!({
                "products": [{
                    "name": "Galaxy S21",
                    "basePrice": "699.00",
                    "category": { "name": "Phones" },
                    "brand": { "name": "Samsung" }
                }]
            })
        );
    }

    #[tokio::test]
    async fn test_reverse_relations() {
        let (_dir, handle) = seeded();
        let store = SqliteStore::open(handle.database_path()).unwrap();
        let phones = store.all_categories().unwrap()[0].id;
        store.create_category(&NewCategory::new("Shoes")).unwrap();
        store.create_brand(&NewBrand::new("Nike")).unwrap();
        store
            .create_product(&NewProduct::new("Galaxy A52", Decimal::new(34900, 2), phones))
            .unwrap();
        drop(store);

        let schema = build_schema(handle);
        let response = schema
            .execute("{ categories { name products { name } } brands { name product { name brand { name } } } }")
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);

        let data = response.data.into_json().unwrap();
        assert_eq!(
            data,
            serde_json::json!({
                "categories": [
                    { "name": "Phones", "products": [{ "name": "Galaxy S21" }, { "name": "Galaxy A52" }] },
                    { "name": "Shoes", "products": [] }
                ],
                "brands": [
                    { "name": "Samsung", "product": { "name": "Galaxy S21", "brand": { "name": "Samsung" } } },
                    { "name": "Nike", "product": null }
                ]
            })
        );

        let sdl = schema.sdl();
        assert!(sdl.contains("products: [ProductType!]!"));
        assert!(sdl.contains("product: ProductType"));
    }

    #[tokio::test]
    async fn test_internal_id_not_exposed() {
        let (_dir, store) = seeded();
        let schema = build_schema(store);

        let response = schema.execute("{ brands { id } }").await;
        assert!(!response.errors.is_empty());

        let sdl = schema.sdl();
        assert!(sdl.contains("type BrandType"));
        assert!(sdl.contains("type ProductType"));
        assert!(!sdl.contains("id: Int"));
    }

    #[tokio::test]
    async fn test_missing_database_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let schema = build_schema(StoreHandle::new(dir.path().join("nope.db")));

        let response = schema.execute("{ categories { name } }").await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, STORAGE_UNAVAILABLE);
    }
}
