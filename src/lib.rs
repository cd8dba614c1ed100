//! # Catalog - product catalog store and query service
//!
//! Catalog provides:
//! - Entity types for brands, categories, products, galleries, specifications,
//!   attribute types/options, variants and variant attributes
//! - SQLite-backed storage with foreign keys and cascading deletes
//! - A read-only query service (`brands`, `categories`, `products`)
//! - A GraphQL surface and HTTP server over that query service

pub mod catalog;
pub mod storage;
pub mod query;
pub mod server;
pub mod output;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use catalog::{
    AttributeOption, AttributeType, Brand, Category, EntityKind, Product, ProductGallery,
    ProductListing, ProductSpecification, ProductVariant, VariantAttribute,
};
pub use query::CatalogQuery;
pub use storage::SqliteStore;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for catalog operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    #[error("Unknown entity kind: {0}")]
    UnknownEntity(String),

    #[error("{0} not found: {1}")]
    NotFound(EntityKind, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::Constraint(message.clone().unwrap_or_else(|| code.to_string()))
            }
            _ => Error::Storage(err),
        }
    }
}
