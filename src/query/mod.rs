pub mod engine;
pub mod graphql;

pub use engine::CatalogQuery;
pub use graphql::{CatalogSchema, QueryRoot, StoreHandle, build_schema};
