use tabled::{settings::Style, Table, Tabled};
use crate::catalog::{Brand, Category, ProductListing, ProductVariant};
use crate::storage::DbStats;

#[derive(Tabled)]
pub struct NamedRow {
    #[tabled(rename = "UUID")]
    pub uuid: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Updated")]
    pub updated: String,
}

impl From<&Brand> for NamedRow {
    fn from(brand: &Brand) -> Self {
        Self {
            uuid: brand.uuid.to_string(),
            name: brand.name.clone(),
            description: brand.description.clone(),
            updated: brand.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

impl From<&Category> for NamedRow {
    fn from(category: &Category) -> Self {
        Self {
            uuid: category.uuid.to_string(),
            name: category.name.clone(),
            description: category.description.clone(),
            updated: category.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct ProductRow {
    #[tabled(rename = "UUID")]
    pub uuid: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Price")]
    pub price: String,
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Brand")]
    pub brand: String,
}

impl From<&ProductListing> for ProductRow {
    fn from(product: &ProductListing) -> Self {
        Self {
            uuid: product.uuid.to_string(),
            name: product.name.clone(),
            price: product.base_price.to_string(),
            category: product.category.name.clone(),
            brand: product.brand.as_ref().map(|b| b.name.clone()).unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Tabled)]
pub struct VariantRow {
    #[tabled(rename = "SKU")]
    pub sku: String,
    #[tabled(rename = "Price")]
    pub price: String,
    #[tabled(rename = "Stock")]
    pub stock: u32,
    #[tabled(rename = "Attributes")]
    pub attributes: String,
}

impl VariantRow {
    pub fn new(variant: &ProductVariant, attributes: &[String]) -> Self {
        Self {
            sku: variant.sku.clone(),
            price: variant.price.to_string(),
            stock: variant.stock,
            attributes: attributes.join(", "),
        }
    }
}

#[derive(Tabled)]
pub struct CountRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

/// Render rows with the shared table style; empty input renders nothing
pub fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &DbStats) -> String {
    let rows: Vec<CountRow> = stats
        .counts
        .iter()
        .map(|(kind, n)| CountRow { table: kind.table().to_string(), rows: *n })
        .collect();
    render(&rows)
}
