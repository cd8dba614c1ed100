//! Database schema definitions
//!
//! Prices are INTEGER minor units. Timestamps are ISO 8601 text. Every child
//! table references its parent with `ON DELETE CASCADE`, which only takes
//! effect while `PRAGMA foreign_keys` is on.

/// SQL to create the brands table
pub const CREATE_BRANDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS brands (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 100),
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create the categories table
pub const CREATE_CATEGORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 100),
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create the products table
/// A brand is attached to at most one product (UNIQUE brand_id)
pub const CREATE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 100),
    base_price INTEGER NOT NULL CHECK (base_price >= 0 AND base_price < 10000000000),
    description TEXT NOT NULL DEFAULT '',
    thumbnail TEXT NOT NULL DEFAULT '',
    brand_id INTEGER UNIQUE REFERENCES brands(id) ON DELETE CASCADE,
    category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

pub const CREATE_GALLERY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS product_gallery (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    media TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
)
"#;

pub const CREATE_SPECIFICATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS product_specifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK (length(name) <= 100),
    value TEXT NOT NULL CHECK (length(value) <= 100)
)
"#;

pub const CREATE_ATTRIBUTE_TYPES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS product_attribute_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL CHECK (length(name) <= 100)
)
"#;

pub const CREATE_ATTRIBUTE_OPTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS product_attribute_options (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    attribute_type_id INTEGER NOT NULL REFERENCES product_attribute_types(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK (length(name) <= 100)
)
"#;

pub const CREATE_VARIANTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS product_variants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    sku TEXT NOT NULL CHECK (length(sku) <= 100),
    price INTEGER NOT NULL CHECK (abs(price) < 10000000000),
    stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0)
)
"#;

pub const CREATE_VARIANT_ATTRIBUTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS product_variant_attributes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    variant_id INTEGER NOT NULL REFERENCES product_variants(id) ON DELETE CASCADE,
    attribute_option_id INTEGER NOT NULL REFERENCES product_attribute_options(id) ON DELETE CASCADE
)
"#;

/// Indexes on every foreign key column, so cascades and child listings
/// do not scan
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id)",
    "CREATE INDEX IF NOT EXISTS idx_gallery_product ON product_gallery(product_id)",
    "CREATE INDEX IF NOT EXISTS idx_specifications_product ON product_specifications(product_id)",
    "CREATE INDEX IF NOT EXISTS idx_options_type ON product_attribute_options(attribute_type_id)",
    "CREATE INDEX IF NOT EXISTS idx_variants_product ON product_variants(product_id)",
    "CREATE INDEX IF NOT EXISTS idx_variant_attributes_variant ON product_variant_attributes(variant_id)",
    "CREATE INDEX IF NOT EXISTS idx_variant_attributes_option ON product_variant_attributes(attribute_option_id)",
];

/// All schema creation statements, parents before children
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_BRANDS_TABLE,
        CREATE_CATEGORIES_TABLE,
        CREATE_PRODUCTS_TABLE,
        CREATE_GALLERY_TABLE,
        CREATE_SPECIFICATIONS_TABLE,
        CREATE_ATTRIBUTE_TYPES_TABLE,
        CREATE_ATTRIBUTE_OPTIONS_TABLE,
        CREATE_VARIANTS_TABLE,
        CREATE_VARIANT_ATTRIBUTES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
