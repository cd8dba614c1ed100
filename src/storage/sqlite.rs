//! SQLite storage implementation

use std::path::Path;
use std::time::Duration;
use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use uuid::Uuid;
use crate::Result;
use crate::catalog::price;
use crate::catalog::{
    AttributeOption, AttributeType, Brand, Category, EntityKind, NewBrand, NewCategory,
    NewProduct, NewVariant, Product, ProductGallery, ProductListing, ProductSpecification,
    ProductVariant, VariantAttribute,
};
use super::schema;

/// How long a connection waits on a locked database before failing
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const BRAND_COLUMNS: &str = "id, uuid, name, description, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, uuid, name, description, created_at, updated_at";
const PRODUCT_COLUMNS: &str =
    "id, uuid, name, base_price, description, thumbnail, brand_id, category_id, created_at, updated_at";
const GALLERY_COLUMNS: &str = "id, uuid, product_id, media, uploaded_at";
const SPECIFICATION_COLUMNS: &str = "id, uuid, product_id, name, value";
const ATTRIBUTE_TYPE_COLUMNS: &str = "id, uuid, name";
const ATTRIBUTE_OPTION_COLUMNS: &str = "id, uuid, attribute_type_id, name";
const VARIANT_COLUMNS: &str = "id, uuid, product_id, sku, price, stock";
const VARIANT_ATTRIBUTE_COLUMNS: &str = "id, uuid, variant_id, attribute_option_id";

/// Products joined to their category and optional brand in one statement.
const PRODUCT_LISTING_SELECT: &str = r#"
SELECT p.id, p.uuid, p.name, p.base_price, p.description, p.thumbnail, p.brand_id, p.category_id, p.created_at, p.updated_at,
       c.id, c.uuid, c.name, c.description, c.created_at, c.updated_at,
       b.id, b.uuid, b.name, b.description, b.created_at, b.updated_at
FROM products p
JOIN categories c ON c.id = p.category_id
LEFT JOIN brands b ON b.id = p.brand_id
"#;

type RowMapper<T> = fn(&Row<'_>) -> rusqlite::Result<T>;

/// SQLite-backed storage for the catalog
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self::configure(conn)?;
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self::configure(conn)?;
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an existing database without write access.
    ///
    /// Fails if the file does not exist; the schema is not created.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }

    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn query_one<T>(&self, sql: &str, id: i64, map: RowMapper<T>) -> Result<Option<T>> {
        self.conn.query_row(sql, [id], map).optional().map_err(Into::into)
    }

    fn query_all<T>(&self, sql: &str, params: impl rusqlite::Params, map: RowMapper<T>) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ========== Brand Operations ==========

    pub fn create_brand(&self, brand: &NewBrand) -> Result<Brand> {
        let uuid = Uuid::new_v4();
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO brands (uuid, name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![uuid.to_string(), brand.name, brand.description, now],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, %uuid, name = %brand.name, "created brand");

        Ok(Brand {
            id,
            uuid,
            name: brand.name.clone(),
            description: brand.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_brand(&self, id: i64) -> Result<Option<Brand>> {
        let sql = format!("SELECT {BRAND_COLUMNS} FROM brands WHERE id = ?1");
        self.query_one(&sql, id, brand_from_row)
    }

    /// Overwrite a brand's fields and bump `updated_at`
    pub fn update_brand(&self, id: i64, brand: &NewBrand) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE brands SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![brand.name, brand.description, Utc::now(), id],
        )?;
        Ok(changed > 0)
    }

    /// All brands in insertion order
    pub fn all_brands(&self) -> Result<Vec<Brand>> {
        let sql = format!("SELECT {BRAND_COLUMNS} FROM brands ORDER BY id");
        self.query_all(&sql, [], brand_from_row)
    }

    // ========== Category Operations ==========

    pub fn create_category(&self, category: &NewCategory) -> Result<Category> {
        let uuid = Uuid::new_v4();
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO categories (uuid, name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![uuid.to_string(), category.name, category.description, now],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, %uuid, name = %category.name, "created category");

        Ok(Category {
            id,
            uuid,
            name: category.name.clone(),
            description: category.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1");
        self.query_one(&sql, id, category_from_row)
    }

    pub fn update_category(&self, id: i64, category: &NewCategory) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE categories SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![category.name, category.description, Utc::now(), id],
        )?;
        Ok(changed > 0)
    }

    /// All categories in insertion order
    pub fn all_categories(&self) -> Result<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id");
        self.query_all(&sql, [], category_from_row)
    }

    // ========== Product Operations ==========

    pub fn create_product(&self, product: &NewProduct) -> Result<Product> {
        price::ensure_non_negative(product.base_price)?;
        let base_price = price::to_minor_units(product.base_price)?;
        let uuid = Uuid::new_v4();
        let now = Utc::now();
        self.conn.execute(
            r#"
            INSERT INTO products (uuid, name, base_price, description, thumbnail, brand_id, category_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
            params![
                uuid.to_string(),
                product.name,
                base_price,
                product.description,
                product.thumbnail,
                product.brand_id,
                product.category_id,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, %uuid, name = %product.name, "created product");

        Ok(Product {
            id,
            uuid,
            name: product.name.clone(),
            base_price: price::from_minor_units(base_price),
            description: product.description.clone(),
            thumbnail: product.thumbnail.clone(),
            brand_id: product.brand_id,
            category_id: product.category_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        self.query_one(&sql, id, product_from_row)
    }

    pub fn update_product(&self, id: i64, product: &NewProduct) -> Result<bool> {
        price::ensure_non_negative(product.base_price)?;
        let base_price = price::to_minor_units(product.base_price)?;
        let changed = self.conn.execute(
            r#"
            UPDATE products
            SET name = ?1, base_price = ?2, description = ?3, thumbnail = ?4,
                brand_id = ?5, category_id = ?6, updated_at = ?7
            WHERE id = ?8
            "#,
            params![
                product.name,
                base_price,
                product.description,
                product.thumbnail,
                product.brand_id,
                product.category_id,
                Utc::now(),
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    /// All products with their category and brand, in insertion order
    pub fn product_listings(&self) -> Result<Vec<ProductListing>> {
        let sql = format!("{PRODUCT_LISTING_SELECT} ORDER BY p.id");
        self.query_all(&sql, [], listing_from_row)
    }

    /// Listings for products in any of the given categories
    pub fn listings_in_categories(&self, category_ids: &[i64]) -> Result<Vec<ProductListing>> {
        self.listings_where("p.category_id", category_ids)
    }

    /// Listings for products attached to any of the given brands
    pub fn listings_for_brands(&self, brand_ids: &[i64]) -> Result<Vec<ProductListing>> {
        self.listings_where("p.brand_id", brand_ids)
    }

    fn listings_where(&self, column: &str, ids: &[i64]) -> Result<Vec<ProductListing>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("{PRODUCT_LISTING_SELECT} WHERE {column} IN ({placeholders}) ORDER BY p.id");
        self.query_all(&sql, rusqlite::params_from_iter(ids), listing_from_row)
    }

    // ========== Gallery Operations ==========

    pub fn create_gallery(&self, product_id: i64, media: &str) -> Result<ProductGallery> {
        let uuid = Uuid::new_v4();
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO product_gallery (uuid, product_id, media, uploaded_at) VALUES (?1, ?2, ?3, ?4)",
            params![uuid.to_string(), product_id, media, now],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, product_id, media, "added gallery media");

        Ok(ProductGallery {
            id,
            uuid,
            product_id,
            media: media.to_string(),
            uploaded_at: now,
        })
    }

    pub fn get_gallery(&self, id: i64) -> Result<Option<ProductGallery>> {
        let sql = format!("SELECT {GALLERY_COLUMNS} FROM product_gallery WHERE id = ?1");
        self.query_one(&sql, id, gallery_from_row)
    }

    /// Replace the media reference; `uploaded_at` moves with every save
    pub fn update_gallery(&self, id: i64, media: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE product_gallery SET media = ?1, uploaded_at = ?2 WHERE id = ?3",
            params![media, Utc::now(), id],
        )?;
        Ok(changed > 0)
    }

    pub fn gallery_for(&self, product_id: i64) -> Result<Vec<ProductGallery>> {
        let sql = format!("SELECT {GALLERY_COLUMNS} FROM product_gallery WHERE product_id = ?1 ORDER BY id");
        self.query_all(&sql, [product_id], gallery_from_row)
    }

    // ========== Specification Operations ==========

    pub fn create_specification(&self, product_id: i64, name: &str, value: &str) -> Result<ProductSpecification> {
        let uuid = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO product_specifications (uuid, product_id, name, value) VALUES (?1, ?2, ?3, ?4)",
            params![uuid.to_string(), product_id, name, value],
        )?;
        let id = self.conn.last_insert_rowid();

        Ok(ProductSpecification {
            id,
            uuid,
            product_id,
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn get_specification(&self, id: i64) -> Result<Option<ProductSpecification>> {
        let sql = format!("SELECT {SPECIFICATION_COLUMNS} FROM product_specifications WHERE id = ?1");
        self.query_one(&sql, id, specification_from_row)
    }

    pub fn update_specification(&self, id: i64, name: &str, value: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE product_specifications SET name = ?1, value = ?2 WHERE id = ?3",
            params![name, value, id],
        )?;
        Ok(changed > 0)
    }

    pub fn specifications_for(&self, product_id: i64) -> Result<Vec<ProductSpecification>> {
        let sql = format!(
            "SELECT {SPECIFICATION_COLUMNS} FROM product_specifications WHERE product_id = ?1 ORDER BY id"
        );
        self.query_all(&sql, [product_id], specification_from_row)
    }

    // ========== Attribute Operations ==========

    pub fn create_attribute_type(&self, name: &str) -> Result<AttributeType> {
        let uuid = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO product_attribute_types (uuid, name) VALUES (?1, ?2)",
            params![uuid.to_string(), name],
        )?;
        let id = self.conn.last_insert_rowid();

        Ok(AttributeType {
            id,
            uuid,
            name: name.to_string(),
        })
    }

    pub fn get_attribute_type(&self, id: i64) -> Result<Option<AttributeType>> {
        let sql = format!("SELECT {ATTRIBUTE_TYPE_COLUMNS} FROM product_attribute_types WHERE id = ?1");
        self.query_one(&sql, id, attribute_type_from_row)
    }

    pub fn update_attribute_type(&self, id: i64, name: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE product_attribute_types SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        Ok(changed > 0)
    }

    pub fn create_attribute_option(&self, attribute_type_id: i64, name: &str) -> Result<AttributeOption> {
        let uuid = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO product_attribute_options (uuid, attribute_type_id, name) VALUES (?1, ?2, ?3)",
            params![uuid.to_string(), attribute_type_id, name],
        )?;
        let id = self.conn.last_insert_rowid();

        Ok(AttributeOption {
            id,
            uuid,
            attribute_type_id,
            name: name.to_string(),
        })
    }

    pub fn get_attribute_option(&self, id: i64) -> Result<Option<AttributeOption>> {
        let sql = format!("SELECT {ATTRIBUTE_OPTION_COLUMNS} FROM product_attribute_options WHERE id = ?1");
        self.query_one(&sql, id, attribute_option_from_row)
    }

    pub fn update_attribute_option(&self, id: i64, name: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE product_attribute_options SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        Ok(changed > 0)
    }

    pub fn options_for(&self, attribute_type_id: i64) -> Result<Vec<AttributeOption>> {
        let sql = format!(
            "SELECT {ATTRIBUTE_OPTION_COLUMNS} FROM product_attribute_options WHERE attribute_type_id = ?1 ORDER BY id"
        );
        self.query_all(&sql, [attribute_type_id], attribute_option_from_row)
    }

    // ========== Variant Operations ==========

    pub fn create_variant(&self, variant: &NewVariant) -> Result<ProductVariant> {
        let unit_price = price::to_minor_units(variant.price)?;
        let uuid = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO product_variants (uuid, product_id, sku, price, stock) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![uuid.to_string(), variant.product_id, variant.sku, unit_price, variant.stock],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, product_id = variant.product_id, sku = %variant.sku, "created variant");

        Ok(ProductVariant {
            id,
            uuid,
            product_id: variant.product_id,
            sku: variant.sku.clone(),
            price: price::from_minor_units(unit_price),
            stock: variant.stock,
        })
    }

    pub fn get_variant(&self, id: i64) -> Result<Option<ProductVariant>> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = ?1");
        self.query_one(&sql, id, variant_from_row)
    }

    pub fn update_variant(&self, id: i64, variant: &NewVariant) -> Result<bool> {
        let unit_price = price::to_minor_units(variant.price)?;
        let changed = self.conn.execute(
            "UPDATE product_variants SET product_id = ?1, sku = ?2, price = ?3, stock = ?4 WHERE id = ?5",
            params![variant.product_id, variant.sku, unit_price, variant.stock, id],
        )?;
        Ok(changed > 0)
    }

    pub fn variants_for(&self, product_id: i64) -> Result<Vec<ProductVariant>> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM product_variants WHERE product_id = ?1 ORDER BY id");
        self.query_all(&sql, [product_id], variant_from_row)
    }

    pub fn create_variant_attribute(&self, variant_id: i64, attribute_option_id: i64) -> Result<VariantAttribute> {
        let uuid = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO product_variant_attributes (uuid, variant_id, attribute_option_id) VALUES (?1, ?2, ?3)",
            params![uuid.to_string(), variant_id, attribute_option_id],
        )?;
        let id = self.conn.last_insert_rowid();

        Ok(VariantAttribute {
            id,
            uuid,
            variant_id,
            attribute_option_id,
        })
    }

    pub fn get_variant_attribute(&self, id: i64) -> Result<Option<VariantAttribute>> {
        let sql = format!("SELECT {VARIANT_ATTRIBUTE_COLUMNS} FROM product_variant_attributes WHERE id = ?1");
        self.query_one(&sql, id, variant_attribute_from_row)
    }

    pub fn attributes_for(&self, variant_id: i64) -> Result<Vec<VariantAttribute>> {
        let sql = format!(
            "SELECT {VARIANT_ATTRIBUTE_COLUMNS} FROM product_variant_attributes WHERE variant_id = ?1 ORDER BY id"
        );
        self.query_all(&sql, [variant_id], variant_attribute_from_row)
    }

    // ========== Generic Operations ==========

    /// Resolve a public identifier to the internal id
    pub fn find_id(&self, kind: EntityKind, uuid: &Uuid) -> Result<Option<i64>> {
        let sql = format!("SELECT id FROM {} WHERE uuid = ?1", kind.table());
        self.conn
            .query_row(&sql, [uuid.to_string()], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    /// Delete one row; everything that depends on it goes with it.
    pub fn delete(&self, kind: EntityKind, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table());
        let deleted = self.conn.execute(&sql, [id])? > 0;
        tracing::debug!(%kind, id, deleted, "delete");
        Ok(deleted)
    }

    pub fn count(&self, kind: EntityKind) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Human label for a record, following each entity's display form
    pub fn label(&self, kind: EntityKind, id: i64) -> Result<Option<String>> {
        let label = match kind {
            EntityKind::Brand => self.get_brand(id)?.map(|b| b.to_string()),
            EntityKind::Category => self.get_category(id)?.map(|c| c.to_string()),
            EntityKind::Product => self.get_product(id)?.map(|p| p.to_string()),
            EntityKind::Specification => self.get_specification(id)?.map(|s| s.to_string()),
            EntityKind::AttributeType => self.get_attribute_type(id)?.map(|t| t.to_string()),
            EntityKind::Gallery => {
                let Some(gallery) = self.get_gallery(id)? else {
                    return Ok(None);
                };
                self.get_product(gallery.product_id)?
                    .map(|p| format!("Gallery for {}", p.name))
            }
            EntityKind::AttributeOption => {
                let Some(option) = self.get_attribute_option(id)? else {
                    return Ok(None);
                };
                self.get_attribute_type(option.attribute_type_id)?
                    .map(|t| format!("{} - {}", t.name, option.name))
            }
            EntityKind::Variant => {
                let Some(variant) = self.get_variant(id)? else {
                    return Ok(None);
                };
                self.get_product(variant.product_id)?
                    .map(|p| format!("{} - {}", p.name, variant.sku))
            }
            EntityKind::VariantAttribute => {
                let Some(link) = self.get_variant_attribute(id)? else {
                    return Ok(None);
                };
                let variant = self.label(EntityKind::Variant, link.variant_id)?;
                let option = self.get_attribute_option(link.attribute_option_id)?;
                match (variant, option) {
                    (Some(variant), Some(option)) => Some(format!("{} - {}", variant, option.name)),
                    _ => None,
                }
            }
        };
        Ok(label)
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    /// Run `f` inside a transaction, rolling back if it fails
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let counts = EntityKind::all()
            .iter()
            .map(|kind| self.count(*kind).map(|n| (*kind, n)))
            .collect::<Result<Vec<_>>>()?;
        Ok(DbStats { counts })
    }
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn brand_at(row: &Row<'_>, at: usize) -> rusqlite::Result<Brand> {
    Ok(Brand {
        id: row.get(at)?,
        uuid: uuid_at(row, at + 1)?,
        name: row.get(at + 2)?,
        description: row.get(at + 3)?,
        created_at: row.get(at + 4)?,
        updated_at: row.get(at + 5)?,
    })
}

fn brand_from_row(row: &Row<'_>) -> rusqlite::Result<Brand> {
    brand_at(row, 0)
}

fn category_at(row: &Row<'_>, at: usize) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(at)?,
        uuid: uuid_at(row, at + 1)?,
        name: row.get(at + 2)?,
        description: row.get(at + 3)?,
        created_at: row.get(at + 4)?,
        updated_at: row.get(at + 5)?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    category_at(row, 0)
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        name: row.get(2)?,
        base_price: price::from_minor_units(row.get(3)?),
        description: row.get(4)?,
        thumbnail: row.get(5)?,
        brand_id: row.get(6)?,
        category_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<ProductListing> {
    let product = product_from_row(row)?;
    let category = category_at(row, 10)?;
    let brand = match row.get::<_, Option<i64>>(16)? {
        Some(_) => Some(brand_at(row, 16)?),
        None => None,
    };
    Ok(ProductListing::new(product, category, brand))
}

fn gallery_from_row(row: &Row<'_>) -> rusqlite::Result<ProductGallery> {
    Ok(ProductGallery {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        product_id: row.get(2)?,
        media: row.get(3)?,
        uploaded_at: row.get(4)?,
    })
}

fn specification_from_row(row: &Row<'_>) -> rusqlite::Result<ProductSpecification> {
    Ok(ProductSpecification {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        product_id: row.get(2)?,
        name: row.get(3)?,
        value: row.get(4)?,
    })
}

fn attribute_type_from_row(row: &Row<'_>) -> rusqlite::Result<AttributeType> {
    Ok(AttributeType {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        name: row.get(2)?,
    })
}

fn attribute_option_from_row(row: &Row<'_>) -> rusqlite::Result<AttributeOption> {
    Ok(AttributeOption {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        attribute_type_id: row.get(2)?,
        name: row.get(3)?,
    })
}

fn variant_from_row(row: &Row<'_>) -> rusqlite::Result<ProductVariant> {
    Ok(ProductVariant {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        product_id: row.get(2)?,
        sku: row.get(3)?,
        price: price::from_minor_units(row.get(4)?),
        stock: row.get(5)?,
    })
}

fn variant_attribute_from_row(row: &Row<'_>) -> rusqlite::Result<VariantAttribute> {
    Ok(VariantAttribute {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        variant_id: row.get(2)?,
        attribute_option_id: row.get(3)?,
    })
}

/// Database statistics
#[derive(Debug, Clone, PartialEq)]
pub struct DbStats {
    pub counts: Vec<(EntityKind, usize)>,
}

impl DbStats {
    pub fn get(&self, kind: EntityKind) -> usize {
        self.counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// Rows per kind present here but gone from `after`
    pub fn removed_since(&self, after: &DbStats) -> Vec<(EntityKind, usize)> {
        self.counts
            .iter()
            .map(|(kind, before)| (*kind, before.saturating_sub(after.get(*kind))))
            .filter(|(_, removed)| *removed > 0)
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .counts
            .iter()
            .map(|(kind, n)| (kind.table().to_string(), serde_json::Value::from(*n)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (kind, n) in &self.counts {
            writeln!(f, "  {}: {}", kind.table(), n)?;
        }
        write!(f, "  total: {}", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use rust_decimal::Decimal;

    fn phones_fixture(store: &SqliteStore) -> (Category, Brand, Product) {
        let category = store
            .create_category(&NewCategory::new("Phones").with_description("Mobile phones"))
            .unwrap();
        let brand = store.create_brand(&NewBrand::new("Samsung")).unwrap();
        let product = store
            .create_product(
                &NewProduct::new("Galaxy S21", Decimal::new(69900, 2), category.id).with_brand(brand.id),
            )
            .unwrap();
        (category, brand, product)
    }

    #[test]
    fn test_brand_crud() {
        let store = SqliteStore::open_in_memory().unwrap();

        let brand = store
            .create_brand(&NewBrand::new("Nike").with_description("Sportswear"))
            .unwrap();
        let retrieved = store.get_brand(brand.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Nike");
        assert_eq!(retrieved.description, "Sportswear");
        assert_eq!(retrieved.uuid, brand.uuid);

        assert!(store.delete(EntityKind::Brand, brand.id).unwrap());
        assert!(store.get_brand(brand.id).unwrap().is_none());
        assert!(!store.delete(EntityKind::Brand, brand.id).unwrap());
    }

    #[test]
    fn test_update_bumps_updated_at() {
        let store = SqliteStore::open_in_memory().unwrap();
        let category = store.create_category(&NewCategory::new("Phones")).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        assert!(store.update_category(category.id, &NewCategory::new("Smartphones")).unwrap());

        let updated = store.get_category(category.id).unwrap().unwrap();
        assert_eq!(updated.name, "Smartphones");
        assert!(updated.updated_at > updated.created_at);
        assert!(!store.update_category(9999, &NewCategory::new("Ghost")).unwrap());
    }

    #[test]
    fn test_empty_name_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.create_brand(&NewBrand::new("")).unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
    }

    #[test]
    fn test_product_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (category, brand, product) = phones_fixture(&store);

        let retrieved = store.get_product(product.id).unwrap().unwrap();
        assert_eq!(retrieved.base_price, Decimal::new(69900, 2));
        assert_eq!(retrieved.base_price.to_string(), "699.00");
        assert_eq!(retrieved.category_id, category.id);
        assert_eq!(retrieved.brand_id, Some(brand.id));
    }

    #[test]
    fn test_negative_price_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let category = store.create_category(&NewCategory::new("Phones")).unwrap();

        let err = store
            .create_product(&NewProduct::new("Broken", Decimal::new(-1, 2), category.id))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPrice(_)));

        // The schema enforces it too
        let raw = store.conn.execute(
            "INSERT INTO products (uuid, name, base_price, category_id, created_at, updated_at) VALUES ('x', 'Raw', -5, ?1, '', '')",
            [category.id],
        );
        assert!(raw.is_err());
        assert_eq!(store.count(EntityKind::Product).unwrap(), 0);
    }

    #[test]
    fn test_dangling_parent_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .create_product(&NewProduct::new("Orphan", Decimal::ONE, 42))
            .unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));

        let err = store.create_attribute_option(7, "Red").unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
    }

    #[test]
    fn test_brand_attaches_to_one_product() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (category, brand, _) = phones_fixture(&store);

        let err = store
            .create_product(&NewProduct::new("Galaxy S22", Decimal::new(79900, 2), category.id).with_brand(brand.id))
            .unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));

        // Without a brand is fine
        store
            .create_product(&NewProduct::new("Galaxy S22", Decimal::new(79900, 2), category.id))
            .unwrap();
        assert_eq!(store.count(EntityKind::Product).unwrap(), 2);
    }

    #[test]
    fn test_negative_stock_rejected_by_schema() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_, _, product) = phones_fixture(&store);
        let variant = store
            .create_variant(&NewVariant::new(product.id, "S21-128", Decimal::new(69900, 2)).with_stock(4))
            .unwrap();

        let result = store
            .conn
            .execute("UPDATE product_variants SET stock = -1 WHERE id = ?1", [variant.id]);
        assert!(result.is_err());
        assert_eq!(store.get_variant(variant.id).unwrap().unwrap().stock, 4);
    }

    #[test]
    fn test_listing_joins_category_and_brand() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (category, _, _) = phones_fixture(&store);
        store
            .create_product(&NewProduct::new("Pixel 8", Decimal::new(59900, 2), category.id))
            .unwrap();

        let listings = store.product_listings().unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].name, "Galaxy S21");
        assert_eq!(listings[0].category.name, "Phones");
        assert_eq!(listings[0].brand.as_ref().map(|b| b.name.as_str()), Some("Samsung"));
        assert_eq!(listings[1].name, "Pixel 8");
        assert!(listings[1].brand.is_none());
    }

    #[test]
    fn test_category_delete_cascades_transitively() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (category, brand, product) = phones_fixture(&store);

        store.create_gallery(product.id, "gallery/products/front.jpg").unwrap();
        store.create_specification(product.id, "Screen", "6.2 inch").unwrap();
        let variant = store
            .create_variant(&NewVariant::new(product.id, "S21-128", Decimal::new(69900, 2)))
            .unwrap();
        let color = store.create_attribute_type("Color").unwrap();
        let black = store.create_attribute_option(color.id, "Black").unwrap();
        store.create_variant_attribute(variant.id, black.id).unwrap();

        assert!(store.delete(EntityKind::Category, category.id).unwrap());

        let stats = store.stats().unwrap();
        assert_eq!(stats.get(EntityKind::Product), 0);
        assert_eq!(stats.get(EntityKind::Gallery), 0);
        assert_eq!(stats.get(EntityKind::Specification), 0);
        assert_eq!(stats.get(EntityKind::Variant), 0);
        assert_eq!(stats.get(EntityKind::VariantAttribute), 0);
        // Unrelated parents survive
        assert!(store.get_brand(brand.id).unwrap().is_some());
        assert_eq!(stats.get(EntityKind::AttributeOption), 1);
    }

    #[test]
    fn test_brand_delete_removes_product() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_, brand, product) = phones_fixture(&store);

        store.delete(EntityKind::Brand, brand.id).unwrap();
        assert!(store.get_product(product.id).unwrap().is_none());
        assert!(store.product_listings().unwrap().is_empty());
    }

    #[test]
    fn test_option_delete_keeps_variant() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_, _, product) = phones_fixture(&store);
        let variant = store
            .create_variant(&NewVariant::new(product.id, "S21-RED", Decimal::new(69900, 2)))
            .unwrap();
        let color = store.create_attribute_type("Color").unwrap();
        let red = store.create_attribute_option(color.id, "Red").unwrap();
        store.create_variant_attribute(variant.id, red.id).unwrap();

        store.delete(EntityKind::AttributeOption, red.id).unwrap();
        assert!(store.attributes_for(variant.id).unwrap().is_empty());
        assert!(store.get_variant(variant.id).unwrap().is_some());

        // Deleting the type takes the remaining options with it
        store.create_attribute_option(color.id, "Blue").unwrap();
        store.delete(EntityKind::AttributeType, color.id).unwrap();
        assert!(store.options_for(color.id).unwrap().is_empty());
    }

    #[test]
    fn test_find_id_by_uuid() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (category, _, product) = phones_fixture(&store);

        assert_eq!(store.find_id(EntityKind::Category, &category.uuid).unwrap(), Some(category.id));
        assert_eq!(store.find_id(EntityKind::Product, &product.uuid).unwrap(), Some(product.id));
        // Right uuid, wrong table
        assert_eq!(store.find_id(EntityKind::Brand, &product.uuid).unwrap(), None);
    }

    #[test]
    fn test_labels() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_, _, product) = phones_fixture(&store);
        let gallery = store.create_gallery(product.id, "front.jpg").unwrap();
        let spec = store.create_specification(product.id, "Screen", "6.2 inch").unwrap();
        let variant = store
            .create_variant(&NewVariant::new(product.id, "S21-128", Decimal::new(69900, 2)))
            .unwrap();
        let storage = store.create_attribute_type("Storage").unwrap();
        let option = store.create_attribute_option(storage.id, "128 GB").unwrap();
        let link = store.create_variant_attribute(variant.id, option.id).unwrap();

        let label = |kind, id| store.label(kind, id).unwrap().unwrap();
        assert_eq!(label(EntityKind::Gallery, gallery.id), "Gallery for Galaxy S21");
        assert_eq!(label(EntityKind::Specification, spec.id), "Screen: 6.2 inch");
        assert_eq!(label(EntityKind::AttributeOption, option.id), "Storage - 128 GB");
        assert_eq!(label(EntityKind::Variant, variant.id), "Galaxy S21 - S21-128");
        assert_eq!(label(EntityKind::VariantAttribute, link.id), "Galaxy S21 - S21-128 - 128 GB");
        assert!(store.label(EntityKind::Brand, 999).unwrap().is_none());
    }

    #[test]
    fn test_transaction_rolls_back() {
        let store = SqliteStore::open_in_memory().unwrap();

        let result: Result<()> = store.transaction(|tx| {
            tx.create_brand(&NewBrand::new("Adidas"))?;
            tx.create_brand(&NewBrand::new(""))?;
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(store.count(EntityKind::Brand).unwrap(), 0);

        store
            .transaction(|tx| tx.create_brand(&NewBrand::new("Adidas")).map(|_| ()))
            .unwrap();
        assert_eq!(store.count(EntityKind::Brand).unwrap(), 1);
    }

    #[test]
    fn test_stats_removed_since() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_, brand, product) = phones_fixture(&store);
        store.create_specification(product.id, "Weight", "169 g").unwrap();

        let before = store.stats().unwrap();
        store.delete(EntityKind::Brand, brand.id).unwrap();
        let after = store.stats().unwrap();

        assert_eq!(
            before.removed_since(&after),
            vec![
                (EntityKind::Brand, 1),
                (EntityKind::Product, 1),
                (EntityKind::Specification, 1),
            ]
        );
        assert_eq!(after.total(), 1);
    }

    #[test]
    fn test_listings_filtered_by_parent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (phones, samsung, _) = phones_fixture(&store);
        let shoes = store.create_category(&NewCategory::new("Shoes")).unwrap();
        let nike = store.create_brand(&NewBrand::new("Nike")).unwrap();
        store
            .create_product(&NewProduct::new("Air Max", Decimal::new(12000, 2), shoes.id).with_brand(nike.id))
            .unwrap();
        store
            .create_product(&NewProduct::new("Galaxy A52", Decimal::new(34900, 2), phones.id))
            .unwrap();

        let names = |listings: Vec<ProductListing>| listings.into_iter().map(|l| l.name).collect::<Vec<_>>();
        assert_eq!(
            names(store.listings_in_categories(&[phones.id]).unwrap()),
            vec!["Galaxy S21", "Galaxy A52"]
        );
        assert_eq!(names(store.listings_in_categories(&[phones.id, shoes.id]).unwrap()).len(), 3);
        assert_eq!(
            names(store.listings_for_brands(&[samsung.id, nike.id]).unwrap()),
            vec!["Galaxy S21", "Air Max"]
        );
        assert!(store.listings_in_categories(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_update_product_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_, _, product) = phones_fixture(&store);
        let tablets = store.create_category(&NewCategory::new("Tablets")).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        let mut fields = NewProduct::from(&product);
        fields.name = "Galaxy Tab".to_string();
        fields.base_price = Decimal::new(49950, 2);
        fields.category_id = tablets.id;
        fields.brand_id = None;
        assert!(store.update_product(product.id, &fields).unwrap());

        let updated = store.get_product(product.id).unwrap().unwrap();
        assert_eq!(updated.name, "Galaxy Tab");
        assert_eq!(updated.base_price.to_string(), "499.50");
        assert_eq!(updated.category_id, tablets.id);
        assert_eq!(updated.brand_id, None);
        assert!(updated.updated_at > updated.created_at);
        assert!(!store.update_product(9999, &fields).unwrap());
    }

    #[test]
    fn test_update_product_rejects_negative_price() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_, _, product) = phones_fixture(&store);

        let mut fields = NewProduct::from(&product);
        fields.base_price = Decimal::new(-100, 2);
        let err = store.update_product(product.id, &fields).unwrap_err();
        assert!(matches!(err, Error::InvalidPrice(_)));

        fields.base_price = Decimal::new(1, 3);
        assert!(matches!(store.update_product(product.id, &fields).unwrap_err(), Error::InvalidPrice(_)));
        assert_eq!(store.get_product(product.id).unwrap().unwrap().base_price.to_string(), "699.00");
    }

    #[test]
    fn test_update_product_onto_attached_brand() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (category, samsung, _) = phones_fixture(&store);
        let other = store
            .create_product(&NewProduct::new("Pixel 6", Decimal::new(59900, 2), category.id))
            .unwrap();

        let fields = NewProduct::from(&other).with_brand(samsung.id);
        let err = store.update_product(other.id, &fields).unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
        assert_eq!(store.get_product(other.id).unwrap().unwrap().brand_id, None);
    }

    #[test]
    fn test_update_variant() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_, _, product) = phones_fixture(&store);
        let variant = store
            .create_variant(&NewVariant::new(product.id, "S21-128", Decimal::new(69900, 2)).with_stock(4))
            .unwrap();

        let fields = NewVariant::new(product.id, "S21-256", Decimal::new(74900, 2)).with_stock(0);
        assert!(store.update_variant(variant.id, &fields).unwrap());
        let updated = store.get_variant(variant.id).unwrap().unwrap();
        assert_eq!(updated.sku, "S21-256");
        assert_eq!(updated.price.to_string(), "749.00");
        assert_eq!(updated.stock, 0);

        // Price limits apply on update as well
        let too_big = NewVariant::new(product.id, "S21-1TB", Decimal::new(10_000_000_000, 0));
        assert!(matches!(store.update_variant(variant.id, &too_big).unwrap_err(), Error::InvalidPrice(_)));

        let dangling = NewVariant::new(4242, "S21-256", Decimal::ONE);
        assert!(matches!(store.update_variant(variant.id, &dangling).unwrap_err(), Error::Constraint(_)));
        assert!(!store.update_variant(9999, &fields).unwrap());
    }

    #[test]
    fn test_update_gallery_bumps_uploaded_at() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_, _, product) = phones_fixture(&store);
        let gallery = store.create_gallery(product.id, "gallery/products/front.png").unwrap();

        std::thread::sleep(Duration::from_millis(5));
        assert!(store.update_gallery(gallery.id, "gallery/products/back.png").unwrap());

        let updated = store.get_gallery(gallery.id).unwrap().unwrap();
        assert_eq!(updated.media, "gallery/products/back.png");
        assert!(updated.uploaded_at > gallery.uploaded_at);
        assert!(!store.update_gallery(9999, "x.png").unwrap());
    }

    #[test]
    fn test_update_specification_and_attributes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_, _, product) = phones_fixture(&store);

        let spec = store.create_specification(product.id, "Screen", "6.1 inch").unwrap();
        assert!(store.update_specification(spec.id, "Screen", "6.2 inch").unwrap());
        let spec = store.get_specification(spec.id).unwrap().unwrap();
        assert_eq!(spec.to_string(), "Screen: 6.2 inch");

        let color = store.create_attribute_type("Colour").unwrap();
        assert!(store.update_attribute_type(color.id, "Color").unwrap());
        assert_eq!(store.get_attribute_type(color.id).unwrap().unwrap().name, "Color");

        let red = store.create_attribute_option(color.id, "Rd").unwrap();
        assert!(store.update_attribute_option(red.id, "Red").unwrap());
        let red = store.get_attribute_option(red.id).unwrap().unwrap();
        assert_eq!(red.name, "Red");
        assert_eq!(red.attribute_type_id, color.id);

        let long_name = "x".repeat(101);
        assert!(matches!(
            store.update_attribute_type(color.id, &long_name).unwrap_err(),
            Error::Constraint(_)
        ));
        assert!(!store.update_specification(9999, "a", "b").unwrap());
        assert!(!store.update_attribute_type(9999, "a").unwrap());
        assert!(!store.update_attribute_option(9999, "a").unwrap());
    }

    #[test]
    fn test_read_only_open_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        assert!(SqliteStore::open_read_only(&path).is_err());

        let store = SqliteStore::open(&path).unwrap();
        store.create_brand(&NewBrand::new("Apple")).unwrap();
        drop(store);

        let reader = SqliteStore::open_read_only(&path).unwrap();
        assert_eq!(reader.all_brands().unwrap().len(), 1);
        assert!(reader.create_brand(&NewBrand::new("Sony")).is_err());
    }
}
