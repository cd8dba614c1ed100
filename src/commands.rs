use std::path::PathBuf;
use clap::Subcommand;
use owo_colors::OwoColorize;
use catalog::catalog::{media, parse_uuid, price};
use catalog::catalog::{NewBrand, NewCategory, NewProduct, NewVariant};
use catalog::config::{self, CatalogConfig};
use catalog::output::{OutputMode, emit_success};
use catalog::query::{StoreHandle, build_schema};
use catalog::ui::{self, Icons};
use catalog::{CatalogQuery, EntityKind, Error, ProductListing, SqliteStore};

/// Resolved settings shared by every command
pub struct Context {
    pub output: OutputMode,
    pub config: CatalogConfig,
    pub config_path: PathBuf,
    /// Directory relative config paths are resolved against
    pub base: PathBuf,
    pub database: PathBuf,
}

impl Context {
    /// Open for writing, creating the database if needed
    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        config::ensure_db_dir(&self.database)?;
        let store = SqliteStore::open(&self.database)?;
        store.set_busy_timeout(self.config.busy_timeout())?;
        Ok(store)
    }

    /// Open an existing database for the read-only commands
    pub fn open_reader(&self) -> anyhow::Result<SqliteStore> {
        let store = SqliteStore::open_read_only(&self.database).map_err(|err| {
            Error::Unavailable(format!("cannot open {}: {err}", self.database.display()))
        })?;
        store.set_busy_timeout(self.config.busy_timeout())?;
        Ok(store)
    }
}

#[derive(Subcommand)]
pub enum AddCommand {
    /// Add a brand
    Brand {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Add a category
    Category {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Add a product
    Product {
        name: String,
        /// Base price, e.g. 699.00
        #[arg(long)]
        price: String,
        /// Category UUID
        #[arg(long)]
        category: String,
        /// Brand UUID
        #[arg(long)]
        brand: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Thumbnail file name or path
        #[arg(long, default_value = "")]
        thumbnail: String,
        /// Specification as NAME=VALUE (repeatable)
        #[arg(long = "spec")]
        specs: Vec<String>,
    },

    /// Attach gallery media to a product
    Gallery {
        /// Product UUID
        #[arg(long)]
        product: String,
        /// Media file name or path
        media: String,
    },

    /// Add a specification to a product
    Spec {
        #[arg(long)]
        product: String,
        name: String,
        value: String,
    },

    /// Add an attribute type, e.g. Color
    AttributeType { name: String },

    /// Add an option to an attribute type, e.g. Red
    AttributeOption {
        /// Attribute type UUID
        #[arg(long = "type")]
        attribute_type: String,
        name: String,
    },

    /// Add a variant to a product
    Variant {
        #[arg(long)]
        product: String,
        sku: String,
        #[arg(long)]
        price: String,
        #[arg(long, default_value = "0")]
        stock: u32,
    },

    /// Link a variant to an attribute option
    VariantAttribute {
        #[arg(long)]
        variant: String,
        #[arg(long)]
        option: String,
    },
}

#[derive(Subcommand)]
pub enum UpdateCommand {
    Brand {
        uuid: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    Category {
        uuid: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    Product {
        uuid: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        thumbnail: Option<String>,
        /// Category UUID
        #[arg(long)]
        category: Option<String>,
        /// Brand UUID
        #[arg(long, conflicts_with = "no_brand")]
        brand: Option<String>,
        /// Detach the brand
        #[arg(long)]
        no_brand: bool,
    },

    Variant {
        uuid: String,
        #[arg(long)]
        sku: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        stock: Option<u32>,
    },

    /// Replace gallery media; the upload time moves to now
    Gallery {
        uuid: String,
        /// Media file name or path
        media: String,
    },

    Spec {
        uuid: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        value: Option<String>,
    },

    AttributeType {
        uuid: String,
        #[arg(long)]
        name: String,
    },

    AttributeOption {
        uuid: String,
        #[arg(long)]
        name: String,
    },
}

/// Look up the internal id behind a public uuid
fn resolve(store: &SqliteStore, kind: EntityKind, uuid: &str) -> anyhow::Result<i64> {
    let parsed = parse_uuid(uuid)?;
    store
        .find_id(kind, &parsed)?
        .ok_or_else(|| Error::NotFound(kind, uuid.to_string()).into())
}

fn parse_spec(spec: &str) -> anyhow::Result<(String, String)> {
    match spec.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => anyhow::bail!("specification must look like NAME=VALUE, got {spec:?}"),
    }
}

pub fn run_init(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let entry = config::database_entry(&ctx.database, &ctx.base)?;
    let config = CatalogConfig {
        database: Some(entry.display().to_string()),
        ..ctx.config.clone()
    };
    if force && ctx.config_path.exists() && ctx.output.is_human() {
        ui::warn(&format!("Overwriting {}", ctx.config_path.display()));
    }
    config::write_config(&ctx.config_path, &config, force)?;
    ctx.open_store()?;
    config::ensure_gitignore(&ctx.base)?;
    tracing::info!(database = %ctx.database.display(), "initialized catalog");

    if ctx.output.is_human() {
        ui::success("Catalog initialized");
        ui::info("Config", &ctx.config_path.display().to_string());
        ui::info("Database", &ctx.database.display().to_string());
    } else {
        emit_success("init", serde_json::json!({
            "config": ctx.config_path.display().to_string(),
            "database": ctx.database.display().to_string(),
        }))?;
    }
    Ok(())
}

pub fn run_serve(ctx: &Context, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let addr = ctx.config.server_addr(host.as_deref(), port)?;
    // Creates the schema so read-only connections find it
    drop(ctx.open_store()?);

    let store = StoreHandle::new(&ctx.database).with_busy_timeout(ctx.config.busy_timeout());
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(catalog::server::start_server(addr, store))
}

pub fn run_brands(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_reader()?;
    let brands = CatalogQuery::new(&store).list_brands()?;

    if !ctx.output.is_human() {
        return emit_success("brands", &brands);
    }
    if brands.is_empty() {
        ui::empty("brands");
    } else {
        let rows: Vec<ui::NamedRow> = brands.iter().map(ui::NamedRow::from).collect();
        println!("{} {} ({})", Icons::TAG, "Brands".bold(), brands.len());
        println!("{}", ui::render(&rows));
    }
    Ok(())
}

pub fn run_categories(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_reader()?;
    let categories = CatalogQuery::new(&store).list_categories()?;

    if !ctx.output.is_human() {
        return emit_success("categories", &categories);
    }
    if categories.is_empty() {
        ui::empty("categories");
    } else {
        let rows: Vec<ui::NamedRow> = categories.iter().map(ui::NamedRow::from).collect();
        println!("{} {} ({})", Icons::FOLDER, "Categories".bold(), categories.len());
        println!("{}", ui::render(&rows));
    }
    Ok(())
}

pub fn run_products(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_reader()?;
    let products = CatalogQuery::new(&store).list_products()?;

    if !ctx.output.is_human() {
        return emit_success("products", &products);
    }
    if products.is_empty() {
        ui::empty("products");
    } else {
        let rows: Vec<ui::ProductRow> = products.iter().map(ui::ProductRow::from).collect();
        println!("{} {} ({})", Icons::PACKAGE, "Products".bold(), products.len());
        println!("{}", ui::render(&rows));
    }
    Ok(())
}

pub fn run_show(ctx: &Context, uuid: &str) -> anyhow::Result<()> {
    let store = ctx.open_reader()?;
    let id = resolve(&store, EntityKind::Product, uuid)?;
    let product = store
        .get_product(id)?
        .ok_or_else(|| Error::NotFound(EntityKind::Product, uuid.to_string()))?;
    let category = store
        .get_category(product.category_id)?
        .ok_or_else(|| Error::NotFound(EntityKind::Category, product.category_id.to_string()))?;
    let brand = match product.brand_id {
        Some(brand_id) => store.get_brand(brand_id)?,
        None => None,
    };
    let gallery = store.gallery_for(id)?;
    let specifications = store.specifications_for(id)?;

    let mut variants = Vec::new();
    for variant in store.variants_for(id)? {
        let mut attributes = Vec::new();
        for link in store.attributes_for(variant.id)? {
            if let Some(label) = store.label(EntityKind::AttributeOption, link.attribute_option_id)? {
                attributes.push(label);
            }
        }
        variants.push((variant, attributes));
    }
    let listing = ProductListing::new(product, category, brand);

    if !ctx.output.is_human() {
        let variants: Vec<_> = variants
            .iter()
            .map(|(variant, attributes)| serde_json::json!({
                "uuid": variant.uuid,
                "sku": variant.sku,
                "price": variant.price,
                "stock": variant.stock,
                "attributes": attributes,
            }))
            .collect();
        return emit_success("show", serde_json::json!({
            "product": listing,
            "gallery": gallery,
            "specifications": specifications,
            "variants": variants,
        }));
    }

    ui::header(&listing.name);
    ui::summary_row("UUID", &listing.uuid.to_string());
    ui::summary_row("Price", &ui::price(&listing.base_price.to_string()));
    ui::summary_row("Category", &listing.category.name);
    ui::summary_row(
        "Brand",
        listing.brand.as_ref().map(|b| b.name.as_str()).unwrap_or("-"),
    );
    if !listing.description.is_empty() {
        ui::summary_row("Description", &listing.description);
    }
    if !listing.thumbnail.is_empty() {
        ui::summary_row("Thumbnail", &listing.thumbnail);
    }

    if !specifications.is_empty() {
        ui::section(Icons::LIST, "Specifications");
        for spec in &specifications {
            println!("  {}", spec);
        }
    }
    if !gallery.is_empty() {
        ui::section(Icons::IMAGE, "Gallery");
        for item in &gallery {
            println!("  {} {}", item.media, ui::dim(&item.uploaded_at.format("%Y-%m-%d").to_string()));
        }
    }
    if !variants.is_empty() {
        ui::section(Icons::PACKAGE, "Variants");
        let rows: Vec<ui::VariantRow> = variants
            .iter()
            .map(|(variant, attributes)| ui::VariantRow::new(variant, attributes))
            .collect();
        println!("{}", ui::render(&rows));
    }
    Ok(())
}

pub fn run_add(ctx: &Context, command: AddCommand) -> anyhow::Result<()> {
    let store = ctx.open_store()?;

    let (kind, id, uuid) = match command {
        AddCommand::Brand { name, description } => {
            let brand = store.create_brand(&NewBrand::new(name).with_description(description))?;
            (EntityKind::Brand, brand.id, brand.uuid)
        }
        AddCommand::Category { name, description } => {
            let category = store.create_category(&NewCategory::new(name).with_description(description))?;
            (EntityKind::Category, category.id, category.uuid)
        }
        AddCommand::Product { name, price, category, brand, description, thumbnail, specs } => {
            let base_price = price::parse_price(&price)?;
            let category_id = resolve(&store, EntityKind::Category, &category)?;
            let mut product = NewProduct::new(name, base_price, category_id)
                .with_description(description)
                .with_thumbnail(media::thumbnail_path(&thumbnail));
            if let Some(brand) = brand {
                product = product.with_brand(resolve(&store, EntityKind::Brand, &brand)?);
            }
            let specs = specs.iter().map(|s| parse_spec(s)).collect::<anyhow::Result<Vec<_>>>()?;

            let created = store.transaction(|tx| {
                let created = tx.create_product(&product)?;
                for (name, value) in &specs {
                    tx.create_specification(created.id, name, value)?;
                }
                Ok(created)
            })?;
            (EntityKind::Product, created.id, created.uuid)
        }
        AddCommand::Gallery { product, media: name } => {
            let product_id = resolve(&store, EntityKind::Product, &product)?;
            let gallery = store.create_gallery(product_id, &media::gallery_path(&name))?;
            (EntityKind::Gallery, gallery.id, gallery.uuid)
        }
        AddCommand::Spec { product, name, value } => {
            let product_id = resolve(&store, EntityKind::Product, &product)?;
            let spec = store.create_specification(product_id, &name, &value)?;
            (EntityKind::Specification, spec.id, spec.uuid)
        }
        AddCommand::AttributeType { name } => {
            let attribute_type = store.create_attribute_type(&name)?;
            (EntityKind::AttributeType, attribute_type.id, attribute_type.uuid)
        }
        AddCommand::AttributeOption { attribute_type, name } => {
            let type_id = resolve(&store, EntityKind::AttributeType, &attribute_type)?;
            let option = store.create_attribute_option(type_id, &name)?;
            (EntityKind::AttributeOption, option.id, option.uuid)
        }
        AddCommand::Variant { product, sku, price, stock } => {
            let product_id = resolve(&store, EntityKind::Product, &product)?;
            let variant = NewVariant::new(product_id, sku, price::parse_price(&price)?).with_stock(stock);
            let variant = store.create_variant(&variant)?;
            (EntityKind::Variant, variant.id, variant.uuid)
        }
        AddCommand::VariantAttribute { variant, option } => {
            let variant_id = resolve(&store, EntityKind::Variant, &variant)?;
            let option_id = resolve(&store, EntityKind::AttributeOption, &option)?;
            let link = store.create_variant_attribute(variant_id, option_id)?;
            (EntityKind::VariantAttribute, link.id, link.uuid)
        }
    };

    let label = store.label(kind, id)?.unwrap_or_default();
    tracing::info!(%kind, %uuid, "added record");

    if ctx.output.is_human() {
        ui::success(&format!("Added {} {}", kind, label.bold()));
        ui::info("UUID", &uuid.to_string());
    } else {
        emit_success("add", serde_json::json!({ "kind": kind, "uuid": uuid, "label": label }))?;
    }
    Ok(())
}

pub fn run_update(ctx: &Context, command: UpdateCommand) -> anyhow::Result<()> {
    let store = ctx.open_store()?;

    let (kind, uuid) = match command {
        UpdateCommand::Brand { uuid, name, description } => {
            let id = resolve(&store, EntityKind::Brand, &uuid)?;
            let current = store
                .get_brand(id)?
                .ok_or_else(|| Error::NotFound(EntityKind::Brand, uuid.clone()))?;
            let fields = NewBrand::new(name.unwrap_or(current.name))
                .with_description(description.unwrap_or(current.description));
            store.update_brand(id, &fields)?;
            (EntityKind::Brand, uuid)
        }
        UpdateCommand::Category { uuid, name, description } => {
            let id = resolve(&store, EntityKind::Category, &uuid)?;
            let current = store
                .get_category(id)?
                .ok_or_else(|| Error::NotFound(EntityKind::Category, uuid.clone()))?;
            let fields = NewCategory::new(name.unwrap_or(current.name))
                .with_description(description.unwrap_or(current.description));
            store.update_category(id, &fields)?;
            (EntityKind::Category, uuid)
        }
        UpdateCommand::Product { uuid, name, price, description, thumbnail, category, brand, no_brand } => {
            let id = resolve(&store, EntityKind::Product, &uuid)?;
            let current = store
                .get_product(id)?
                .ok_or_else(|| Error::NotFound(EntityKind::Product, uuid.clone()))?;
            let mut fields = NewProduct::from(&current);
            if let Some(name) = name {
                fields.name = name;
            }
            if let Some(price) = price {
                fields.base_price = price::parse_price(&price)?;
            }
            if let Some(description) = description {
                fields.description = description;
            }
            if let Some(thumbnail) = thumbnail {
                fields.thumbnail = media::thumbnail_path(&thumbnail);
            }
            if let Some(category) = category {
                fields.category_id = resolve(&store, EntityKind::Category, &category)?;
            }
            if let Some(brand) = brand {
                fields.brand_id = Some(resolve(&store, EntityKind::Brand, &brand)?);
            } else if no_brand {
                fields.brand_id = None;
            }
            store.update_product(id, &fields)?;
            (EntityKind::Product, uuid)
        }
        UpdateCommand::Variant { uuid, sku, price, stock } => {
            let id = resolve(&store, EntityKind::Variant, &uuid)?;
            let current = store
                .get_variant(id)?
                .ok_or_else(|| Error::NotFound(EntityKind::Variant, uuid.clone()))?;
            let mut fields = NewVariant::from(&current);
            if let Some(sku) = sku {
                fields.sku = sku;
            }
            if let Some(price) = price {
                fields.price = price::parse_price(&price)?;
            }
            if let Some(stock) = stock {
                fields.stock = stock;
            }
            store.update_variant(id, &fields)?;
            (EntityKind::Variant, uuid)
        }
        UpdateCommand::Gallery { uuid, media: name } => {
            let id = resolve(&store, EntityKind::Gallery, &uuid)?;
            store.update_gallery(id, &media::gallery_path(&name))?;
            (EntityKind::Gallery, uuid)
        }
        UpdateCommand::Spec { uuid, name, value } => {
            let id = resolve(&store, EntityKind::Specification, &uuid)?;
            let current = store
                .get_specification(id)?
                .ok_or_else(|| Error::NotFound(EntityKind::Specification, uuid.clone()))?;
            store.update_specification(
                id,
                name.as_deref().unwrap_or(&current.name),
                value.as_deref().unwrap_or(&current.value),
            )?;
            (EntityKind::Specification, uuid)
        }
        UpdateCommand::AttributeType { uuid, name } => {
            let id = resolve(&store, EntityKind::AttributeType, &uuid)?;
            store.update_attribute_type(id, &name)?;
            (EntityKind::AttributeType, uuid)
        }
        UpdateCommand::AttributeOption { uuid, name } => {
            let id = resolve(&store, EntityKind::AttributeOption, &uuid)?;
            store.update_attribute_option(id, &name)?;
            (EntityKind::AttributeOption, uuid)
        }
    };

    tracing::info!(%kind, %uuid, "updated record");
    if ctx.output.is_human() {
        ui::success(&format!("Updated {} {}", kind, uuid));
    } else {
        emit_success("update", serde_json::json!({ "kind": kind, "uuid": uuid }))?;
    }
    Ok(())
}

pub fn run_delete(ctx: &Context, kind: &str, uuid: &str) -> anyhow::Result<()> {
    let kind: EntityKind = kind.parse()?;
    let store = ctx.open_store()?;
    let id = resolve(&store, kind, uuid)?;
    let label = store.label(kind, id)?.unwrap_or_default();

    let before = store.stats()?;
    store.delete(kind, id)?;
    let removed = before.removed_since(&store.stats()?);
    tracing::info!(%kind, %uuid, rows = removed.iter().map(|(_, n)| n).sum::<usize>(), "deleted record");

    if ctx.output.is_human() {
        ui::deleted(&format!("Deleted {} {}", kind, label.bold()));
        for (table_kind, n) in &removed {
            ui::summary_row(table_kind.table(), &n.to_string());
        }
    } else {
        let removed: serde_json::Map<_, _> = removed
            .iter()
            .map(|(k, n)| (k.table().to_string(), serde_json::Value::from(*n)))
            .collect();
        emit_success("delete", serde_json::json!({ "kind": kind, "uuid": uuid, "removed": removed }))?;
    }
    Ok(())
}

pub fn run_stats(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_reader()?;
    let stats = store.stats()?;

    if ctx.output.is_human() {
        println!("{} Catalog Statistics ({})", Icons::STATS, ctx.database.display());
        println!("{}", ui::stats_table(&stats));
    } else {
        emit_success("stats", stats.to_json())?;
    }
    Ok(())
}

pub fn run_schema(ctx: &Context) -> anyhow::Result<()> {
    let sdl = build_schema(StoreHandle::new(&ctx.database)).sdl();
    if ctx.output.is_human() {
        println!("{sdl}");
    } else {
        emit_success("schema", serde_json::json!({ "sdl": sdl }))?;
    }
    Ok(())
}

pub fn run_version(ctx: &Context) -> anyhow::Result<()> {
    if ctx.output.is_human() {
        println!(
            "{} {} {}",
            Icons::DATABASE,
            "catalog".style(ui::theme().header.clone()),
            env!("CARGO_PKG_VERSION").bold()
        );
    } else {
        emit_success("version", serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }))?;
    }
    Ok(())
}
