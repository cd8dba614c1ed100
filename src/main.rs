//! Catalog CLI - manage a product catalog and serve it over GraphQL

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use catalog::config;
use catalog::output::OutputMode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{AddCommand, Context, UpdateCommand};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(version)]
#[command(about = "Product catalog store with a read-only GraphQL query service")]
#[command(long_about = r#"
Catalog keeps brands, categories, products and their variants in SQLite
and serves them through a read-only GraphQL endpoint.

Example usage:
  catalog init
  catalog add category Phones
  catalog add product "Galaxy S21" --price 699.00 --category <uuid>
  catalog serve --port 8000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file (defaults to ./catalog.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Serve the GraphQL query service over HTTP
    Serve {
        /// Address to bind (defaults to 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to 8000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List all brands
    Brands,

    /// List all categories
    Categories,

    /// List all products with their brand and category
    Products,

    /// Show one product with its gallery, specifications and variants
    Show {
        /// Product UUID
        uuid: String,
    },

    /// Add a record
    Add {
        #[command(subcommand)]
        entity: AddCommand,
    },

    /// Update a record
    Update {
        #[command(subcommand)]
        entity: UpdateCommand,
    },

    /// Delete a record and everything that depends on it
    Delete {
        /// Entity kind (brand, category, product, gallery, spec, attribute-type, ...)
        kind: String,

        /// Record UUID
        uuid: String,
    },

    /// Show row counts per table
    Stats,

    /// Print the GraphQL schema (SDL)
    Schema,

    /// Print version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output = OutputMode::from_flag(cli.json);
    match run(cli, output) {
        Ok(()) => Ok(()),
        Err(err) if output.is_human() => {
            catalog::ui::error(&format!("{err:#}"));
            std::process::exit(1);
        }
        Err(err) => Err(err),
    }
}

fn run(cli: Cli, output: OutputMode) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let loaded = config::load_config(Some(&config_path))?;
    if loaded.is_some() {
        tracing::debug!(path = %config_path.display(), "loaded config");
    }
    let config = loaded.unwrap_or_default();

    let base = config::config_base(&config_path);
    let database = config.database_path(cli.database.as_deref(), &base);

    let ctx = Context {
        output,
        config,
        config_path,
        base,
        database,
    };

    match cli.command {
        Commands::Init { force } => commands::run_init(&ctx, force),
        Commands::Serve { host, port } => commands::run_serve(&ctx, host, port),
        Commands::Brands => commands::run_brands(&ctx),
        Commands::Categories => commands::run_categories(&ctx),
        Commands::Products => commands::run_products(&ctx),
        Commands::Show { uuid } => commands::run_show(&ctx, &uuid),
        Commands::Add { entity } => commands::run_add(&ctx, entity),
        Commands::Update { entity } => commands::run_update(&ctx, entity),
        Commands::Delete { kind, uuid } => commands::run_delete(&ctx, &kind, &uuid),
        Commands::Stats => commands::run_stats(&ctx),
        Commands::Schema => commands::run_schema(&ctx),
        Commands::Version => commands::run_version(&ctx),
    }
}
