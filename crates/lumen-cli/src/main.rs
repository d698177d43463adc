mod cart;
mod catalog;
mod db;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{cart::CartCommands, catalog::CatalogCommands, db::DbCommands};

#[derive(Debug, Parser)]
#[command(name = "lumen-cli")]
#[command(about = "Lumen storefront command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Browse the product catalog and price wattage variants
    Catalog {
        /// Path to the catalog YAML file
        #[arg(long, env = "LUMEN_CATALOG_PATH", default_value = "./config/products.yaml")]
        catalog: PathBuf,
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Manage the locally stored cart
    Cart {
        /// Path to the catalog YAML file
        #[arg(long, env = "LUMEN_CATALOG_PATH", default_value = "./config/products.yaml")]
        catalog: PathBuf,
        /// Path to the local storage file holding the cart
        #[arg(long, env = "LUMEN_CART_PATH", default_value = "./.lumen/storage.json")]
        storage: PathBuf,
        #[command(subcommand)]
        command: CartCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Db { command }) => {
            let config = lumen_core::load_app_config()?;
            let pool_config = lumen_db::PoolConfig::from_app_config(&config);
            let pool = lumen_db::connect_pool(&config.database_url, pool_config).await?;
            match command {
                DbCommands::Ping => db::run_db_ping(&pool).await?,
                DbCommands::Migrate => db::run_db_migrate(&pool).await?,
                DbCommands::Seed => db::run_db_seed(&pool).await?,
            }
            pool.close().await;
        }
        Some(Commands::Catalog {
            catalog: catalog_path,
            command,
        }) => {
            let products = lumen_core::load_catalog(&catalog_path)?;
            print!("{}", catalog::run_catalog(&products, &command)?);
        }
        Some(Commands::Cart {
            catalog: catalog_path,
            storage,
            command,
        }) => {
            let products = lumen_core::load_catalog(&catalog_path)?;
            let mut carts = lumen_core::CartStore::new(cart::open_store(&storage)?);
            print!("{}", cart::run_cart(&mut carts, &products, &command)?);
        }
        None => println!("lumen-cli ready; run with --help for commands"),
    }

    Ok(())
}
