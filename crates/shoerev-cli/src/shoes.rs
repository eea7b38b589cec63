//! Shoe catalog commands.

use clap::Subcommand;
use shoerev_core::AppConfig;

/// Sub-commands available under `shoes`.
#[derive(Debug, Subcommand)]
pub enum ShoesCommands {
    /// List the newest shoes in the catalog
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Upsert shoes from the catalog YAML file
    Import {
        /// Catalog file; defaults to SHOEREV_SHOES_PATH
        #[arg(long)]
        path: Option<std::path::PathBuf>,
    },
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: ShoesCommands,
) -> anyhow::Result<()> {
    match command {
        ShoesCommands::List { limit } => {
            let shoes = shoerev_db::list_shoes(pool, limit).await?;
            if shoes.is_empty() {
                println!("catalog is empty; run `shoerev-cli shoes import`");
                return Ok(());
            }
            for shoe in shoes {
                println!(
                    "{:>6}  {:<14} {:<28} {}",
                    shoe.id,
                    shoe.brand,
                    shoe.model_name,
                    shoe.category.as_deref().unwrap_or("-")
                );
            }
        }
        ShoesCommands::Import { path } => {
            let path = path.unwrap_or_else(|| config.shoes_path.clone());
            let file = shoerev_core::load_shoes(&path)?;
            let count = shoerev_db::seed_shoes(pool, &file.shoes).await?;
            tracing::info!(count, path = %path.display(), "shoe catalog imported");
            println!("imported {count} shoes from {}", path.display());
        }
    }
    Ok(())
}
