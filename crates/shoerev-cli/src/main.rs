mod collect;
mod shoes;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::collect::OutputFormat;
use crate::shoes::ShoesCommands;

const DEFAULT_SOURCES: &str = "video,social";

#[derive(Debug, Parser)]
#[command(name = "shoerev-cli")]
#[command(about = "Collect review mentions for running shoes from video and social sources")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect mentions for one shoe
    Collect {
        /// Catalog id of the shoe
        shoe_id: i64,

        /// Comma-separated source kinds (video, social)
        #[arg(long, default_value = DEFAULT_SOURCES)]
        sources: String,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Collect mentions for the newest shoes in the catalog
    CollectAll {
        /// How many of the newest shoes to process
        #[arg(long, default_value_t = 5)]
        limit: usize,

        /// Comma-separated source kinds (video, social)
        #[arg(long, default_value = DEFAULT_SOURCES)]
        sources: String,

        /// Skip source kinds that already have stored mentions
        #[arg(long)]
        skip_collected: bool,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Show which platforms already have mentions for a shoe
    Sources {
        /// Catalog id of the shoe
        shoe_id: i64,

        /// Also list the stored mentions
        #[arg(long)]
        mentions: bool,
    },
    /// Shoe catalog commands
    Shoes {
        #[command(subcommand)]
        command: ShoesCommands,
    },
    /// Print effective configuration and configured adapters
    Config,
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("shoerev-cli: no command given, see --help");
        return Ok(());
    };

    let config = shoerev_core::load_app_config()?;
    let pool = connect(&config).await?;

    match command {
        Commands::Collect {
            shoe_id,
            sources,
            format,
        } => {
            let kinds = collect::parse_sources(&sources)?;
            collect::run_collect(pool, &config, shoe_id, &kinds, format).await?;
        }
        Commands::CollectAll {
            limit,
            sources,
            skip_collected,
            format,
        } => {
            let kinds = collect::parse_sources(&sources)?;
            collect::run_collect_all(pool, &config, limit, &kinds, skip_collected, format).await?;
        }
        Commands::Sources { shoe_id, mentions } => {
            collect::run_sources(&pool, shoe_id, mentions).await?;
        }
        Commands::Shoes { command } => shoes::run(&pool, &config, command).await?,
        Commands::Config => run_config(&pool, &config).await,
        Commands::Migrate => {
            let applied = shoerev_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `SHOEREV_LOG_LEVEL`, otherwise `info`.
fn init_tracing() {
    let fallback = std::env::var("SHOEREV_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn connect(config: &shoerev_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool = shoerev_db::connect_pool(
        &config.database_url,
        shoerev_db::PoolConfig::from_app_config(config),
    )
    .await
    .map_err(|e| anyhow::anyhow!("failed to connect to database: {e}"))?;
    Ok(pool)
}

async fn run_config(pool: &sqlx::PgPool, config: &shoerev_core::AppConfig) {
    println!("environment:        {}", config.env);
    println!("shoes file:         {}", config.shoes_path.display());
    println!(
        "max shoes/sources:  {}/{}",
        config.max_concurrent_shoes, config.max_concurrent_sources
    );
    println!(
        "retries:            {} (base {} ms)",
        config.max_retries, config.retry_backoff_base_ms
    );
    println!(
        "timeouts:           call {}s, run {}s, http {}s",
        config.call_timeout_secs, config.run_deadline_secs, config.http_timeout_secs
    );
    println!("request delay:      {} ms", config.inter_request_delay_ms);
    println!();
    println!("credentials:");
    for (name, present) in config.credential_status() {
        println!("  {name:<24} {}", if present { "set" } else { "missing" });
    }

    let sources = shoerev_sources::SourcesConfig::from_app_config(config);
    match shoerev_sources::AdapterRegistry::from_config(&sources) {
        Ok(registry) => {
            let names = registry.adapter_names();
            if names.is_empty() {
                println!("adapters:           none (every kind will be skipped)");
            } else {
                println!("adapters:           {}", names.join(", "));
            }
        }
        Err(e) => println!("adapters:           unavailable ({e})"),
    }

    match shoerev_db::mention_stats(pool).await {
        Ok(stats) => {
            println!();
            println!("shoes:              {}", stats.shoes);
            println!("mentions:           {}", stats.mentions);
            for (source, count) in stats.by_source {
                println!("  {source:<24} {count}");
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not read mention counts"),
    }
}

#[cfg(test)]
mod tests;
