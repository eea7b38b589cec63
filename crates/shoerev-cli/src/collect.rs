//! Collection command handlers for the CLI.
//!
//! Per-shoe and per-kind failures never fail the command; they show up in the
//! printed report. Only configuration and database bootstrap errors propagate.

use std::sync::Arc;

use shoerev_collector::{CollectOptions, CollectPolicy, Collector};
use shoerev_core::{AppConfig, RunReportEntry, SourceKind};
use shoerev_db::PgStore;
use shoerev_sources::{AdapterRegistry, SourcesConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

/// Parse a `--sources` value into distinct kinds.
///
/// # Errors
///
/// Returns an error for unknown kinds or an empty list.
pub(crate) fn parse_sources(raw: &str) -> anyhow::Result<Vec<SourceKind>> {
    let kinds = SourceKind::parse_list(raw)?;
    if kinds.is_empty() {
        anyhow::bail!("--sources must name at least one of: video, social");
    }
    Ok(kinds)
}

fn build_collector(pool: sqlx::PgPool, config: &AppConfig) -> anyhow::Result<Collector<PgStore>> {
    let registry = AdapterRegistry::from_config(&SourcesConfig::from_app_config(config))
        .map_err(|e| anyhow::anyhow!("failed to build source adapters: {e}"))?;
    let names = registry.adapter_names();
    if names.is_empty() {
        tracing::warn!("no source credentials configured; every kind will be skipped");
    } else {
        tracing::info!(adapters = ?names, "source adapters ready");
    }

    let store = Arc::new(PgStore::new(pool));
    Ok(Collector::new(
        store,
        registry,
        CollectPolicy::from_app_config(config),
    ))
}

pub(crate) async fn run_collect(
    pool: sqlx::PgPool,
    config: &AppConfig,
    shoe_id: i64,
    kinds: &[SourceKind],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let collector = build_collector(pool, config)?;
    let report = collector.collect(shoe_id, kinds).await;
    print_report(&report, format)
}

pub(crate) async fn run_collect_all(
    pool: sqlx::PgPool,
    config: &AppConfig,
    limit: usize,
    kinds: &[SourceKind],
    skip_collected: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let collector = build_collector(pool, config)?;
    let reports = collector
        .collect_all(limit, kinds, CollectOptions { skip_collected })
        .await
        .map_err(|e| anyhow::anyhow!("failed to list shoes: {e}"))?;

    if reports.is_empty() {
        println!("no shoes in the catalog; run `shoerev-cli shoes import` first");
        return Ok(());
    }

    let entries: Vec<RunReportEntry> = reports.into_values().flatten().collect();
    print_report(&entries, format)
}

/// Print the platforms (and optionally the mentions) stored for a shoe.
pub(crate) async fn run_sources(
    pool: &sqlx::PgPool,
    shoe_id: i64,
    with_mentions: bool,
) -> anyhow::Result<()> {
    let sources = shoerev_db::list_collected_sources(pool, shoe_id).await?;
    if sources.is_empty() {
        println!("shoe {shoe_id}: no mentions collected yet");
        return Ok(());
    }

    let names: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
    println!("shoe {shoe_id}: {}", names.join(", "));

    if with_mentions {
        for row in shoerev_db::list_mentions_for_shoe(pool, shoe_id).await? {
            let published = row
                .published_at
                .map_or_else(|| "-".to_string(), |p| p.format("%Y-%m-%d").to_string());
            println!(
                "  {:<14} {:<10} {:<20} {}",
                row.source,
                published,
                truncate(&row.author, 20),
                row.url
            );
        }
    }
    Ok(())
}

fn print_report(entries: &[RunReportEntry], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entries)?),
        OutputFormat::Table => {
            for line in report_table(entries) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn report_table(entries: &[RunReportEntry]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:>6}  {:<7} {:<8} {:>5} {:>4} {:>4} {:>4} {:>4} {:>8}  {}",
        "shoe", "kind", "status", "items", "new", "upd", "same", "drop", "ms", "cause"
    )];
    for e in entries {
        lines.push(format!(
            "{:>6}  {:<7} {:<8} {:>5} {:>4} {:>4} {:>4} {:>4} {:>8}  {}",
            e.shoe_id,
            e.kind.as_str(),
            e.status.as_str(),
            e.item_count,
            e.inserted,
            e.updated,
            e.unchanged,
            e.dropped,
            e.duration.as_millis(),
            e.error.as_deref().unwrap_or("")
        ));
    }
    lines
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
