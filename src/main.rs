mod config;
mod error;
mod history;
mod logging;
mod models;
mod scrapers;
mod store;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use history::analytics::{self, HistoryFilter, Range};
use models::ListingStatus;
use scrapers::types::RunReport;
use scrapers::{
    ChromeSession, ConsolePrompt, HttpSession, NoPause, OperatorGate, PageSession,
    PaginationWalker,
};
use std::path::Path;
use store::{ListingStore, SqliteListingStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "immo-scout")]
#[command(about = "Scrapes rental listings and tracks when they appear and disappear")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Walk all result pages and record today's listings
    Scrape {
        #[arg(long, value_enum, default_value_t = Backend::Chrome)]
        session: Backend,

        #[arg(long, help = "Run Chrome without a window")]
        headless: bool,

        #[arg(long, help = "Do not wait for the operator before reading the first page")]
        no_pause: bool,

        #[arg(long, help = "Upper bound on result pages (overrides IMMO_MAX_PAGES)")]
        max_pages: Option<u32>,
    },

    /// Show one row per listing with first/last seen dates
    History {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long)]
        min_rooms: Option<f64>,
        #[arg(long)]
        max_rooms: Option<f64>,
        #[arg(long)]
        min_space: Option<f64>,
        #[arg(long)]
        max_space: Option<f64>,

        #[arg(long, help = "Case-insensitive address substring")]
        address: Option<String>,

        #[arg(long = "keyword", help = "Secondary criterion to match (repeatable)")]
        keywords: Vec<String>,

        #[arg(long, help = "Print JSON instead of a table")]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Chrome,
    Http,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Listed,
    Unlisted,
}

impl From<StatusArg> for ListingStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Listed => ListingStatus::Listed,
            StatusArg::Unlisted => ListingStatus::Unlisted,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    let _log_guard = logging::init_logging(&config.log_dir)?;

    match cli.command {
        Commands::Scrape {
            session,
            headless,
            no_pause,
            max_pages,
        } => {
            if let Some(max_pages) = max_pages {
                config.max_pages = max_pages;
            }
            scrape(&config, session, headless, no_pause).await
        }
        Commands::History {
            status,
            min_price,
            max_price,
            min_rooms,
            max_rooms,
            min_space,
            max_space,
            address,
            keywords,
            json,
        } => {
            let filter = HistoryFilter {
                rooms: Range {
                    min: min_rooms,
                    max: max_rooms,
                },
                living_space: Range {
                    min: min_space,
                    max: max_space,
                },
                price: Range {
                    min: min_price,
                    max: max_price,
                },
                address,
                keywords,
                status: status.map(ListingStatus::from),
            };
            show_history(&config, &filter, json).await
        }
    }
}

async fn scrape(config: &Config, backend: Backend, headless: bool, no_pause: bool) -> Result<()> {
    info!("🏠 Immo Scout - rental listing scraper");

    let store = SqliteListingStore::connect(&config.database_url)
        .await
        .context("Failed to open listing store")?;

    let gate: Box<dyn OperatorGate> = if no_pause {
        Box::new(NoPause)
    } else {
        Box::new(ConsolePrompt)
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current page (press Ctrl-C again to quit now)");
                cancel.cancel();
            }
            // A pending console prompt keeps the runtime alive until Enter
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });

    let run_date = Local::now().date_naive();
    let outcome = match backend {
        Backend::Chrome => match ChromeSession::launch(headless, config.page_timeout) {
            Ok(mut session) => {
                walk(&mut session, &store, &*gate, config, cancel, run_date).await
            }
            Err(e) => Err(e),
        },
        Backend::Http => match HttpSession::new(config.page_timeout) {
            Ok(mut session) => {
                walk(&mut session, &store, &*gate, config, cancel, run_date).await
            }
            Err(e) => Err(e),
        },
    };
    info!("Page session closed");

    store.close().await;
    info!("Database connection closed");

    let report = outcome?;
    print_report(&report);
    write_output(&config.output_json, &report).await?;

    if report.termination.is_failure() {
        anyhow::bail!("Scrape ended early: {:?}", report.termination);
    }
    Ok(())
}

async fn walk<S: PageSession>(
    session: &mut S,
    store: &SqliteListingStore,
    gate: &dyn OperatorGate,
    config: &Config,
    cancel: CancellationToken,
    run_date: NaiveDate,
) -> Result<RunReport> {
    let report = PaginationWalker::new(session, store, gate, config.walker())
        .with_cancellation(cancel)
        .run(run_date)
        .await?;
    Ok(report)
}

fn print_report(report: &RunReport) {
    for (i, listing) in report.observations.iter().enumerate() {
        println!("{}. {} ({:.2} €)", i + 1, listing.title, listing.price);
        println!(
            "   {} Zi., {} m²",
            display_number(listing.rooms),
            display_number(listing.living_space)
        );
        println!("   {}", listing.address);
        if !listing.secondary_criteria.is_empty() {
            println!("   Features: {}", listing.secondary_criteria);
        }
        println!("   ID: {}", listing.listing_id);
        println!("   URL: {}", listing.url);
        println!();
    }

    info!(
        "✅ {} listings on {} pages: {} new, {} already stored, {} skipped, {} store errors ({:?})",
        report.observations.len(),
        report.pages_visited,
        report.inserted,
        report.already_present,
        report.parse_failures,
        report.store_failures,
        report.termination
    );
}

async fn write_output(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(&report.observations)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("💾 Saved {} listings to {}", report.observations.len(), path.display());
    Ok(())
}

async fn show_history(config: &Config, filter: &HistoryFilter, json: bool) -> Result<()> {
    let store = SqliteListingStore::connect(&config.database_url)
        .await
        .context("Failed to open listing store")?;
    let loaded = match store.create_schema_if_absent().await {
        Ok(()) => history::load_history(&store).await,
        Err(e) => Err(e),
    };
    store.close().await;

    let mut rows = loaded.context("Failed to load listing history")?;
    rows.sort_by(|a, b| {
        b.latest_date
            .cmp(&a.latest_date)
            .then_with(|| a.listing_id.cmp(&b.listing_id))
    });
    let selected = filter.apply(&rows);
    let summary = analytics::summarize(&selected);

    if json {
        let output = serde_json::json!({
            "listings": selected,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Number of results: {}", selected.len());
    for row in &selected {
        println!(
            "{:<12} {:<8} {} .. {}  {:>9.2} €  {:>7} m²  {:>4} Zi.  {}",
            row.listing_id,
            row.status,
            row.listing_date,
            row.latest_date,
            row.price,
            display_number(row.living_space),
            display_number(row.rooms),
            row.title
        );
    }

    let keywords: Vec<_> = analytics::unique_keywords(&selected).into_iter().collect();
    if !keywords.is_empty() {
        println!("\nSecondary criteria: {}", keywords.join(", "));
    }

    println!();
    if let Some(price) = summary.mean_price {
        println!("Mean Price: {:.2} €", price);
    }
    if let Some(space) = summary.mean_living_space {
        println!("Mean Living Space: {:.2} m²", space);
    }
    if let Some(per_sqm) = summary.mean_price_per_sqm {
        println!("Mean Price per m²: {:.2} €/m²", per_sqm);
    }
    println!("Listed: {}, unlisted: {}", summary.listed, summary.unlisted);

    let listed: Vec<_> = selected
        .iter()
        .filter(|row| row.status == ListingStatus::Listed)
        .collect();
    if !listed.is_empty() {
        println!("\nLinks to listed properties:");
        for row in listed {
            println!("  {} - {}", row.title, row.url);
        }
    }

    Ok(())
}

fn display_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string())
}
