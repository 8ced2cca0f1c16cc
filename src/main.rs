use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

mod analyzer;
mod config;
mod database;
mod directories;
mod fetch;
mod html;
mod models;
mod pipeline;
mod registry;
mod scoring;
mod table;
mod traits;

use config::Config;
use database::Database;
use models::Business;
use pipeline::LeadPipeline;
use scoring::ScoringWeights;
use table::{REQUIRED_COLUMNS, WEBSITE_LOOKUP_COLUMNS};
use traits::PageFetcher;

#[derive(Parser)]
#[command(name = "lead-finder")]
#[command(about = "Scrape, enrich and prioritize local business leads")]
struct Cli {
    /// Fetch pages through a WebDriver browser session instead of plain HTTP
    #[arg(long, global = true)]
    browser: bool,

    /// Ignore cached lookups and re-process rows that were already enriched
    #[arg(long, global = true)]
    fresh: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape directory listings for every configured category
    Scrape {
        #[arg(long, default_value = "businesses.csv")]
        output: PathBuf,
    },
    /// Look businesses up in the corporation registry and build the call list
    Score {
        #[arg(long, default_value = "businesses.csv")]
        input: PathBuf,
        #[arg(long, default_value = "prioritized_call_list.csv")]
        output: PathBuf,
        /// JSON file overriding the default scoring weights
        #[arg(long)]
        weights: Option<PathBuf>,
        /// Only process the first N rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Find each business's website through its directory listing
    Websites {
        #[arg(long, default_value = "prioritized_call_list.csv")]
        input: PathBuf,
        #[arg(long, default_value = "enriched_businesses.csv")]
        output: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Sort the list by name for manual review
    Review {
        #[arg(long, default_value = "enriched_businesses.csv")]
        input: PathBuf,
        #[arg(long, default_value = "sorted_businesses_for_review.csv")]
        output: PathBuf,
    },
    /// De-duplicate the reviewed list into the final call list
    Finalize {
        #[arg(long, default_value = "sorted_businesses_for_review.csv")]
        input: PathBuf,
        #[arg(long, default_value = "final_call_list.csv")]
        output: PathBuf,
    },
    /// Analyze business websites for contacts, emails and technology
    Analyze {
        #[arg(long, default_value = "final_call_list.csv")]
        input: PathBuf,
        #[arg(long, default_value = "fully_enriched_call_list.csv")]
        output: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Review { input, output } => {
            let mut rows = table::read_businesses(&input, REQUIRED_COLUMNS)?;
            info!("Sorting data alphabetically by business name...");
            table::sort_for_review(&mut rows);
            table::write_businesses(&output, &rows)?;
            info!("Done. {} is ready for manual review.", output.display());
            Ok(())
        }
        Commands::Finalize { input, output } => {
            let rows = table::read_businesses(&input, REQUIRED_COLUMNS)?;
            info!("Starting with {} businesses after manual review", rows.len());
            let rows = table::finalize(rows);
            table::write_businesses(&output, &rows)?;
            info!(
                "Final call list with {} businesses is ready in {}",
                rows.len(),
                output.display()
            );
            Ok(())
        }
        command => {
            let fetcher = open_fetcher(&config, cli.browser).await?;
            let database = Database::new(&config.database_url).await?;
            let pipeline = LeadPipeline::new(config, fetcher.clone(), database, cli.fresh);

            let result = run_network_stage(&pipeline, command).await;

            if let Err(e) = fetcher.shutdown().await {
                error!("Failed to close fetcher: {:#}", e);
            }

            result
        }
    }
}

async fn run_network_stage(pipeline: &LeadPipeline, command: Commands) -> Result<()> {
    match command {
        Commands::Scrape { output } => {
            let businesses = pipeline.scrape_listings().await?;
            if !businesses.is_empty() {
                table::write_businesses(&output, &businesses)?;
            }
        }
        Commands::Score {
            input,
            output,
            weights,
            limit,
        } => {
            let weights = match weights {
                Some(path) => ScoringWeights::from_file(&path)?,
                None => ScoringWeights::default(),
            };
            let rows = load_rows(&input, REQUIRED_COLUMNS, limit)?;
            let rows = pipeline.score_businesses(rows, &weights).await?;
            table::write_businesses(&output, &rows)?;
        }
        Commands::Websites {
            input,
            output,
            limit,
        } => {
            let mut rows = load_rows(&input, WEBSITE_LOOKUP_COLUMNS, limit)?;
            pipeline.find_websites(&mut rows).await?;
            table::write_businesses(&output, &rows)?;
        }
        Commands::Analyze {
            input,
            output,
            limit,
        } => {
            let mut rows = load_rows(&input, REQUIRED_COLUMNS, limit)?;
            pipeline.analyze_websites(&mut rows).await?;
            table::write_businesses(&output, &rows)?;
        }
        Commands::Review { .. } | Commands::Finalize { .. } => {}
    }

    Ok(())
}

fn load_rows(input: &Path, required: &[&str], limit: Option<usize>) -> Result<Vec<Business>> {
    let mut rows = table::read_businesses(input, required)?;

    if let Some(limit) = limit {
        info!("--- RUNNING IN TEST MODE: Processing first {} records ---", limit);
        rows.truncate(limit);
    }

    Ok(rows)
}

async fn open_fetcher(config: &Config, browser: bool) -> Result<Arc<dyn PageFetcher>> {
    if browser {
        #[cfg(feature = "browser")]
        {
            return Ok(Arc::new(fetch::BrowserFetcher::launch(config).await?));
        }

        #[cfg(not(feature = "browser"))]
        {
            anyhow::bail!("--browser needs a build with the `browser` feature enabled");
        }
    }

    Ok(Arc::new(fetch::HttpFetcher::new(config)?))
}
