//! # VN Disaster News
//!
//! Collects Vietnamese disaster news (floods, storms, landslides, earthquakes,
//! droughts) from a whitelist of trusted outlets, has an LLM normalize the
//! article text into structured events, and writes a JSON feed for the
//! dashboard.
//!
//! ## Usage
//!
//! ```sh
//! vn_disaster_news -j ./json
//! ```
//!
//! ## Architecture
//!
//! One run is a forward-only pipeline:
//! 1. **Resolving**: Pick a crawl entry point for each trusted domain
//! 2. **Discovery**: Map each site concurrently for article links
//! 3. **Fetching**: Batch-scrape the links for main-content markdown
//! 4. **Extraction**: One structured-output request to the model
//! 5. **Reconciliation**: Validate the answer and join it back to the articles
//!
//! An empty run, or a run without both API keys, falls back to the built-in
//! sample events, and the feed is marked accordingly.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod classifier;
mod cli;
mod config;
mod discovery;
mod error;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod prompter;
mod reconciler;
mod samples;
mod scrapers;
mod sources;
mod utils;

use cli::Cli;
use config::{Credentials, PipelineConfig, load_config};
use models::{DashboardFeed, Provenance};
use outputs::json;
use pipeline::LivePipeline;
use samples::sample_events;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("vn_disaster_news starting up");

    let args = Cli::parse();
    debug!(?args.json_output_dir, ?args.config, ?args.mode, "Parsed CLI arguments");

    // Early check: ensure JSON output dir is writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let feed = if args.sample_only {
        info!("Sample-only run requested");
        DashboardFeed::from_run(Vec::new(), sample_events)
    } else {
        let mut config = match &args.config {
            Some(path) => load_config(path).await?,
            None => PipelineConfig::default(),
        };
        if let Some(mode) = args.mode {
            config.mode = mode;
        }

        let credentials = Credentials::new(
            args.firecrawl_api_key.clone(),
            args.gemini_api_key
                .clone()
                .or_else(|| std::env::var("API_KEY").ok()),
        );

        let pipeline = LivePipeline::from_config(&credentials, config)?;
        info!(available = pipeline.is_available(), "Pipeline ready");
        let events = pipeline.run().await;
        DashboardFeed::from_run(events, sample_events)
    };

    if feed.provenance == Provenance::Sample && !args.sample_only {
        warn!("No live events this run (missing API keys or no news found); showing sample data");
    }

    json::write_feed(&feed, &args.json_output_dir).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        provenance = ?feed.provenance,
        events = feed.events.len(),
        "Execution complete"
    );

    Ok(())
}
