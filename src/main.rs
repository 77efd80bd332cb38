//! # Story Harvest
//!
//! A resumable crawler that collects testimonial stories from an archived
//! dating site and stores them as structured JSON, together with one image
//! per story.
//!
//! ## Usage
//!
//! ```sh
//! story_harvest discover
//! story_harvest extract
//! ```
//!
//! ## Architecture
//!
//! The crawl runs in two phases, each on its own invocation:
//! 1. **Discovery**: page through the listing and record every story URL as
//!    pending in `storyUrls.json`
//! 2. **Extraction**: fetch every pending story page, extract its title,
//!    summary, paragraphs and image, and record it in `stories.json`
//!
//! Both phases fan out over a bounded pool of concurrent lanes and funnel
//! their results into a single aggregating task, which writes the state once
//! the phase is over. Extraction only touches pages still pending, so it can
//! be rerun until everything is done.

use std::error::Error;

use clap::Parser;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod assembler;
mod cli;
mod config;
mod coordinator;
mod error;
mod extract;
mod fetch;
mod models;
mod outputs;
mod phases;
mod scrapers;
#[cfg(test)]
mod testing;
mod utils;

use cli::{Cli, Command};
use config::{DiscoveryConfig, ExtractionConfig};
use fetch::HttpFetcher;
use outputs::images::DirImageSink;
use phases::{discovery::run_discovery, extraction::run_extraction};
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
    info!("story_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");
    let harvest = args.harvest_config();

    let report = match &args.command {
        Command::Discover(discover_args) => {
            let discovery = DiscoveryConfig::from(discover_args);
            let fetcher = HttpFetcher::new(discovery.listing_timeout)?;
            run_discovery(&harvest, &discovery, &fetcher).await
        }
        Command::Extract(extract_args) => {
            let extraction = ExtractionConfig::from(extract_args);
            if let Err(e) = ensure_writable_dir(&extraction.images_dir).await {
                error!(
                    path = %extraction.images_dir.display(),
                    error = %e,
                    "Images directory is not writable (fix perms or choose a different path)"
                );
                return Err(e);
            }
            let fetcher = HttpFetcher::new(Some(extraction.page_timeout))?;
            let sink = DirImageSink::new(&extraction.images_dir);
            run_extraction(&harvest, &extraction, &fetcher, &sink).await
        }
    };

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Phase aborted; state left as it was");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        attempted = report.units,
        expected = report.expected,
        received = report.received,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        failed_units = report.failed_units,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
