//! Command-line interface definitions for Story Harvest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every option can also be provided through a `HARVEST_*` environment
//! variable. Defaults reproduce a crawl of the archived RSVP success stories.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{DiscoveryConfig, ExtractionConfig, HarvestConfig};
use crate::scrapers::rsvp;

/// Command-line arguments for the Story Harvest application.
///
/// # Examples
///
/// ```sh
/// # Find story URLs, then extract them
/// story_harvest discover
/// story_harvest extract
///
/// # Keep state elsewhere and go easier on the archive
/// story_harvest --state-dir ./state --concurrency 4 extract --timeout-secs 10
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding storyUrls.json and stories.json
    #[arg(long, env = "HARVEST_STATE_DIR", default_value = ".", global = true)]
    pub state_dir: PathBuf,

    /// Maximum number of pages fetched at the same time
    #[arg(long, env = "HARVEST_CONCURRENCY", default_value_t = 12, global = true)]
    pub concurrency: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect story URLs from the listing pages
    Discover(DiscoverArgs),
    /// Extract every story URL not yet marked done
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Listing page URL, without the start parameter
    #[arg(long, env = "HARVEST_LISTING_URL", default_value = rsvp::LISTING_URL)]
    pub listing_url: String,

    /// Base URL story links are resolved against
    #[arg(long, env = "HARVEST_LINK_BASE", default_value = rsvp::LINK_BASE)]
    pub link_base: String,

    /// Number of stories the listing is expected to hold
    #[arg(long, env = "HARVEST_TARGET_STORIES", default_value_t = rsvp::TARGET_STORIES)]
    pub target_stories: usize,

    /// Stories per listing page
    #[arg(long, env = "HARVEST_PAGE_SIZE", default_value_t = rsvp::PAGE_SIZE)]
    pub page_size: usize,

    /// Give up on a listing page after this many seconds (waits forever if unset)
    #[arg(long, env = "HARVEST_LISTING_TIMEOUT_SECS")]
    pub listing_timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Give up on a story page or image after this many seconds
    #[arg(long, env = "HARVEST_TIMEOUT_SECS", default_value_t = 5)]
    pub timeout_secs: u64,

    /// Directory story images are written to
    #[arg(long, env = "HARVEST_IMAGES_DIR", default_value = "images")]
    pub images_dir: PathBuf,

    /// Public path prefix recorded for stored images
    #[arg(long, env = "HARVEST_IMAGE_PUBLISH_PREFIX", default_value = rsvp::IMAGE_PUBLISH_PREFIX)]
    pub image_publish_prefix: String,
}

impl Cli {
    pub fn harvest_config(&self) -> HarvestConfig {
        HarvestConfig {
            state_dir: self.state_dir.clone(),
            concurrency: self.concurrency,
        }
    }
}

impl From<&DiscoverArgs> for DiscoveryConfig {
    fn from(args: &DiscoverArgs) -> Self {
        Self {
            listing_url: args.listing_url.clone(),
            link_base: args.link_base.clone(),
            target_stories: args.target_stories,
            page_size: args.page_size,
            listing_timeout: args.listing_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl From<&ExtractArgs> for ExtractionConfig {
    fn from(args: &ExtractArgs) -> Self {
        Self {
            page_timeout: Duration::from_secs(args.timeout_secs),
            images_dir: args.images_dir.clone(),
            image_publish_prefix: args.image_publish_prefix.clone(),
        }
    }
}
