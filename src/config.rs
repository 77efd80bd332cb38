//! Runtime settings consumed by the phases.
//!
//! The CLI fills these in; tests build them directly.

use std::path::PathBuf;
use std::time::Duration;

use crate::scrapers::rsvp;

/// Settings shared by both phases.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Directory holding `storyUrls.json` and `stories.json`.
    pub state_dir: PathBuf,
    /// Lanes allowed in flight per phase.
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Listing page URL without the `start` parameter.
    pub listing_url: String,
    /// Base against which story links are resolved.
    pub link_base: String,
    /// Number of stories the listing is expected to yield.
    pub target_stories: usize,
    /// Stories per listing page.
    pub page_size: usize,
    /// Listing fetches wait indefinitely when unset.
    pub listing_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Bound on each story page and image fetch.
    pub page_timeout: Duration,
    pub images_dir: PathBuf,
    /// Public path prefix written into image content entries.
    pub image_publish_prefix: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(5),
            images_dir: PathBuf::from("images"),
            image_publish_prefix: rsvp::IMAGE_PUBLISH_PREFIX.to_string(),
        }
    }
}
