//! Discovery phase: collect story URLs from the paginated listing.
//!
//! One lane per listing page. A lane emits one [`DiscoveryResult::Found`] per
//! story link, or a single [`DiscoveryResult::ListingFailed`]. URLs are merged
//! into the existing crawl state with insert-if-absent semantics, so running
//! discovery again never resets a story that was already extracted.

use std::collections::btree_map::Entry;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{DiscoveryConfig, HarvestConfig};
use crate::coordinator::{Aggregator, Coordinator, Lane, Merge, PhaseReport};
use crate::error::Result;
use crate::extract::{Matcher, parse_document};
use crate::fetch::Fetch;
use crate::models::{CrawlState, DiscoveryResult};
use crate::outputs::state::StateStore;
use crate::scrapers::rsvp;

struct DiscoveryAggregator {
    store: StateStore,
    crawl_state: CrawlState,
}

impl Aggregator<DiscoveryResult> for DiscoveryAggregator {
    fn merge(&mut self, result: DiscoveryResult) -> Merge {
        match result {
            DiscoveryResult::Found(url) => match self.crawl_state.entry(url) {
                Entry::Vacant(slot) => {
                    slot.insert(false);
                    Merge::Applied
                }
                Entry::Occupied(known) => {
                    debug!(url = %known.key(), "Story URL already known");
                    Merge::Skipped
                }
            },
            DiscoveryResult::ListingFailed(page_url) => {
                debug!(%page_url, "Listing page yielded nothing");
                Merge::UnitFailed
            }
        }
    }

    async fn flush(&mut self) -> Result<()> {
        self.store.save_crawl_state(&self.crawl_state).await
    }
}

/// Run the discovery phase and persist the URL map.
///
/// # Arguments
///
/// * `config` - State directory and lane count
/// * `discovery` - Listing URL, link base, paging and target story count
/// * `fetcher` - Source of listing pages
///
/// # Returns
///
/// A [`PhaseReport`] where `received` counts story links, `succeeded` the
/// newly recorded URLs, `skipped` the URLs already known and `failed_units`
/// the listing pages that could not be read.
///
/// # Errors
///
/// Fails before any lane starts if the existing URL map is corrupt or the
/// link base is not a valid URL, and after the lanes if the map cannot be
/// written. Listing pages that cannot be fetched are counted, not fatal.
#[instrument(level = "info", skip_all, fields(listing_url = %discovery.listing_url))]
pub async fn run_discovery<F: Fetch>(
    config: &HarvestConfig,
    discovery: &DiscoveryConfig,
    fetcher: &F,
) -> Result<PhaseReport> {
    let store = StateStore::new(&config.state_dir);
    let crawl_state = store.load_crawl_state_or_default().await?;
    let link_base = Url::parse(&discovery.link_base)?;
    let listing = rsvp::listing_matcher();

    let pages = rsvp::listing_urls(
        &discovery.listing_url,
        discovery.target_stories,
        discovery.page_size,
    );
    info!(
        pages = pages.len(),
        target_stories = discovery.target_stories,
        known_urls = crawl_state.len(),
        "Starting discovery"
    );

    let aggregator = DiscoveryAggregator { store, crawl_state };
    let (listing, link_base) = (&listing, &link_base);
    Coordinator::new(config.concurrency)
        .run(pages, discovery.target_stories, aggregator, |page_url, lane| {
            index_listing(fetcher, page_url, listing, link_base, lane)
        })
        .await
}

#[instrument(level = "info", skip_all, fields(%page_url))]
async fn index_listing<F: Fetch>(
    fetcher: &F,
    page_url: String,
    listing: &Matcher,
    link_base: &Url,
    lane: Lane<DiscoveryResult>,
) {
    match fetch_story_links(fetcher, &page_url, listing, link_base).await {
        Ok(links) => {
            info!(count = links.len(), "Indexed story URLs");
            for link in links {
                lane.emit(DiscoveryResult::Found(link)).await;
            }
        }
        Err(e) => {
            warn!(error = %e, "Listing page failed");
            lane.emit(DiscoveryResult::ListingFailed(page_url)).await;
        }
    }
}

async fn fetch_story_links<F: Fetch>(
    fetcher: &F,
    page_url: &str,
    listing: &Matcher,
    link_base: &Url,
) -> Result<Vec<String>> {
    let body = fetcher.fetch(page_url).await?;
    let document = parse_document(&body)?;
    Ok(rsvp::story_links(document.root_element(), listing, link_base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvestError;
    use crate::testing::FakeFetcher;

    const LISTING: &str = "https://archive.test/testimonials.jsp";
    const BASE: &str = "https://archive.test/";

    fn listing_page(slugs: &[&str]) -> String {
        let items: String = slugs
            .iter()
            .map(|s| format!(r#"<li><a href="/web/1/{s}.jsp">{s}</a></li>"#))
            .collect();
        format!(r#"<html><body><ul class="ui-extracts SS">{items}</ul></body></html>"#)
    }

    fn discovery(target_stories: usize) -> DiscoveryConfig {
        DiscoveryConfig {
            listing_url: LISTING.to_string(),
            link_base: BASE.to_string(),
            target_stories,
            page_size: 2,
            listing_timeout: None,
        }
    }

    fn config(dir: &std::path::Path) -> HarvestConfig {
        HarvestConfig {
            state_dir: dir.to_path_buf(),
            concurrency: 4,
        }
    }

    #[tokio::test]
    async fn test_discovery_records_every_link_as_pending() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default()
            .with_page(&format!("{LISTING}?start=0"), listing_page(&["a", "b"]))
            .with_page(&format!("{LISTING}?start=2"), listing_page(&["c", "d"]));

        let report = run_discovery(&config(tmp.path()), &discovery(4), &fetcher)
            .await
            .unwrap();
        assert_eq!(report.units, 2);
        assert_eq!(report.received, 4);
        assert_eq!(report.succeeded, 4);

        let state = StateStore::new(tmp.path()).load_crawl_state().await.unwrap();
        assert_eq!(state.len(), 4);
        assert!(state.values().all(|done| !done));
        assert!(state.contains_key("https://archive.test/web/1/c.jsp"));
    }

    #[tokio::test]
    async fn test_fewer_links_than_target_still_completes() {
        let tmp = tempfile::tempdir().unwrap();
        // Second listing page is short and the third one is missing.
        let fetcher = FakeFetcher::default()
            .with_page(&format!("{LISTING}?start=0"), listing_page(&["a", "b"]))
            .with_page(&format!("{LISTING}?start=2"), listing_page(&["c"]));

        let report = run_discovery(&config(tmp.path()), &discovery(6), &fetcher)
            .await
            .unwrap();
        assert_eq!(report.units, 3);
        assert_eq!(report.expected, 6);
        assert_eq!(report.received, 3);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.failed_units, 1);

        let state = StateStore::new(tmp.path()).load_crawl_state().await.unwrap();
        assert_eq!(state.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_listing_pages_are_not_counted_as_links() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default();

        let report = run_discovery(&config(tmp.path()), &discovery(6), &fetcher)
            .await
            .unwrap();
        assert_eq!(report.units, 3);
        assert_eq!(report.expected, 6);
        assert_eq!(report.received, 0);
        assert_eq!(report.failed_units, 3);
        assert_eq!(fetcher.requests().len(), 3);

        let state = StateStore::new(tmp.path()).load_crawl_state().await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_more_links_than_target_are_all_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default()
            .with_page(&format!("{LISTING}?start=0"), listing_page(&["a", "b", "c", "d", "e"]));

        let report = run_discovery(&config(tmp.path()), &discovery(2), &fetcher)
            .await
            .unwrap();
        assert_eq!(report.received, 5);

        let state = StateStore::new(tmp.path()).load_crawl_state().await.unwrap();
        assert_eq!(state.len(), 5);
    }

    #[tokio::test]
    async fn test_rerun_never_resets_completed_urls() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path());
        let mut existing = CrawlState::new();
        existing.insert("https://archive.test/web/1/a.jsp".to_string(), true);
        store.save_crawl_state(&existing).await.unwrap();

        let fetcher = FakeFetcher::default()
            .with_page(&format!("{LISTING}?start=0"), listing_page(&["a", "b"]));
        let report = run_discovery(&config(tmp.path()), &discovery(2), &fetcher)
            .await
            .unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 1);

        let state = store.load_crawl_state().await.unwrap();
        assert_eq!(state.get("https://archive.test/web/1/a.jsp"), Some(&true));
        assert_eq!(state.get("https://archive.test/web/1/b.jsp"), Some(&false));
    }

    #[tokio::test]
    async fn test_corrupt_existing_state_aborts_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path());
        std::fs::write(store.crawl_state_path(), b"not json").unwrap();

        let fetcher = FakeFetcher::default();
        let err = run_discovery(&config(tmp.path()), &discovery(2), &fetcher)
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::StateDecode { .. }));
        assert!(fetcher.requests().is_empty());
        assert_eq!(std::fs::read(store.crawl_state_path()).unwrap(), b"not json");
    }
}
