//! Extraction phase: turn pending story URLs into stories.
//!
//! Loads the URL map (required) and the story collection (optional), runs one
//! lane per URL still marked pending, and writes both files back once. A page
//! that fails at any step stays pending and is retried by the next run.

use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

use crate::assembler::{Assembler, Block, scan_article};
use crate::config::{ExtractionConfig, HarvestConfig};
use crate::coordinator::{Aggregator, Coordinator, Lane, Merge, PhaseReport};
use crate::error::Result;
use crate::extract::{Matcher, find_first, parse_document};
use crate::fetch::Fetch;
use crate::models::{CrawlState, StoryCollection, WorkResult};
use crate::outputs::images::ImageSink;
use crate::outputs::state::StateStore;
use crate::scrapers::rsvp;
use crate::utils::truncate_for_log;

struct ExtractionAggregator {
    store: StateStore,
    crawl_state: CrawlState,
    stories: StoryCollection,
}

impl Aggregator<WorkResult> for ExtractionAggregator {
    fn merge(&mut self, result: WorkResult) -> Merge {
        if result.failed {
            return Merge::Failed;
        }
        // Pages without a titled article would all collide on the empty key.
        if result.story.title.is_empty() {
            warn!(
                url = %result.source_url,
                "Page yielded no titled story; leaving it pending, so every later run fetches it again"
            );
            return Merge::Skipped;
        }

        let title = result.story.title.clone();
        if self.stories.insert(title.clone(), result.story).is_some() {
            debug!(%title, url = %result.source_url, "Replaced a story with the same title");
        }
        self.crawl_state.insert(result.source_url, true);
        Merge::Applied
    }

    async fn flush(&mut self) -> Result<()> {
        // Stories first: a flag must never point at a story that was not saved.
        self.store.save_stories(&self.stories).await?;
        self.store.save_crawl_state(&self.crawl_state).await
    }
}

/// Run the extraction phase over every URL still marked pending.
///
/// # Arguments
///
/// * `config` - State directory and lane count
/// * `extraction` - Page timeout, image directory and publish prefix
/// * `fetcher` - Source of story pages and images
/// * `sink` - Destination for downloaded images
///
/// # Returns
///
/// A [`PhaseReport`] with one received result per pending URL. When nothing
/// is pending the report is empty and no state file is written.
///
/// # Errors
///
/// Fails without writing anything if the URL map is missing or either state
/// file is malformed; fails after the lanes if the state cannot be saved.
/// Individual page failures are counted in the report.
#[instrument(level = "info", skip_all, fields(state_dir = %config.state_dir.display()))]
pub async fn run_extraction<F, S>(
    config: &HarvestConfig,
    extraction: &ExtractionConfig,
    fetcher: &F,
    sink: &S,
) -> Result<PhaseReport>
where
    F: Fetch,
    S: ImageSink,
{
    let store = StateStore::new(&config.state_dir);
    let crawl_state = store.load_crawl_state().await?;
    let stories = store.load_stories().await?;

    let pending = crawl_state
        .iter()
        .filter(|(_, done)| !**done)
        .map(|(url, _)| url.clone())
        .collect_vec();
    info!(
        urls = crawl_state.len(),
        pending = pending.len(),
        stories = stories.len(),
        "Loaded crawl state"
    );

    if pending.is_empty() {
        info!("Nothing left to extract");
        return Ok(PhaseReport::default());
    }

    let article = rsvp::article_matcher();
    let assembler = Assembler::new(fetcher, sink, &extraction.image_publish_prefix);
    let expected = pending.len();
    let aggregator = ExtractionAggregator {
        store,
        crawl_state,
        stories,
    };

    let (article, assembler) = (&article, &assembler);
    Coordinator::new(config.concurrency)
        .run(pending, expected, aggregator, |url, lane| {
            extract_story(fetcher, assembler, article, url, lane)
        })
        .await
}

#[instrument(level = "info", skip_all, fields(%url))]
async fn extract_story<F, S>(
    fetcher: &F,
    assembler: &Assembler<'_, F, S>,
    article: &Matcher,
    url: String,
    lane: Lane<WorkResult>,
) where
    F: Fetch,
    S: ImageSink,
{
    let result = match fetch_article_blocks(fetcher, &url, article).await {
        Ok(blocks) => assembler.assemble(&url, blocks).await,
        Err(e) => {
            warn!(error = %e, "Story page failed");
            WorkResult::failed(&url)
        }
    };

    if !result.failed {
        debug!(
            title = %result.story.title,
            summary = %truncate_for_log(&result.story.summary, 80),
            sections = result.story.sections.len(),
            "Extracted story"
        );
    }
    lane.emit(result).await;
}

async fn fetch_article_blocks<F: Fetch>(
    fetcher: &F,
    url: &str,
    article: &Matcher,
) -> Result<Option<Vec<Block>>> {
    let body = fetcher.fetch(url).await?;
    let document = parse_document(&body)?;
    Ok(find_first(document.root_element(), article).map(scan_article))
}
