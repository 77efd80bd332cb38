//! Archived RSVP success-stories scraper rules.
//!
//! The testimonials live on a Wayback Machine snapshot of
//! `rsvp.com.au/online+dating/testimonials.jsp`. Listing pages are paged with
//! a `start` query parameter, ten stories per page. Each listing page holds a
//! `<ul class="ui-extracts SS">` whose `<li>` items link to a story page, and
//! each story page carries its content in an `<article>`.
//!
//! # URL Pattern
//!
//! Story links on the snapshot are root-relative (`/web/2022.../story.jsp`)
//! and are resolved against `https://web.archive.org/`.

use scraper::ElementRef;
use tracing::debug;
use url::Url;

use crate::extract::{Matcher, find_all};

pub const LISTING_URL: &str = "https://web.archive.org/web/20220303193220/https://www.rsvp.com.au/online+dating/testimonials.jsp";
pub const LINK_BASE: &str = "https://web.archive.org/";
pub const TARGET_STORIES: usize = 60;
pub const PAGE_SIZE: usize = 10;
pub const IMAGE_PUBLISH_PREFIX: &str = "/images/dating-hub/success-stories";

/// Container holding the story links on a listing page.
pub fn listing_matcher() -> Matcher {
    Matcher::tag("ul").with_attr("class", "ui-extracts SS")
}

/// Container holding a story's content on a story page.
pub fn article_matcher() -> Matcher {
    Matcher::tag("article")
}

/// Listing page URLs needed to cover `target_stories` at `page_size` per
/// page: `{listing_url}?start=0`, `?start=10`, ...
pub fn listing_urls(listing_url: &str, target_stories: usize, page_size: usize) -> Vec<String> {
    let page_size = page_size.max(1);
    (0..target_stories.div_ceil(page_size))
        .map(|page| format!("{listing_url}?start={}", page * page_size))
        .collect()
}

/// Story links inside every listing container under `root`.
///
/// For each direct `<li>` child of a container, the `href` of its last
/// direct `<a>` child is taken. Items without a link are skipped, as are
/// hrefs that cannot be resolved against `link_base`.
///
/// # Arguments
///
/// * `root` - Root element of a parsed listing page
/// * `listing` - Matcher for the link containers
/// * `link_base` - Base URL that relative hrefs are joined to
///
/// # Returns
///
/// Absolute story URLs in document order.
pub fn story_links(root: ElementRef<'_>, listing: &Matcher, link_base: &Url) -> Vec<String> {
    let mut links = Vec::new();
    for container in find_all(root, listing) {
        for item in container.children().filter_map(ElementRef::wrap) {
            if item.value().name() != "li" {
                continue;
            }
            let href = item
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|child| child.value().name() == "a")
                .last()
                .and_then(|a| a.value().attr("href"));

            match href.map(|h| link_base.join(h)) {
                Some(Ok(url)) => links.push(url.to_string()),
                Some(Err(e)) => debug!(error = %e, "Skipping unresolvable story link"),
                None => debug!("Listing item without a link"),
            }
        }
    }
    links
}
