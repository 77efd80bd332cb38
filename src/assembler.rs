//! Site rules that turn a story `<article>` into a [`Story`].
//!
//! Only the article's immediate children are considered, in document order:
//!
//! | Child | Effect |
//! |-------|--------|
//! | `<h1>`..`<h6>` | first text run becomes the title (a later heading wins) |
//! | `<img src>` | image is downloaded, stored, and gets its own section |
//! | text node | one paragraph entry; the first one is also the summary |
//!
//! Paragraph entries accumulate in a single section appended after the scan,
//! even when it is empty. A failed image download or write discards the whole
//! page so it is retried on the next run.
//!
//! Reading the tree and doing I/O are separate steps: [`scan_article`] copies
//! what it needs out of the parsed document into [`Block`]s, and
//! [`Assembler::assemble`] performs the downloads.

use scraper::{ElementRef, Node};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::Result;
use crate::fetch::Fetch;
use crate::models::{Content, Section, Story, WorkResult};
use crate::outputs::images::ImageSink;
use crate::utils::image_file_name;

/// One relevant child of a story article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Image(String),
    Text(String),
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Read the immediate children of `article` into blocks.
///
/// Whitespace-only text nodes (indentation between tags) are dropped; other
/// text is trimmed.
pub fn scan_article(article: ElementRef<'_>) -> Vec<Block> {
    let mut blocks = Vec::new();
    for child in article.children() {
        match child.value() {
            Node::Element(el) if is_heading(el.name()) => {
                let title = ElementRef::wrap(child)
                    .and_then(|heading| {
                        heading
                            .text()
                            .map(str::trim)
                            .find(|t| !t.is_empty())
                            .map(str::to_string)
                    })
                    .unwrap_or_default();
                blocks.push(Block::Heading(title));
            }
            Node::Element(el) if el.name() == "img" => {
                if let Some(src) = el.attr("src") {
                    blocks.push(Block::Image(src.to_string()));
                }
            }
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    blocks.push(Block::Text(text.to_string()));
                }
            }
            _ => {}
        }
    }
    blocks
}

/// Builds stories, downloading images through `fetcher` into `sink`.
#[derive(Debug)]
pub struct Assembler<'a, F, S> {
    fetcher: &'a F,
    sink: &'a S,
    publish_prefix: &'a str,
}

impl<'a, F, S> Assembler<'a, F, S>
where
    F: Fetch,
    S: ImageSink,
{
    /// `publish_prefix` is the public path under which stored images are
    /// served, e.g. `/images/dating-hub/success-stories`.
    pub fn new(fetcher: &'a F, sink: &'a S, publish_prefix: &'a str) -> Self {
        Self {
            fetcher,
            sink,
            publish_prefix,
        }
    }

    /// Produce the single result for one story page.
    ///
    /// `blocks` is `None` when the page had no article; that yields an empty
    /// story that is *not* marked failed.
    #[instrument(level = "debug", skip(self, blocks))]
    pub async fn assemble(&self, page_url: &str, blocks: Option<Vec<Block>>) -> WorkResult {
        let Some(blocks) = blocks else {
            debug!("No article container on page");
            return WorkResult::extracted(page_url, Story::default());
        };

        match self.build_story(page_url, blocks).await {
            Ok(story) => WorkResult::extracted(page_url, story),
            Err(e) => {
                warn!(error = %e, url = page_url, "Image step failed; discarding page");
                WorkResult::failed(page_url)
            }
        }
    }

    async fn build_story(&self, page_url: &str, blocks: Vec<Block>) -> Result<Story> {
        let mut story = Story::default();
        let mut paragraphs = Section::default();

        for block in blocks {
            match block {
                Block::Heading(title) => story.title = title,
                Block::Image(src) => {
                    let section = self.store_image(page_url, &src, &story.title).await?;
                    story.sections.push(section);
                }
                Block::Text(text) => {
                    if story.summary.is_empty() {
                        story.summary = text.clone();
                    }
                    paragraphs.content.push(Content::paragraph(text));
                }
            }
        }

        story.sections.push(paragraphs);
        Ok(story)
    }

    async fn store_image(&self, page_url: &str, src: &str, title: &str) -> Result<Section> {
        let image_url = Url::parse(page_url)?.join(src)?;
        let bytes = self.fetcher.fetch(image_url.as_str()).await?;

        let file_name = image_file_name(title);
        self.sink.write(&file_name, &bytes).await?;
        debug!(%image_url, %file_name, "Stored story image");

        let published = format!("{}/{}", self.publish_prefix.trim_end_matches('/'), file_name);
        Ok(Section {
            anchor: String::new(),
            content: vec![Content::image(published)],
        })
    }
}
