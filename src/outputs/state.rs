//! Resumable crawl state stored as JSON.
//!
//! Two files live in the state directory:
//! ```text
//! state_dir/
//! ├── storyUrls.json   # CrawlState: story URL -> extracted flag
//! └── stories.json     # StoryCollection: title -> story
//! ```
//!
//! Both are flat JSON objects. They are read once when a phase starts and
//! written once when it ends. Writes go to a sibling `.tmp` file that is then
//! renamed over the target, so an interrupted save keeps the previous file.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::{HarvestError, Result};
use crate::models::{CrawlState, StoryCollection};

pub const CRAWL_STATE_FILE: &str = "storyUrls.json";
pub const STORIES_FILE: &str = "stories.json";

/// Location of the two state files.
#[derive(Debug, Clone)]
pub struct StateStore {
    crawl_state_path: PathBuf,
    stories_path: PathBuf,
}

impl StateStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        let dir = state_dir.as_ref();
        Self {
            crawl_state_path: dir.join(CRAWL_STATE_FILE),
            stories_path: dir.join(STORIES_FILE),
        }
    }

    pub fn crawl_state_path(&self) -> &Path {
        &self.crawl_state_path
    }

    pub fn stories_path(&self) -> &Path {
        &self.stories_path
    }

    /// Load the URL map. Extraction cannot run without it, so a missing file
    /// is an error.
    #[instrument(level = "info", skip_all, fields(path = %self.crawl_state_path().display()))]
    pub async fn load_crawl_state(&self) -> Result<CrawlState> {
        read_json(&self.crawl_state_path)
            .await?
            .ok_or_else(|| HarvestError::StateMissing {
                path: self.crawl_state_path.clone(),
            })
    }

    /// Load the URL map, treating a missing file as an empty map. Discovery
    /// uses this to merge into whatever an earlier run left behind.
    pub async fn load_crawl_state_or_default(&self) -> Result<CrawlState> {
        Ok(read_json(&self.crawl_state_path).await?.unwrap_or_default())
    }

    /// Load the story map. A missing file means this is the first run.
    #[instrument(level = "info", skip_all, fields(path = %self.stories_path().display()))]
    pub async fn load_stories(&self) -> Result<StoryCollection> {
        match read_json(&self.stories_path).await? {
            Some(stories) => Ok(stories),
            None => {
                info!("No story file yet; starting with an empty collection");
                Ok(StoryCollection::new())
            }
        }
    }

    pub async fn save_crawl_state(&self, state: &CrawlState) -> Result<()> {
        write_json(&self.crawl_state_path, state).await?;
        info!(path = %self.crawl_state_path.display(), urls = state.len(), "Saved crawl state");
        Ok(())
    }

    pub async fn save_stories(&self, stories: &StoryCollection) -> Result<()> {
        write_json(&self.stories_path, stories).await?;
        info!(path = %self.stories_path.display(), stories = stories.len(), "Saved stories");
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(HarvestError::StateIo {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| HarvestError::StateDecode {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec(value)?;
    let io_err = |source| HarvestError::StateIo {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).await.map_err(io_err)?;
    fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}
