//! In-memory collaborators for tests.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{HarvestError, Result};
use crate::fetch::Fetch;
use crate::outputs::images::ImageSink;

/// Serves canned responses; any URL it does not know fails with a 404.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    pages: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetch for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        // Let other lanes interleave like real I/O would.
        tokio::task::yield_now().await;
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| HarvestError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Image sink whose every write fails, like a full or read-only disk.
#[derive(Debug, Default)]
pub struct FailingImageSink;

impl ImageSink for FailingImageSink {
    async fn write(&self, file_name: &str, _bytes: &[u8]) -> Result<()> {
        Err(HarvestError::Sink {
            path: PathBuf::from(file_name),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}
