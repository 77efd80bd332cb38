//! Image sink for story pictures.
//!
//! Files land in one flat directory, named after the story slug. A second
//! story with the same slug replaces the first file.

use std::path::PathBuf;
#[cfg(test)]
use std::{collections::HashMap, sync::Mutex};

use tokio::fs;
use tracing::{debug, instrument};

use crate::error::{HarvestError, Result};

/// Destination for downloaded image bytes.
pub trait ImageSink {
    async fn write(&self, file_name: &str, bytes: &[u8]) -> Result<()>;
}

/// Writes images into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirImageSink {
    dir: PathBuf,
}

impl DirImageSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ImageSink for DirImageSink {
    #[instrument(level = "debug", skip(self, bytes), fields(dir = %self.dir.display()))]
    async fn write(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| HarvestError::Sink {
                path: self.dir.clone(),
                source,
            })?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes)
            .await
            .map_err(|source| HarvestError::Sink { path, source })?;
        debug!(bytes = bytes.len(), "Wrote image");
        Ok(())
    }
}

/// Keeps images in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryImageSink {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

#[cfg(test)]
impl MemoryImageSink {
    pub fn get(&self, file_name: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .ok()
            .and_then(|files| files.get(file_name).cloned())
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }
}

#[cfg(test)]
impl ImageSink for MemoryImageSink {
    async fn write(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        if let Ok(mut files) = self.files.lock() {
            files.insert(file_name.to_string(), bytes.to_vec());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dir_sink_creates_directory_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("images");
        let sink = DirImageSink::new(&dir);

        sink.write("Jane-&-John.jpg", b"first").await.unwrap();
        sink.write("Jane-&-John.jpg", b"second").await.unwrap();

        let stored = std::fs::read(dir.join("Jane-&-John.jpg")).unwrap();
        assert_eq!(stored, b"second");
    }

    #[tokio::test]
    async fn test_dir_sink_reports_sink_failure() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the directory should be.
        let blocker = tmp.path().join("images");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let err = DirImageSink::new(&blocker)
            .write("a.jpg", b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Sink { .. }));
    }

    #[tokio::test]
    async fn test_memory_sink_last_writer_wins() {
        let sink = MemoryImageSink::default();
        sink.write("a.jpg", b"1").await.unwrap();
        sink.write("a.jpg", b"2").await.unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get("a.jpg"), Some(b"2".to_vec()));
    }
}
