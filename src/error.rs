//! Error taxonomy for the harvester.
//!
//! Failures fall in two groups. Transport, parse and sink failures happen
//! inside a worker lane; they are logged and turned into a failed result so
//! the page is retried on the next run. State failures happen while loading
//! or saving the resumable state and abort the phase.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, HarvestError>;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("could not parse markup: {0}")]
    Parse(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("could not write image {path:?}: {source}")]
    Sink {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("state file {path:?} not found; run the discovery phase first")]
    StateMissing { path: PathBuf },

    #[error("I/O error on state file {path:?}: {source}")]
    StateIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("state file {path:?} is malformed: {source}")]
    StateDecode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("could not encode state: {0}")]
    StateEncode(#[from] serde_json::Error),

    #[error("aggregator task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl HarvestError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_missing_message_names_path() {
        let err = HarvestError::StateMissing {
            path: PathBuf::from("state/storyUrls.json"),
        };
        let msg = err.to_string();
        assert!(msg.contains("storyUrls.json"));
        assert!(msg.contains("discovery"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = HarvestError::parse("invalid utf-8 sequence");
        assert_eq!(err.to_string(), "could not parse markup: invalid utf-8 sequence");
    }

    #[test]
    fn test_status_error_display() {
        let err = HarvestError::Status {
            url: "https://example.com/a".into(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "unexpected HTTP status 503 for https://example.com/a"
        );
    }
}
