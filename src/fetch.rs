//! HTTP fetching behind a small trait.
//!
//! The phases are generic over [`Fetch`] so they can be driven by the real
//! [`HttpFetcher`] or by an in-memory fake. Every failure (transport error,
//! timeout, non-2xx status) is reported the same way: as an `Err`.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::{HarvestError, Result};

const USER_AGENT: &str = concat!("story_harvest/", env!("CARGO_PKG_VERSION"));

/// Something that can turn a URL into response bytes.
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`Fetch`] implementation backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher. With `timeout` set, a request that does not complete
    /// in time fails like any other transport error.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Fetched");
        Ok(body.to_vec())
    }
}
