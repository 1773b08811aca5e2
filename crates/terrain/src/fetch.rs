//! HTTP fetching of terrain assets.

use crate::error::{Error, Result};

/// Downloads raw terrain buffers.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    http: reqwest::Client,
}

impl Fetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, headers).
    #[must_use]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetch the full body at `url`.
    ///
    /// Non-success status codes are reported as [`Error::Status`].
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("GET {url}");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
