//! Async HTTP client wrapping reqwest.
//!
//! Not a browser: plain GET requests with a desktop user agent, a bounded
//! timeout, a redirect limit and a small retry budget for 5xx responses.

use std::time::Duration;

use crate::types::{HarvestError, HarvestResult};

/// Retries on 5xx before giving up.
const MAX_RETRIES: u32 = 2;

/// HTTP client shared by listing discovery and image downloads.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client with the given per-request timeout and user agent.
    pub fn new(timeout_ms: u64, user_agent: &str) -> Self {
        let timeout = Duration::from_millis(timeout_ms);
        let client = match reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("HTTP client config rejected ({e}), using reqwest defaults");
                reqwest::Client::default()
            }
        };

        Self { client, timeout }
    }

    /// GET a page body as text. Non-2xx statuses are errors.
    pub async fn get_text(&self, url: &str) -> HarvestResult<String> {
        let resp = self.send(url).await?;
        Ok(resp.text().await?)
    }

    /// GET a body as raw bytes. Non-2xx statuses are errors.
    pub async fn get_bytes(&self, url: &str) -> HarvestResult<Vec<u8>> {
        let resp = self.send(url).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn send(&self, url: &str) -> HarvestResult<reqwest::Response> {
        let mut retries = 0u32;

        loop {
            let resp = self.client.get(url).timeout(self.timeout).send().await?;
            let status = resp.status().as_u16();

            if status >= 500 && retries < MAX_RETRIES {
                retries += 1;
                let delay = Duration::from_millis(250 * 2u64.pow(retries - 1));
                tracing::debug!("{url} returned {status}, retry {retries} in {delay:?}");
                tokio::time::sleep(delay).await;
                continue;
            }

            if !resp.status().is_success() {
                return Err(HarvestError::Status {
                    url: url.to_string(),
                    status,
                });
            }

            return Ok(resp);
        }
    }
}
