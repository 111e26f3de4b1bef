//! Source adapters: discovery plus download for one external source.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::progress::{self, ProgressEvent, ProgressSender};
use crate::types::{Query, SourceResult};

use super::discovery::{discover, Listing};
use super::fetcher::ImageFetcher;
use super::http_client::HttpClient;

/// One external image source.
///
/// `fetch` saves at most `quota` images as `dest/<n>.jpg` with `n` counting
/// up from `start_index` without gaps. Source failures are contained: an
/// unreachable source yields a result with `saved_count == 0`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(
        &self,
        query: &Query,
        quota: usize,
        dest: &Path,
        start_index: usize,
    ) -> SourceResult;
}

/// Adapter that discovers URLs by walking a listing over HTTP.
pub struct ScrapeAdapter {
    listing: Box<dyn Listing>,
    http: HttpClient,
    fetcher: Arc<dyn ImageFetcher>,
    progress: Option<ProgressSender>,
}

impl ScrapeAdapter {
    pub fn new(listing: Box<dyn Listing>, http: HttpClient, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            listing,
            http,
            fetcher,
            progress: None,
        }
    }

    pub fn with_progress(mut self, tx: Option<ProgressSender>) -> Self {
        self.progress = tx;
        self
    }
}

#[async_trait]
impl SourceAdapter for ScrapeAdapter {
    fn name(&self) -> &str {
        self.listing.name()
    }

    async fn fetch(
        &self,
        query: &Query,
        quota: usize,
        dest: &Path,
        start_index: usize,
    ) -> SourceResult {
        let name = self.listing.name();
        if quota == 0 {
            return SourceResult::empty(name);
        }

        let urls = discover(self.listing.as_ref(), &self.http, query, quota).await;
        progress::emit(
            &self.progress,
            ProgressEvent::UrlsDiscovered {
                source: name.to_string(),
                count: urls.len(),
            },
        );

        if urls.is_empty() {
            tracing::info!("{name}: no images found for '{}'", query.text);
            return SourceResult::empty(name);
        }

        let saved = download_all(
            name,
            self.fetcher.as_ref(),
            &urls,
            quota,
            dest,
            start_index,
            &self.progress,
        )
        .await;

        tracing::info!("{name}: saved {saved} of {} URL(s)", urls.len().min(quota));
        SourceResult {
            source_name: name.to_string(),
            urls,
            saved_count: saved,
        }
    }
}

/// Download the first `quota` URLs in order. Only successful downloads
/// consume an index.
pub async fn download_all(
    source: &str,
    fetcher: &dyn ImageFetcher,
    urls: &[String],
    quota: usize,
    dest: &Path,
    start_index: usize,
    tx: &Option<ProgressSender>,
) -> usize {
    let mut saved = 0;
    for url in urls.iter().take(quota) {
        let index = start_index + saved;
        if fetcher.fetch(url, dest, index).await {
            saved += 1;
            progress::emit(
                tx,
                ProgressEvent::ImageSaved {
                    source: source.to_string(),
                    index,
                },
            );
        } else {
            progress::emit(
                tx,
                ProgressEvent::DownloadFailed {
                    source: source.to_string(),
                    url: url.clone(),
                },
            );
        }
    }
    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records calls and fails any URL containing "bad".
    struct RecordingFetcher {
        calls: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl ImageFetcher for RecordingFetcher {
        async fn fetch(&self, url: &str, _dest: &Path, index: usize) -> bool {
            self.calls.lock().unwrap().push((url.to_string(), index));
            !url.contains("bad")
        }
    }

    #[tokio::test]
    async fn test_failed_download_does_not_consume_index() {
        let fetcher = RecordingFetcher {
            calls: Mutex::new(Vec::new()),
        };
        let urls: Vec<String> = ["a", "bad", "c"].iter().map(|s| s.to_string()).collect();
        let dir = tempfile::tempdir().unwrap();

        let saved = download_all("test", &fetcher, &urls, 3, dir.path(), 5, &None).await;

        assert_eq!(saved, 2);
        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("a".to_string(), 5),
                ("bad".to_string(), 6),
                ("c".to_string(), 6)
            ]
        );
    }

    #[tokio::test]
    async fn test_download_respects_quota() {
        let fetcher = RecordingFetcher {
            calls: Mutex::new(Vec::new()),
        };
        let urls: Vec<String> = (0..10).map(|i| format!("u{i}")).collect();
        let dir = tempfile::tempdir().unwrap();

        let saved = download_all("test", &fetcher, &urls, 4, dir.path(), 1, &None).await;
        assert_eq!(saved, 4);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 4);
    }
}
