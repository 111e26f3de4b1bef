//! Single-image download to a numbered file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::http_client::HttpClient;

/// Path of the raw asset with the given index. The extension is always `.jpg`.
pub fn asset_path(dest: &Path, index: usize) -> PathBuf {
    dest.join(format!("{index}.jpg"))
}

/// Retrieves one URL into `dest/<index>.jpg`.
///
/// Implementations must contain every failure: a failed fetch returns
/// `false` and leaves no file behind.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path, index: usize) -> bool;
}

/// Fetcher backed by the shared HTTP client.
#[derive(Clone)]
pub struct HttpImageFetcher {
    http: HttpClient,
}

impl HttpImageFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str, dest: &Path, index: usize) -> bool {
        let bytes = match self.http.get_bytes(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to download {}: {e}", truncate(url, 80));
                return false;
            }
        };

        let path = asset_path(dest, index);
        match tokio::fs::write(&path, &bytes).await {
            Ok(()) => {
                tracing::debug!("Saved {} ({} bytes)", path.display(), bytes.len());
                true
            }
            Err(e) => {
                tracing::warn!("Failed to write {}: {e}", path.display());
                let _ = tokio::fs::remove_file(&path).await;
                false
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
