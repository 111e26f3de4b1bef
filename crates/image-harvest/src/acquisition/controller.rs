//! Cascading acquisition across a priority-ordered list of sources.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::HarvestConfig;
use crate::progress::{self, ProgressEvent, ProgressSender};
use crate::types::{AcquisitionReport, HarvestResult, Query, SourceResult};

use super::adapter::{ScrapeAdapter, SourceAdapter};
use super::fetcher::{HttpImageFetcher, ImageFetcher};
use super::http_client::HttpClient;

/// Running totals threaded through the adapter fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tally {
    remaining: usize,
    next_index: usize,
}

impl Tally {
    fn after(self, saved: usize) -> Self {
        let saved = saved.min(self.remaining);
        Self {
            remaining: self.remaining - saved,
            next_index: self.next_index + saved,
        }
    }
}

/// Calls each adapter in turn with the current shortfall until the quota
/// is met or every adapter has been tried once.
pub struct AcquisitionController {
    adapters: Vec<Box<dyn SourceAdapter>>,
    progress: Option<ProgressSender>,
}

impl AcquisitionController {
    pub fn new(adapters: Vec<Box<dyn SourceAdapter>>) -> Self {
        Self {
            adapters,
            progress: None,
        }
    }

    /// Build the configured sources over one shared HTTP client.
    pub fn from_config(config: &HarvestConfig, progress: Option<ProgressSender>) -> Self {
        let http = HttpClient::new(config.http_timeout_ms, &config.user_agent);
        let fetcher: Arc<dyn ImageFetcher> = Arc::new(HttpImageFetcher::new(http.clone()));

        let adapters = config
            .sources
            .iter()
            .map(|kind| {
                Box::new(
                    ScrapeAdapter::new(kind.listing(config), http.clone(), fetcher.clone())
                        .with_progress(progress.clone()),
                ) as Box<dyn SourceAdapter>
            })
            .collect();

        Self::new(adapters).with_progress(progress)
    }

    pub fn with_progress(mut self, tx: Option<ProgressSender>) -> Self {
        self.progress = tx;
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Acquire `query.requested_count` images into `dest`, which must exist.
    ///
    /// Partial success is not an error: the report carries whatever count
    /// the sources could supply.
    pub async fn acquire_into(&self, query: &Query, dest: &Path) -> AcquisitionReport {
        let mut tally = Tally {
            remaining: query.requested_count,
            next_index: 1,
        };
        let mut sources: Vec<SourceResult> = Vec::new();

        for adapter in &self.adapters {
            if tally.remaining == 0 {
                break;
            }

            tracing::info!(
                "Trying {} for '{}' ({} still needed, starting at #{})",
                adapter.name(),
                query.text,
                tally.remaining,
                tally.next_index
            );
            progress::emit(
                &self.progress,
                ProgressEvent::SourceStarted {
                    source: adapter.name().to_string(),
                    quota: tally.remaining,
                },
            );

            let result = adapter
                .fetch(query, tally.remaining, dest, tally.next_index)
                .await;
            if result.saved_count > tally.remaining {
                tracing::warn!(
                    "{} reported {} saved for a quota of {}",
                    adapter.name(),
                    result.saved_count,
                    tally.remaining
                );
            }
            tally = tally.after(result.saved_count);

            progress::emit(
                &self.progress,
                ProgressEvent::SourceFinished {
                    source: result.source_name.clone(),
                    saved: result.saved_count,
                },
            );
            sources.push(result);
        }

        let obtained = query.requested_count - tally.remaining;
        if tally.remaining > 0 {
            tracing::warn!(
                "Sources exhausted: obtained {obtained} of {} image(s) for '{}'",
                query.requested_count,
                query.text
            );
        } else {
            tracing::info!("Obtained all {obtained} image(s) for '{}'", query.text);
        }

        AcquisitionReport {
            folder: dest.to_path_buf(),
            requested: query.requested_count,
            obtained,
            sources,
        }
    }

    /// Acquire into `<output_root>/images_<query>`, creating the folder.
    pub async fn acquire(&self, query: &Query, output_root: &Path) -> HarvestResult<AcquisitionReport> {
        let dest = acquisition_folder(output_root, query);
        tokio::fs::create_dir_all(&dest).await?;
        Ok(self.acquire_into(query, &dest).await)
    }
}

/// Destination folder for a query's raw images.
pub fn acquisition_folder(output_root: &Path, query: &Query) -> PathBuf {
    output_root.join(query.folder_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_threads_index() {
        let t = Tally {
            remaining: 10,
            next_index: 1,
        };
        let t = t.after(6);
        assert_eq!(
            t,
            Tally {
                remaining: 4,
                next_index: 7
            }
        );
        let t = t.after(9);
        assert_eq!(
            t,
            Tally {
                remaining: 0,
                next_index: 11
            }
        );
    }

    #[test]
    fn test_from_config_uses_priority_order() {
        let mut config = HarvestConfig::default();
        config.sources = vec![
            crate::acquisition::SourceKind::Yahoo,
            crate::acquisition::SourceKind::Picjumbo,
        ];
        let controller = AcquisitionController::from_config(&config, None);
        assert_eq!(controller.source_names(), vec!["yahoo", "picjumbo"]);
    }

    #[test]
    fn test_acquisition_folder() {
        let q = Query::new("snow leopard", 3).unwrap();
        assert_eq!(
            acquisition_folder(Path::new("/tmp/out"), &q),
            PathBuf::from("/tmp/out/images_snow_leopard")
        );
    }
}
