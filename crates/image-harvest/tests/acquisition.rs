//! Acquisition integration tests: cascade across sources and a full
//! listing-to-disk run against a mock server.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use image_harvest::acquisition::{
    asset_path, AcquisitionController, HttpClient, HttpImageFetcher, ImageFetcher,
    PicjumboListing, ScrapeAdapter, SourceAdapter,
};
use image_harvest::progress::{self, ProgressEvent};
use image_harvest::types::{Query, SourceResult};

// ─────────────────────── helpers ───────────────────────

/// Adapter that writes up to `supply` placeholder files and records its quotas.
struct FixedAdapter {
    name: &'static str,
    supply: usize,
    quotas: Arc<Mutex<Vec<usize>>>,
}

impl FixedAdapter {
    fn boxed(name: &'static str, supply: usize) -> (Box<dyn SourceAdapter>, Arc<Mutex<Vec<usize>>>) {
        let quotas = Arc::new(Mutex::new(Vec::new()));
        let adapter = FixedAdapter {
            name,
            supply,
            quotas: quotas.clone(),
        };
        (Box::new(adapter), quotas)
    }
}

#[async_trait]
impl SourceAdapter for FixedAdapter {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, _query: &Query, quota: usize, dest: &Path, start_index: usize) -> SourceResult {
        self.quotas.lock().unwrap().push(quota);
        let n = self.supply.min(quota);
        for i in 0..n {
            std::fs::write(asset_path(dest, start_index + i), self.name).unwrap();
        }
        SourceResult {
            source_name: self.name.to_string(),
            urls: (0..self.supply).map(|i| format!("https://{}/{i}", self.name)).collect(),
            saved_count: n,
        }
    }
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(6, 6, image::Rgb([200, 40, 40]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn listing_html(base: &str, names: &[&str]) -> String {
    let items: String = names
        .iter()
        .map(|n| format!(r#"<picture><img class="image" src="{base}/img/{n}.jpg"></picture>"#))
        .collect();
    format!("<html><body><div class=\"grid\">{items}<picture><img class=\"image avatar\" src=\"{base}/img/avatar.jpg\"></picture></div></body></html>")
}

// ─────────────────────── cascade ───────────────────────

#[tokio::test]
async fn test_fallback_requests_only_the_shortfall() {
    let dir = tempfile::tempdir().unwrap();
    let (a, a_quotas) = FixedAdapter::boxed("a", 6);
    let (b, b_quotas) = FixedAdapter::boxed("b", 50);
    let (c, c_quotas) = FixedAdapter::boxed("c", 50);

    let controller = AcquisitionController::new(vec![a, b, c]);
    let query = Query::new("red panda", 10).unwrap();
    let report = controller.acquire_into(&query, dir.path()).await;

    assert_eq!(report.obtained, 10);
    assert!(report.is_complete());
    assert_eq!(*a_quotas.lock().unwrap(), vec![10]);
    assert_eq!(*b_quotas.lock().unwrap(), vec![4]);
    assert!(c_quotas.lock().unwrap().is_empty());
    assert_eq!(report.sources.len(), 2);

    // Indexes continue across sources without gaps.
    for i in 1..=6 {
        assert_eq!(std::fs::read_to_string(asset_path(dir.path(), i)).unwrap(), "a");
    }
    for i in 7..=10 {
        assert_eq!(std::fs::read_to_string(asset_path(dir.path(), i)).unwrap(), "b");
    }
    assert!(!asset_path(dir.path(), 11).exists());
}

#[tokio::test]
async fn test_all_sources_short_is_partial_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let (a, _) = FixedAdapter::boxed("a", 0);
    let (b, _) = FixedAdapter::boxed("b", 2);
    let (c, c_quotas) = FixedAdapter::boxed("c", 1);

    let report = AcquisitionController::new(vec![a, b, c])
        .acquire(&Query::new("rare", 5).unwrap(), dir.path())
        .await
        .unwrap();

    assert_eq!(report.obtained, 3);
    assert!(!report.is_complete());
    assert_eq!(*c_quotas.lock().unwrap(), vec![3]);
    assert_eq!(report.folder, dir.path().join("images_rare"));
    assert!(asset_path(&report.folder, 3).exists());
}

#[tokio::test]
async fn test_query_cannot_escape_output_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("out");
    let (a, _) = FixedAdapter::boxed("a", 1);

    let report = AcquisitionController::new(vec![a])
        .acquire(&Query::new("x/../../escaped", 1).unwrap(), &root)
        .await
        .unwrap();

    let folder = report.folder.canonicalize().unwrap();
    assert_eq!(folder.parent(), Some(root.canonicalize().unwrap().as_path()));
    assert!(asset_path(&folder, 1).exists());
    assert!(!dir.path().join("escaped").exists());
}

#[tokio::test]
async fn test_first_source_satisfies_quota() {
    let dir = tempfile::tempdir().unwrap();
    let (a, _) = FixedAdapter::boxed("a", 20);
    let (b, b_quotas) = FixedAdapter::boxed("b", 20);

    let (tx, mut rx) = progress::channel();
    let report = AcquisitionController::new(vec![a, b])
        .with_progress(Some(tx))
        .acquire_into(&Query::new("x", 5).unwrap(), dir.path())
        .await;

    assert_eq!(report.obtained, 5);
    assert!(b_quotas.lock().unwrap().is_empty());
    assert!(matches!(
        rx.try_recv().unwrap(),
        ProgressEvent::SourceStarted { quota: 5, .. }
    ));
}

// ─────────────────────── end to end over HTTP ───────────────────────

#[tokio::test]
async fn test_picjumbo_listing_to_disk() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/search/red-panda/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_html(&base, &["one", "two", "broken", "three"])),
        )
        .mount(&server)
        .await;
    for name in ["one", "two", "three"] {
        Mock::given(method("GET"))
            .and(path(format!("/img/{name}.jpg")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/img/broken.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let http = HttpClient::new(2_000, "test-agent");
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(HttpImageFetcher::new(http.clone()));
    let adapter = ScrapeAdapter::new(
        Box::new(PicjumboListing::with_base_url(&base, 5)),
        http,
        fetcher,
    );

    let dir = tempfile::tempdir().unwrap();
    let query = Query::new("Red Panda", 10).unwrap();
    let result = adapter.fetch(&query, 10, dir.path(), 1).await;

    assert_eq!(result.source_name, "picjumbo");
    assert_eq!(result.urls.len(), 4);
    assert_eq!(result.saved_count, 3);
    // Assets are always named .jpg; decode by content like the batch runner.
    for i in 1..=3 {
        let bytes = std::fs::read(asset_path(dir.path(), i)).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.width(), 6);
    }
    assert!(!asset_path(dir.path(), 4).exists());
}

#[tokio::test]
async fn test_unreachable_source_yields_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let http = HttpClient::new(1_000, "test-agent");
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(HttpImageFetcher::new(http.clone()));
    let adapter = ScrapeAdapter::new(
        Box::new(PicjumboListing::with_base_url(&server.uri(), 2)),
        http,
        fetcher,
    );

    let dir = tempfile::tempdir().unwrap();
    let result = adapter
        .fetch(&Query::new("cats", 3).unwrap(), 3, dir.path(), 1)
        .await;

    assert_eq!(result.saved_count, 0);
    assert!(result.urls.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
