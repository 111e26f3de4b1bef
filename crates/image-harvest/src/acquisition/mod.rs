//! Multi-source image acquisition with fallback.

pub mod adapter;
pub mod controller;
pub mod discovery;
pub mod fetcher;
pub mod http_client;
pub mod sources;

pub use adapter::{ScrapeAdapter, SourceAdapter};
pub use controller::{acquisition_folder, AcquisitionController};
pub use discovery::{discover, normalize_url, Discovery, DiscoveryState, Listing, ListingPage, StopReason};
pub use fetcher::{asset_path, HttpImageFetcher, ImageFetcher};
pub use http_client::HttpClient;
pub use sources::{PicjumboListing, SourceKind, WikimediaListing, YahooListing};
