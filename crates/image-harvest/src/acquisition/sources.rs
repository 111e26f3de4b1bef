//! Listing formats for the supported image sources.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::HarvestConfig;
use crate::types::Query;

use super::discovery::{Listing, ListingPage};

pub const PICJUMBO_BASE: &str = "https://picjumbo.com";
pub const WIKIMEDIA_BASE: &str = "https://commons.wikimedia.org";
pub const WIKIMEDIA_IMAGE_HOST: &str = "upload.wikimedia.org";
pub const YAHOO_BASE: &str = "https://images.search.yahoo.com";

/// Results requested per Wikimedia API call.
const WIKIMEDIA_BATCH: u32 = 50;

/// Results Yahoo serves per listing offset step.
const YAHOO_PAGE_SIZE: u32 = 60;

/// The built-in sources, in the order they may be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Picjumbo,
    Wikimedia,
    Yahoo,
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Picjumbo => "picjumbo",
            Self::Wikimedia => "wikimedia",
            Self::Yahoo => "yahoo",
        }
    }

    /// Build this source's listing with limits taken from the config.
    pub fn listing(&self, config: &HarvestConfig) -> Box<dyn Listing> {
        match self {
            Self::Picjumbo => Box::new(PicjumboListing::new(config.picjumbo_max_pages)),
            Self::Wikimedia => Box::new(WikimediaListing::new(config.wikimedia_max_rounds)),
            Self::Yahoo => Box::new(YahooListing::new(
                config.yahoo_max_rounds,
                config.yahoo_stagnation_limit,
            )),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "picjumbo" => Ok(Self::Picjumbo),
            "wikimedia" => Ok(Self::Wikimedia),
            "yahoo" => Ok(Self::Yahoo),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

// ── Picjumbo ────────────────────────────────────────────────────────────────

/// Paged HTML search: `/search/<slug>/`, then `/search/<slug>/page/<n>/`.
/// Stops on the first page that contributes nothing new.
pub struct PicjumboListing {
    base_url: String,
    max_pages: u32,
}

impl PicjumboListing {
    pub fn new(max_pages: u32) -> Self {
        Self::with_base_url(PICJUMBO_BASE, max_pages)
    }

    pub fn with_base_url(base_url: &str, max_pages: u32) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            max_pages,
        }
    }

    fn page_url(&self, query: &Query, page: u32) -> String {
        let search = format!("{}/search/{}", self.base_url, query.slug());
        if page <= 1 {
            format!("{search}/")
        } else {
            format!("{search}/page/{page}/")
        }
    }
}

impl Listing for PicjumboListing {
    fn name(&self) -> &'static str {
        "picjumbo"
    }

    fn first_page(&self, query: &Query) -> String {
        self.page_url(query, 1)
    }

    fn parse_page(&self, query: &Query, body: &str, _page_url: &str, round: u32) -> ListingPage {
        let document = Html::parse_document(body);
        let sel = Selector::parse("picture img").unwrap();

        let candidates = document
            .select(&sel)
            .filter(|img| img.value().attr("class").map(str::trim) == Some("image"))
            .filter_map(|img| img.value().attr("src"))
            .map(str::to_string)
            .collect();

        ListingPage {
            candidates,
            next: Some(self.page_url(query, round + 2)),
        }
    }

    fn max_rounds(&self) -> u32 {
        self.max_pages
    }
}

// ── Wikimedia Commons ───────────────────────────────────────────────────────

/// MediaWiki search API over the File namespace. The `continue` offset is
/// the "load more" control; its absence means the results are exhausted.
pub struct WikimediaListing {
    base_url: String,
    image_host: String,
    max_rounds: u32,
}

impl WikimediaListing {
    pub fn new(max_rounds: u32) -> Self {
        Self::with_base_url(WIKIMEDIA_BASE, WIKIMEDIA_IMAGE_HOST, max_rounds)
    }

    pub fn with_base_url(base_url: &str, image_host: &str, max_rounds: u32) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            image_host: image_host.to_string(),
            max_rounds,
        }
    }

    fn api_url(&self, query: &Query, offset: Option<u64>) -> String {
        let endpoint = format!("{}/w/api.php", self.base_url);
        let mut params = vec![
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("generator", "search".to_string()),
            ("gsrsearch", query.text.trim().to_string()),
            ("gsrnamespace", "6".to_string()),
            ("gsrlimit", WIKIMEDIA_BATCH.to_string()),
            ("prop", "imageinfo".to_string()),
            ("iiprop", "url".to_string()),
        ];
        if let Some(offset) = offset {
            params.push(("gsroffset", offset.to_string()));
        }

        url::Url::parse_with_params(&endpoint, &params)
            .map(|u| u.to_string())
            .unwrap_or(endpoint)
    }
}

impl Listing for WikimediaListing {
    fn name(&self) -> &'static str {
        "wikimedia"
    }

    fn first_page(&self, query: &Query) -> String {
        self.api_url(query, None)
    }

    fn parse_page(&self, query: &Query, body: &str, page_url: &str, _round: u32) -> ListingPage {
        let json: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("wikimedia: unparseable response from {page_url}: {e}");
                return ListingPage::default();
            }
        };

        let mut ranked: Vec<(u64, String)> = json
            .pointer("/query/pages")
            .and_then(Value::as_object)
            .map(|pages| {
                pages
                    .values()
                    .filter_map(|page| {
                        let rank = page.get("index").and_then(Value::as_u64).unwrap_or(u64::MAX);
                        page.pointer("/imageinfo/0/url")
                            .and_then(Value::as_str)
                            .map(|u| (rank, u.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        ranked.sort();

        let next = json
            .pointer("/continue/gsroffset")
            .and_then(Value::as_u64)
            .map(|offset| self.api_url(query, Some(offset)));

        ListingPage {
            candidates: ranked.into_iter().map(|(_, u)| u).collect(),
            next,
        }
    }

    fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    fn accept(&self, url: &str) -> bool {
        url.contains(&self.image_host)
    }
}

// ── Yahoo Images ────────────────────────────────────────────────────────────

/// HTML image search, advanced with the `b=` start offset each round.
pub struct YahooListing {
    base_url: String,
    max_rounds: u32,
    stagnation_limit: u32,
}

impl YahooListing {
    pub fn new(max_rounds: u32, stagnation_limit: u32) -> Self {
        Self::with_base_url(YAHOO_BASE, max_rounds, stagnation_limit)
    }

    pub fn with_base_url(base_url: &str, max_rounds: u32, stagnation_limit: u32) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            max_rounds,
            stagnation_limit,
        }
    }

    fn page_url(&self, query: &Query, round: u32) -> String {
        let endpoint = format!("{}/search/images", self.base_url);
        let mut params = vec![("p", query.text.trim().to_string())];
        if round > 0 {
            params.push(("b", (round * YAHOO_PAGE_SIZE + 1).to_string()));
        }
        url::Url::parse_with_params(&endpoint, &params)
            .map(|u| u.to_string())
            .unwrap_or(endpoint)
    }
}

impl Listing for YahooListing {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn first_page(&self, query: &Query) -> String {
        self.page_url(query, 0)
    }

    fn parse_page(&self, query: &Query, body: &str, _page_url: &str, round: u32) -> ListingPage {
        let document = Html::parse_document(body);
        let sel = Selector::parse(".round-img img, li.ld img").unwrap();

        let candidates = document
            .select(&sel)
            .filter_map(|img| {
                img.value()
                    .attr("src")
                    .filter(|s| s.starts_with("http"))
                    .or_else(|| img.value().attr("data-src"))
            })
            .filter(|s| s.starts_with("http"))
            .map(str::to_string)
            .collect();

        ListingPage {
            candidates,
            next: Some(self.page_url(query, round + 1)),
        }
    }

    fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    fn stagnation_limit(&self) -> u32 {
        self.stagnation_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> Query {
        Query::new("Red Panda", 5).unwrap()
    }

    #[test]
    fn test_source_kind_parse() {
        assert_eq!("Wikimedia".parse::<SourceKind>(), Ok(SourceKind::Wikimedia));
        assert!("flickr".parse::<SourceKind>().is_err());
        assert_eq!(SourceKind::Yahoo.to_string(), "yahoo");
    }

    #[test]
    fn test_picjumbo_page_urls() {
        let listing = PicjumboListing::new(20);
        assert_eq!(
            listing.first_page(&query()),
            "https://picjumbo.com/search/red-panda/"
        );
        assert_eq!(
            listing.page_url(&query(), 3),
            "https://picjumbo.com/search/red-panda/page/3/"
        );
    }

    #[test]
    fn test_picjumbo_parse_exact_class() {
        let html = r#"
        <html><body>
          <picture><img class="image" src="//cdn.picjumbo.com/a.jpg"></picture>
          <picture><img class="image lazy" src="/b.jpg"></picture>
          <picture><img class="image" src="/c.jpg"></picture>
          <img class="image" src="/not-in-picture.jpg">
        </body></html>
        "#;
        let listing = PicjumboListing::new(20);
        let page = listing.parse_page(&query(), html, "https://picjumbo.com/search/red-panda/", 0);

        assert_eq!(page.candidates, vec!["//cdn.picjumbo.com/a.jpg", "/c.jpg"]);
        assert_eq!(
            page.next.as_deref(),
            Some("https://picjumbo.com/search/red-panda/page/2/")
        );
    }

    #[test]
    fn test_wikimedia_parse_orders_by_rank_and_continues() {
        let body = r#"{
            "continue": {"gsroffset": 50, "continue": "gsroffset||"},
            "query": {"pages": {
                "11": {"index": 2, "imageinfo": [{"url": "https://upload.wikimedia.org/b.jpg"}]},
                "10": {"index": 1, "imageinfo": [{"url": "https://upload.wikimedia.org/a.jpg"}]},
                "12": {"index": 3}
            }}
        }"#;
        let listing = WikimediaListing::new(50);
        let first = listing.first_page(&query());
        let page = listing.parse_page(&query(), body, &first, 0);

        assert_eq!(
            page.candidates,
            vec![
                "https://upload.wikimedia.org/a.jpg",
                "https://upload.wikimedia.org/b.jpg"
            ]
        );
        let next = page.next.unwrap();
        assert!(next.contains("gsroffset=50"));
        assert!(next.contains("gsrsearch=Red+Panda"));
    }

    #[test]
    fn test_wikimedia_no_continue_is_last_page() {
        let body = r#"{"query": {"pages": {}}}"#;
        let listing = WikimediaListing::new(50);
        let page = listing.parse_page(&query(), body, "x", 0);
        assert!(page.candidates.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn test_wikimedia_accepts_only_upload_host() {
        let listing = WikimediaListing::new(50);
        assert!(listing.accept("https://upload.wikimedia.org/x.jpg"));
        assert!(!listing.accept("https://commons.wikimedia.org/static/logo.png"));
    }

    #[test]
    fn test_yahoo_parse() {
        let html = r#"
        <ul>
          <li class="ld"><a><img src="https://tse1.mm.bing.net/a.jpg"></a></li>
          <li class="ld"><a><img src="data:image/gif;base64,R0lG" data-src="https://tse2.mm.bing.net/b.jpg"></a></li>
          <li class="ld"><a><img src="/relative.jpg"></a></li>
        </ul>
        <div class="round-img"><img src="https://tse3.mm.bing.net/c.jpg"></div>
        "#;
        let listing = YahooListing::new(30, 3);
        let page = listing.parse_page(&query(), html, "https://images.search.yahoo.com/", 0);

        assert_eq!(page.candidates.len(), 3);
        assert!(page.candidates.contains(&"https://tse2.mm.bing.net/b.jpg".to_string()));
        assert!(page.next.unwrap().contains("b=61"));
        assert_eq!(listing.stagnation_limit(), 3);
    }
}
