//! Bounded URL discovery over a paginated listing.
//!
//! Every source shares the same state machine: `Collecting` while rounds
//! keep yielding new URLs, `Stagnant(n)` after `n` consecutive rounds with
//! nothing new, and `Done` once the quota is met, the listing has no next
//! page, the stagnation limit is hit, or the round ceiling is reached.
//! Each transition consumes one round, so discovery always terminates
//! within `max_rounds` page loads.

use std::collections::HashSet;

use crate::types::Query;

use super::http_client::HttpClient;

/// Candidates extracted from one listing page.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Raw candidate URLs in page order, possibly relative.
    pub candidates: Vec<String>,
    /// URL of the next page, if the listing offers one.
    pub next: Option<String>,
}

/// Source-specific listing format.
pub trait Listing: Send + Sync {
    /// Stable lowercase source name.
    fn name(&self) -> &'static str;

    /// URL of the first listing page for a query.
    fn first_page(&self, query: &Query) -> String;

    /// Extract candidates and the next page from a fetched listing page.
    /// `round` is the zero-based index of this page among pages parsed;
    /// failed fetches do not advance it.
    fn parse_page(&self, query: &Query, body: &str, page_url: &str, round: u32) -> ListingPage;

    /// Ceiling on listing page loads.
    fn max_rounds(&self) -> u32;

    /// Consecutive rounds without a new URL before giving up.
    fn stagnation_limit(&self) -> u32 {
        1
    }

    /// Filter applied to normalized URLs.
    fn accept(&self, _url: &str) -> bool {
        true
    }
}

/// Why discovery stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QuotaMet,
    Exhausted,
    Stagnated,
    MaxRounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Collecting,
    Stagnant(u32),
    Done(StopReason),
}

/// Accumulates unique URLs up to a quota and tracks the loop state.
#[derive(Debug)]
pub struct Discovery {
    quota: usize,
    max_rounds: u32,
    stagnation_limit: u32,
    rounds: u32,
    state: DiscoveryState,
    seen: HashSet<String>,
    urls: Vec<String>,
}

impl Discovery {
    pub fn new(quota: usize, max_rounds: u32, stagnation_limit: u32) -> Self {
        let state = if quota == 0 {
            DiscoveryState::Done(StopReason::QuotaMet)
        } else if max_rounds == 0 {
            DiscoveryState::Done(StopReason::MaxRounds)
        } else {
            DiscoveryState::Collecting
        };

        Self {
            quota,
            max_rounds,
            stagnation_limit: stagnation_limit.max(1),
            rounds: 0,
            state,
            seen: HashSet::new(),
            urls: Vec::new(),
        }
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, DiscoveryState::Done(_))
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Add a URL if it is new and the quota is not yet met.
    pub fn offer(&mut self, url: String) -> bool {
        if self.urls.len() >= self.quota || self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.urls.push(url);
        true
    }

    /// Close a round that added `added` new URLs.
    pub fn finish_round(&mut self, added: usize, has_next: bool) -> DiscoveryState {
        if self.is_done() {
            return self.state;
        }
        self.rounds += 1;

        let idle = match self.state {
            DiscoveryState::Stagnant(n) => n,
            _ => 0,
        };

        self.state = if self.urls.len() >= self.quota {
            DiscoveryState::Done(StopReason::QuotaMet)
        } else if !has_next {
            DiscoveryState::Done(StopReason::Exhausted)
        } else if added == 0 && idle + 1 >= self.stagnation_limit {
            DiscoveryState::Done(StopReason::Stagnated)
        } else if self.rounds >= self.max_rounds {
            DiscoveryState::Done(StopReason::MaxRounds)
        } else if added == 0 {
            DiscoveryState::Stagnant(idle + 1)
        } else {
            DiscoveryState::Collecting
        };
        self.state
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

/// Turn a candidate into an absolute http(s) URL.
///
/// Protocol-relative candidates get `https:`; relative paths are joined to
/// the page they were found on.
pub fn normalize_url(candidate: &str, page_url: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.starts_with("data:") || candidate.starts_with('#') {
        return None;
    }

    let resolved = if let Some(rest) = candidate.strip_prefix("//") {
        url::Url::parse(&format!("https://{rest}")).ok()?
    } else {
        match url::Url::parse(candidate) {
            Ok(u) => u,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                url::Url::parse(page_url).ok()?.join(candidate).ok()?
            }
            Err(_) => return None,
        }
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Walk a listing until the discovery state machine is done.
pub async fn discover(
    listing: &dyn Listing,
    http: &HttpClient,
    query: &Query,
    quota: usize,
) -> Vec<String> {
    let mut discovery = Discovery::new(quota, listing.max_rounds(), listing.stagnation_limit());
    let mut page_url = listing.first_page(query);
    // Pages parsed so far; a failed fetch retries the same page with the same index.
    let mut page_round = 0u32;

    while !discovery.is_done() {
        let (added, next) = match http.get_text(&page_url).await {
            Ok(body) => {
                let page = listing.parse_page(query, &body, &page_url, page_round);
                page_round += 1;
                let mut added = 0;
                for candidate in &page.candidates {
                    let Some(url) = normalize_url(candidate, &page_url) else {
                        continue;
                    };
                    if listing.accept(&url) && discovery.offer(url) {
                        added += 1;
                    }
                }
                (added, page.next)
            }
            Err(e) => {
                tracing::warn!("{}: listing page {page_url} failed: {e}", listing.name());
                (0, Some(page_url.clone()))
            }
        };

        let state = discovery.finish_round(added, next.is_some());
        tracing::debug!(
            "{}: round {} added {added}, total {}, state {state:?}",
            listing.name(),
            discovery.rounds(),
            discovery.len()
        );

        if let Some(next) = next {
            page_url = next;
        }
    }

    tracing::info!(
        "{}: discovered {} URL(s) in {} round(s), {:?}",
        listing.name(),
        discovery.len(),
        discovery.rounds(),
        discovery.state()
    );
    discovery.into_urls()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_zero_is_done() {
        let d = Discovery::new(0, 10, 1);
        assert_eq!(d.state(), DiscoveryState::Done(StopReason::QuotaMet));
    }

    #[test]
    fn test_dedup_and_quota() {
        let mut d = Discovery::new(2, 10, 1);
        assert!(d.offer("a".into()));
        assert!(!d.offer("a".into()));
        assert!(d.offer("b".into()));
        assert!(!d.offer("c".into()));
        assert_eq!(
            d.finish_round(2, true),
            DiscoveryState::Done(StopReason::QuotaMet)
        );
        assert_eq!(d.into_urls(), vec!["a", "b"]);
    }

    #[test]
    fn test_stagnation_limit() {
        let mut d = Discovery::new(10, 100, 3);
        d.offer("a".into());
        assert_eq!(d.finish_round(1, true), DiscoveryState::Collecting);
        assert_eq!(d.finish_round(0, true), DiscoveryState::Stagnant(1));
        assert_eq!(d.finish_round(0, true), DiscoveryState::Stagnant(2));
        assert_eq!(
            d.finish_round(0, true),
            DiscoveryState::Done(StopReason::Stagnated)
        );
    }

    #[test]
    fn test_progress_resets_stagnation() {
        let mut d = Discovery::new(10, 100, 2);
        assert_eq!(d.finish_round(0, true), DiscoveryState::Stagnant(1));
        d.offer("a".into());
        assert_eq!(d.finish_round(1, true), DiscoveryState::Collecting);
        assert_eq!(d.finish_round(0, true), DiscoveryState::Stagnant(1));
    }

    #[test]
    fn test_max_rounds_terminates() {
        let mut d = Discovery::new(1000, 5, 1);
        let mut n = 0;
        while !d.is_done() {
            d.offer(format!("u{n}"));
            d.finish_round(1, true);
            n += 1;
        }
        assert_eq!(n, 5);
        assert_eq!(d.state(), DiscoveryState::Done(StopReason::MaxRounds));
    }

    #[test]
    fn test_no_next_page_is_exhausted() {
        let mut d = Discovery::new(10, 50, 1);
        d.offer("a".into());
        assert_eq!(
            d.finish_round(1, false),
            DiscoveryState::Done(StopReason::Exhausted)
        );
    }

    #[test]
    fn test_normalize_url() {
        let page = "https://picjumbo.com/search/cats/";
        assert_eq!(
            normalize_url("//cdn.example.com/a.jpg", page).as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
        assert_eq!(
            normalize_url("/wp-content/b.jpg", page).as_deref(),
            Some("https://picjumbo.com/wp-content/b.jpg")
        );
        assert_eq!(
            normalize_url("http://x.org/c.jpg", page).as_deref(),
            Some("http://x.org/c.jpg")
        );
        assert_eq!(normalize_url("data:image/png;base64,AAA", page), None);
        assert_eq!(normalize_url("", page), None);
        assert_eq!(normalize_url("ftp://x.org/c.jpg", page), None);
    }

    /// One URL per body line, tagged with the round it was parsed in.
    struct LineListing {
        base: String,
    }

    impl Listing for LineListing {
        fn name(&self) -> &'static str {
            "lines"
        }

        fn first_page(&self, _query: &Query) -> String {
            format!("{}/page/1", self.base)
        }

        fn parse_page(&self, _query: &Query, body: &str, _page_url: &str, round: u32) -> ListingPage {
            ListingPage {
                candidates: body
                    .lines()
                    .map(|line| format!("{}/{round}/{line}", self.base))
                    .collect(),
                next: Some(format!("{}/page/{}", self.base, round + 2)),
            }
        }

        fn max_rounds(&self) -> u32 {
            10
        }

        fn stagnation_limit(&self) -> u32 {
            3
        }
    }

    #[tokio::test]
    async fn test_failed_page_is_retried_without_skipping() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        for (page, body) in [("1", "a"), ("2", "b"), ("3", "c")] {
            Mock::given(method("GET"))
                .and(path(format!("/page/{page}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/page/2"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        let base = server.uri();
        let listing = LineListing { base: base.clone() };
        let http = HttpClient::new(2_000, "test-agent");
        let query = Query::new("lines", 3).unwrap();

        let urls = discover(&listing, &http, &query, 3).await;
        assert_eq!(
            urls,
            vec![
                format!("{base}/0/a"),
                format!("{base}/1/b"),
                format!("{base}/2/c"),
            ]
        );
    }
}
