//! Paginated walks over listing endpoints.
//!
//! A [`PageWalk`] describes one listing endpoint; [`GitHubClient::fetch_pages`]
//! executes the walk, accumulating raw items until the cap, an empty page,
//! or a short page ends it. A fresh walk always starts at page 1.

use serde::Deserialize;
use serde_json::Value;

use crate::progress::{ProgressCallback, ScrapeProgress, emit};

use super::client::GitHubClient;
use super::error::Result;

/// Largest page the API will serve.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Where a page's items live in the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageShape {
    /// The body is the item array itself (contributors, issues, repos).
    Array,
    /// The body is a search envelope; items live under `items`. The
    /// envelope's `total_count` is deliberately not consulted.
    SearchResults,
}

/// Configuration for one paginated fetch.
pub struct PageWalk {
    /// Label used in progress events.
    pub label: String,
    /// Endpoint path.
    pub path: String,
    /// Static query params; `per_page` and `page` are appended per request.
    pub params: Vec<(&'static str, String)>,
    /// Maximum items per request.
    pub page_size: u32,
    /// Total item cap for the walk.
    pub cap: usize,
    /// Response layout.
    pub shape: PageShape,
}

impl PageWalk {
    /// Walk a repository's contributor listing.
    pub fn contributors(owner: &str, name: &str, cap: usize) -> Self {
        Self {
            label: format!("{owner}/{name} contributors"),
            path: format!("/repos/{owner}/{name}/contributors"),
            params: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            cap,
            shape: PageShape::Array,
        }
    }

    /// Walk a repository's issue listing filtered by `state`.
    pub fn issues(owner: &str, name: &str, state: &str, cap: usize) -> Self {
        Self {
            label: format!("{owner}/{name} issues"),
            path: format!("/repos/{owner}/{name}/issues"),
            params: vec![("state", state.to_string())],
            page_size: DEFAULT_PAGE_SIZE,
            cap,
            shape: PageShape::Array,
        }
    }

    /// Walk a repository's stargazer listing.
    pub fn stargazers(owner: &str, name: &str, cap: usize) -> Self {
        Self {
            label: format!("{owner}/{name} stargazers"),
            path: format!("/repos/{owner}/{name}/stargazers"),
            params: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            cap,
            shape: PageShape::Array,
        }
    }

    /// Walk a user's repository listing.
    pub fn user_repos(login: &str, cap: usize) -> Self {
        Self {
            label: format!("{login} repos"),
            path: format!("/users/{login}/repos"),
            params: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            cap,
            shape: PageShape::Array,
        }
    }

    /// Walk the repository search endpoint, sorted by stars.
    pub fn search(query: &str, cap: usize) -> Self {
        Self {
            label: format!("search {query}"),
            path: "/search/repositories".to_string(),
            params: vec![("q", query.to_string()), ("sort", "stars".to_string())],
            page_size: DEFAULT_PAGE_SIZE,
            cap,
            shape: PageShape::SearchResults,
        }
    }

    /// Override the per-request page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<Value>,
}

impl GitHubClient {
    /// Execute a paginated walk and return the accumulated raw items.
    ///
    /// Each request asks for `min(page_size, cap - accumulated)` items.
    /// Termination conditions, checked in order: the cap is reached, the
    /// endpoint returns zero items, or the endpoint returns fewer items
    /// than requested.
    pub async fn fetch_pages(
        &self,
        walk: &PageWalk,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<Value>> {
        emit(
            on_progress,
            ScrapeProgress::Fetching {
                label: walk.label.clone(),
            },
        );

        let mut items: Vec<Value> = Vec::new();
        let mut page = 1u32;

        loop {
            let remaining = walk.cap.saturating_sub(items.len());
            if remaining == 0 {
                break;
            }
            let want = (walk.page_size as usize).min(remaining) as u32;

            let mut params = walk.params.clone();
            params.push(("per_page", want.to_string()));
            params.push(("page", page.to_string()));

            let body = self.get_value(&walk.path, &params, on_progress).await?;
            let page_items = match walk.shape {
                PageShape::Array => body.as_array().cloned().unwrap_or_default(),
                PageShape::SearchResults => serde_json::from_value::<SearchPage>(body)
                    .map(|p| p.items)
                    .unwrap_or_default(),
            };

            let count = page_items.len();
            items.extend(page_items);
            if items.len() > walk.cap {
                // Servers may ignore per_page; never hand back more than asked.
                items.truncate(walk.cap);
            }

            emit(
                on_progress,
                ScrapeProgress::FetchedPage {
                    label: walk.label.clone(),
                    page,
                    count,
                    total_so_far: items.len(),
                },
            );

            if items.len() >= walk.cap {
                break;
            }
            if count == 0 {
                break;
            }
            if count < want as usize {
                break;
            }

            page += 1;
        }

        emit(
            on_progress,
            ScrapeProgress::FetchComplete {
                label: walk.label.clone(),
                total: items.len(),
            },
        );

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::client::{ClientConfig, GitHubClient};
    use crate::http::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn client(transport: &MockTransport) -> GitHubClient {
        GitHubClient::with_transport(ClientConfig::new(), Arc::new(transport.clone()))
    }

    fn items(n: usize, offset: usize) -> serde_json::Value {
        json!(
            (0..n)
                .map(|i| json!({"login": format!("user-{}", offset + i)}))
                .collect::<Vec<_>>()
        )
    }

    #[test]
    fn contributors_walk_targets_the_contributor_listing() {
        let walk = PageWalk::contributors("rust-lang", "rust", 100);
        assert_eq!(walk.path, "/repos/rust-lang/rust/contributors");
        assert_eq!(walk.cap, 100);
        assert_eq!(walk.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(walk.shape, PageShape::Array);
        assert!(walk.params.is_empty());
    }

    #[test]
    fn issues_walk_carries_the_state_filter() {
        let walk = PageWalk::issues("rust-lang", "rust", "open", 50);
        assert_eq!(walk.path, "/repos/rust-lang/rust/issues");
        assert_eq!(walk.params, vec![("state", "open".to_string())]);
    }

    #[test]
    fn search_walk_sorts_by_stars() {
        let walk = PageWalk::search("stars:>100 language:rust", 100);
        assert_eq!(walk.path, "/search/repositories");
        assert_eq!(walk.shape, PageShape::SearchResults);
        assert_eq!(
            walk.params,
            vec![
                ("q", "stars:>100 language:rust".to_string()),
                ("sort", "stars".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn short_first_page_terminates_after_one_request() {
        let transport = MockTransport::new();
        transport.push_json(
            "https://api.github.com/repos/a/b/contributors?per_page=100&page=1",
            &items(3, 0),
        );

        let got = client(&transport)
            .fetch_pages(&PageWalk::contributors("a", "b", 500), None)
            .await
            .expect("walk should succeed");

        assert_eq!(got.len(), 3);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_first_page_yields_no_items() {
        let transport = MockTransport::new();
        transport.push_json(
            "https://api.github.com/repos/a/b/stargazers?per_page=100&page=1",
            &json!([]),
        );

        let got = client(&transport)
            .fetch_pages(&PageWalk::stargazers("a", "b", 1000), None)
            .await
            .expect("walk should succeed");

        assert!(got.is_empty());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn full_pages_continue_until_cap_with_shrinking_final_request() {
        let transport = MockTransport::new();
        let base = "https://api.github.com/users/dev/repos";
        transport.push_json(&format!("{base}?per_page=2&page=1"), &items(2, 0));
        transport.push_json(&format!("{base}?per_page=2&page=2"), &items(2, 2));
        transport.push_json(&format!("{base}?per_page=1&page=3"), &items(1, 4));

        let got = client(&transport)
            .fetch_pages(&PageWalk::user_repos("dev", 5).with_page_size(2), None)
            .await
            .expect("walk should succeed");

        assert_eq!(got.len(), 5);
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        // Final request asks for exactly cap - accumulated items.
        assert!(requests[2].url.ends_with("per_page=1&page=3"));
    }

    #[tokio::test]
    async fn cap_equal_to_one_page_stops_without_probing_further() {
        let transport = MockTransport::new();
        transport.push_json(
            "https://api.github.com/users/dev/repos?per_page=2&page=1",
            &items(2, 0),
        );

        let got = client(&transport)
            .fetch_pages(&PageWalk::user_repos("dev", 2).with_page_size(2), None)
            .await
            .expect("walk should succeed");

        assert_eq!(got.len(), 2);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn search_pages_extract_items_and_ignore_total_count() {
        let transport = MockTransport::new();
        transport.push_json(
            "https://api.github.com/search/repositories?q=stars%3A%3E100&sort=stars&per_page=100&page=1",
            &json!({
                // A huge total_count must not keep the walk going past a
                // short page.
                "total_count": 999999,
                "incomplete_results": false,
                "items": [{"full_name": "a/x"}, {"full_name": "b/y"}]
            }),
        );

        let got = client(&transport)
            .fetch_pages(&PageWalk::search("stars:>100", 100), None)
            .await
            .expect("walk should succeed");

        assert_eq!(got.len(), 2);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn walk_emits_page_progress_events() {
        use crate::progress::{ProgressCallback, ScrapeProgress};
        use std::sync::Mutex;

        let transport = MockTransport::new();
        transport.push_json(
            "https://api.github.com/repos/a/b/contributors?per_page=100&page=1",
            &items(4, 0),
        );

        let events: Arc<Mutex<Vec<ScrapeProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let events_capture = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            events_capture
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(event);
        });

        client(&transport)
            .fetch_pages(&PageWalk::contributors("a", "b", 100), Some(&callback))
            .await
            .expect("walk should succeed");

        let events = events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        assert!(matches!(events[0], ScrapeProgress::Fetching { .. }));
        assert!(events.iter().any(|e| matches!(
            e,
            ScrapeProgress::FetchedPage {
                page: 1,
                count: 4,
                ..
            }
        )));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, ScrapeProgress::FetchComplete { total: 4, .. }))
        );
    }

    #[tokio::test]
    async fn errors_propagate_unchanged_from_the_walk() {
        use crate::github::error::GitHubError;
        use crate::http::{HttpMethod, HttpResponse};

        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            "https://api.github.com/repos/a/b/contributors?per_page=100&page=1",
            HttpResponse {
                status: 500,
                headers: Vec::new(),
                body: b"server error".to_vec(),
            },
        );

        let err = client(&transport)
            .fetch_pages(&PageWalk::contributors("a", "b", 100), None)
            .await
            .expect_err("500 should propagate");

        assert!(matches!(err, GitHubError::Api { status: 500, .. }));
    }
}
