//! GitHub API client: configuration, authentication, request plumbing.
//!
//! All endpoint access funnels through one authenticated GET primitive that
//! consults the quota gate before each request and feeds every response's
//! rate-limit headers back into it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, build_url,
    reqwest_transport::ReqwestTransport,
};
use crate::progress::ProgressCallback;
use crate::records::{ContributorRecord, IssueRecord, RepositoryRecord, UserProfile};

use super::convert;
use super::error::{GitHubError, Result};
use super::paginate::PageWalk;
use super::ratelimit::{ApiRateLimiter, QuotaGate, parse_rate_limit_headers};

/// Default API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Environment variable consulted for a default token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

const USER_AGENT: &str = concat!("octoharvest/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

/// Client configuration.
///
/// The token is optional: anonymous access works against a lower quota, so
/// its absence is not an error.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL.
    pub base_url: String,
    /// User-agent header value.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: StdDuration,
    /// Bearer token, if any.
    pub token: Option<String>,
    /// Optional proactive requests-per-second pacing.
    pub requests_per_second: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: GITHUB_API_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            token: None,
            requests_per_second: None,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Fill the token from `GITHUB_TOKEN` unless one was set explicitly.
    /// A missing variable leaves the client anonymous.
    #[must_use]
    pub fn token_from_env(mut self) -> Self {
        if self.token.is_none() {
            self.token = std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty());
        }
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable proactive pacing at `rps` requests per second.
    #[must_use]
    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = Some(rps);
        self
    }
}

/// Authenticated GitHub API client.
///
/// Cloning is cheap and shares the transport, its connection pool, and the
/// quota gate; a batch of concurrent scrapes should clone one client rather
/// than construct several. The pool is released when the last clone drops.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    user_agent: String,
    token: Option<String>,
    gate: QuotaGate,
    pacer: Option<ApiRateLimiter>,
}

impl GitHubClient {
    /// Create a client with a reqwest-backed transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(config.timeout)
            .map_err(|e| GitHubError::Config(e.to_string()))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over an injected transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let pacer = config.requests_per_second.map(ApiRateLimiter::new);
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent,
            token: config.token,
            gate: QuotaGate::new(),
            pacer,
        }
    }

    /// The shared quota gate.
    #[must_use]
    pub fn quota_gate(&self) -> &QuotaGate {
        &self.gate
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Accept".to_string(), ACCEPT.to_string()),
            ("User-Agent".to_string(), self.user_agent.clone()),
        ];
        if let Some(token) = &self.token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers
    }

    fn rate_limited_error(response: &HttpResponse) -> GitHubError {
        match parse_rate_limit_headers(&response.headers) {
            Some(info) => GitHubError::RateLimited {
                reset_at: info.reset_at,
            },
            None => GitHubError::Api {
                status: 429,
                message: String::from_utf8_lossy(&response.body).to_string(),
            },
        }
    }

    /// Authenticated GET returning the raw JSON value.
    ///
    /// Paces through the quota gate before sending and observes the
    /// response's rate-limit headers after.
    pub(crate) async fn get_value(
        &self,
        path: &str,
        params: &[(&str, String)],
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Value> {
        if let Some(pacer) = &self.pacer {
            pacer.wait().await;
        }
        self.gate.pace(on_progress).await;

        let request = HttpRequest {
            method: HttpMethod::Get,
            url: build_url(&self.base_url, path, params),
            headers: self.request_headers(),
            body: Vec::new(),
        };

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| GitHubError::Network(e.to_string()))?;

        self.gate.observe(&response.headers);

        match response.status {
            s if (200..300).contains(&s) => {
                serde_json::from_slice(&response.body).map_err(GitHubError::Json)
            }
            429 => Err(Self::rate_limited_error(&response)),
            status => Err(GitHubError::Api {
                status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            }),
        }
    }

    /// Authenticated GET deserialized into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let value = self.get_value(path, params, None).await?;
        serde_json::from_value(value).map_err(GitHubError::Json)
    }

    /// Fetch a single repository's metadata.
    pub async fn get_repo(&self, owner: &str, name: &str) -> Result<RepositoryRecord> {
        let value = self
            .get_value(&format!("/repos/{owner}/{name}"), &[], None)
            .await?;
        Ok(convert::map_repository(&value))
    }

    /// Fetch a user's profile.
    pub async fn get_user(&self, login: &str) -> Result<UserProfile> {
        let value = self.get_value(&format!("/users/{login}"), &[], None).await?;
        Ok(convert::map_user_profile(&value))
    }

    /// Fetch a repository's language byte counts.
    pub async fn get_languages(&self, owner: &str, name: &str) -> Result<BTreeMap<String, u64>> {
        self.get_json(&format!("/repos/{owner}/{name}/languages"), &[])
            .await
    }

    /// List a repository's contributors, up to `cap`.
    pub async fn list_contributors(
        &self,
        owner: &str,
        name: &str,
        cap: usize,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<ContributorRecord>> {
        let items = self
            .fetch_pages(&PageWalk::contributors(owner, name, cap), on_progress)
            .await?;
        Ok(items.iter().map(convert::map_contributor).collect())
    }

    /// List a repository's issues, up to `cap` raw items. Pull requests are
    /// filtered out after fetching, so the returned list may be shorter.
    pub async fn list_issues(
        &self,
        owner: &str,
        name: &str,
        state: &str,
        cap: usize,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<IssueRecord>> {
        let items = self
            .fetch_pages(&PageWalk::issues(owner, name, state, cap), on_progress)
            .await?;
        Ok(items.iter().filter_map(convert::map_issue).collect())
    }

    /// List logins of a repository's stargazers, up to `cap`.
    pub async fn list_stargazers(
        &self,
        owner: &str,
        name: &str,
        cap: usize,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<String>> {
        let items = self
            .fetch_pages(&PageWalk::stargazers(owner, name, cap), on_progress)
            .await?;
        Ok(items.iter().map(convert::map_stargazer).collect())
    }

    /// List a user's repositories, up to `cap`.
    pub async fn list_user_repos(
        &self,
        login: &str,
        cap: usize,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<RepositoryRecord>> {
        let items = self
            .fetch_pages(&PageWalk::user_repos(login, cap), on_progress)
            .await?;
        Ok(items.iter().map(convert::map_repository).collect())
    }

    /// Search repositories, sorted by stars, up to `cap` results.
    pub async fn search_repos(
        &self,
        query: &str,
        cap: usize,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<RepositoryRecord>> {
        let items = self
            .fetch_pages(&PageWalk::search(query, cap), on_progress)
            .await?;
        Ok(items.iter().map(convert::map_repository).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpHeaders, MockTransport};
    use serde_json::json;

    fn client_with(transport: &MockTransport, config: ClientConfig) -> GitHubClient {
        GitHubClient::with_transport(config, Arc::new(transport.clone()))
    }

    fn anon_client(transport: &MockTransport) -> GitHubClient {
        client_with(transport, ClientConfig::new())
    }

    fn response(status: u16, headers: Vec<(&str, &str)>, body: impl AsRef<[u8]>) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HttpHeaders>(),
            body: body.as_ref().to_vec(),
        }
    }

    #[test]
    fn config_defaults_target_the_public_api() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://api.github.com");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.token.is_none());
        assert!(config.requests_per_second.is_none());
    }

    #[test]
    fn with_transport_normalizes_base_url() {
        let transport = MockTransport::new();
        let client = client_with(
            &transport,
            ClientConfig::new().with_base_url("https://ghe.example/api/v3/"),
        );
        assert_eq!(client.base_url(), "https://ghe.example/api/v3");
    }

    #[tokio::test]
    async fn requests_carry_accept_user_agent_and_bearer_token() {
        let transport = MockTransport::new();
        transport.push_json("https://api.github.com/repos/a/b", &json!({"name": "b"}));

        let client = client_with(&transport, ClientConfig::new().with_token("secret-token"));
        client.get_repo("a", "b").await.expect("scripted fetch");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let headers = &requests[0].headers;
        assert_eq!(
            crate::http::header_get(headers, "accept"),
            Some("application/vnd.github+json")
        );
        assert!(crate::http::header_get(headers, "user-agent").is_some());
        assert_eq!(
            crate::http::header_get(headers, "authorization"),
            Some("Bearer secret-token")
        );
    }

    #[tokio::test]
    async fn anonymous_requests_omit_the_authorization_header() {
        let transport = MockTransport::new();
        transport.push_json("https://api.github.com/repos/a/b", &json!({"name": "b"}));

        let client = anon_client(&transport);
        client.get_repo("a", "b").await.expect("scripted fetch");

        let requests = transport.requests();
        assert!(crate::http::header_get(&requests[0].headers, "authorization").is_none());
    }

    #[tokio::test]
    async fn non_2xx_maps_to_api_error_with_status_and_body() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            "https://api.github.com/repos/a/missing",
            response(404, vec![], "Not Found"),
        );

        let client = anon_client(&transport);
        let err = client
            .get_repo("a", "missing")
            .await
            .expect_err("404 should error");

        match err {
            GitHubError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn hard_429_with_reset_header_maps_to_rate_limited() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            "https://api.github.com/repos/a/b",
            response(
                429,
                vec![
                    ("x-ratelimit-limit", "60"),
                    ("x-ratelimit-remaining", "0"),
                    ("x-ratelimit-reset", "1706400000"),
                ],
                "rate limit exceeded",
            ),
        );

        let client = anon_client(&transport);
        let err = client.get_repo("a", "b").await.expect_err("429 expected");

        match err {
            GitHubError::RateLimited { reset_at } => {
                assert_eq!(reset_at.timestamp(), 1706400000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn hard_429_without_headers_stays_a_plain_api_error() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            "https://api.github.com/repos/a/b",
            response(429, vec![], "slow down"),
        );

        let client = anon_client(&transport);
        let err = client.get_repo("a", "b").await.expect_err("429 expected");
        assert!(matches!(err, GitHubError::Api { status: 429, .. }));
    }

    #[tokio::test]
    async fn transport_failure_maps_to_network_error() {
        // Nothing scripted: the mock reports a missing route, which the
        // client must surface as a network-class failure.
        let transport = MockTransport::new();
        let client = anon_client(&transport);
        let err = client.get_repo("a", "b").await.expect_err("no route");
        assert!(matches!(err, GitHubError::Network(_)));
    }

    #[tokio::test]
    async fn undecodable_2xx_body_maps_to_json_error() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            "https://api.github.com/repos/a/b",
            response(200, vec![], "<html>not json</html>"),
        );

        let client = anon_client(&transport);
        let err = client.get_repo("a", "b").await.expect_err("bad body");
        assert!(matches!(err, GitHubError::Json(_)));
    }

    #[tokio::test]
    async fn responses_feed_the_quota_gate() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            "https://api.github.com/repos/a/b",
            response(
                200,
                vec![
                    ("x-ratelimit-limit", "5000"),
                    ("x-ratelimit-remaining", "1234"),
                    ("x-ratelimit-reset", "4102444800"),
                ],
                "{\"name\":\"b\"}",
            ),
        );

        let client = anon_client(&transport);
        assert_eq!(client.quota_gate().remaining(), None);
        client.get_repo("a", "b").await.expect("scripted fetch");
        assert_eq!(client.quota_gate().remaining(), Some(1234));
    }

    #[tokio::test]
    async fn get_languages_returns_byte_counts() {
        let transport = MockTransport::new();
        transport.push_json(
            "https://api.github.com/repos/rust-lang/rust/languages",
            &json!({"Rust": 500000, "C": 12000}),
        );

        let client = anon_client(&transport);
        let languages = client
            .get_languages("rust-lang", "rust")
            .await
            .expect("scripted fetch");

        assert_eq!(languages.get("Rust"), Some(&500000));
        assert_eq!(languages.get("C"), Some(&12000));
        assert_eq!(languages.len(), 2);
    }

    #[tokio::test]
    async fn get_user_maps_profile() {
        let transport = MockTransport::new();
        transport.push_json(
            "https://api.github.com/users/octocat",
            &json!({"login": "octocat", "followers": 99, "public_repos": 8}),
        );

        let client = anon_client(&transport);
        let profile = client.get_user("octocat").await.expect("scripted fetch");
        assert_eq!(profile.login, "octocat");
        assert_eq!(profile.followers, 99);
    }
}
