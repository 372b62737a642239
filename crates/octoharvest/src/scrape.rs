//! Aggregation of independent endpoint fetches into composite records.
//!
//! The [`Scraper`] owns the fan-out ordering and the failure policy: a
//! composite operation aborts on the first sub-fetch error and yields no
//! record at all. Rate-limited sub-fetches are retried with exponential
//! backoff before that error is considered final; nothing else is retried.
//! Callers wanting partial data use the per-endpoint methods on
//! [`GitHubClient`] directly.
//!
//! All waiting suspends, so an in-flight scrape is cancellable by dropping
//! its future; cancellation takes effect at the next await point.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::github::{
    GitHubClient, GitHubError, Result, is_rate_limit_error, short_error_message,
};
use crate::progress::{ProgressCallback, ScrapeProgress, emit};
use crate::records::{CompositeRepoRecord, RepositoryRecord, UserAnalysis, UserProfile};
use crate::retry::with_retry;

/// Default cap on contributor listings.
pub const DEFAULT_CONTRIBUTOR_CAP: usize = 100;

/// Default cap on issue listings (raw items, before pull requests are
/// filtered out).
pub const DEFAULT_ISSUE_CAP: usize = 100;

/// Default cap on a user's repository listing.
pub const DEFAULT_USER_REPO_CAP: usize = 100;

/// Default cap on search results.
pub const DEFAULT_SEARCH_CAP: usize = 100;

/// Default cap on stargazer listings.
pub const DEFAULT_STARGAZER_CAP: usize = 1000;

/// How many repositories a user analysis keeps as "top".
pub const DEFAULT_TOP_REPO_COUNT: usize = 10;

/// Default concurrency for batch scraping.
pub const DEFAULT_SCRAPE_CONCURRENCY: usize = 4;

/// Star floor used by the trending search query.
pub const TRENDING_STAR_FLOOR: u32 = 100;

/// Caps and policies for scrape operations.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Maximum contributors fetched per repository.
    pub contributor_cap: usize,
    /// Maximum raw issue items fetched per repository.
    pub issue_cap: usize,
    /// Issue state filter: "open", "closed", or "all".
    pub issue_state: String,
    /// Maximum repositories fetched per user.
    pub user_repo_cap: usize,
    /// Maximum search results.
    pub search_cap: usize,
    /// Maximum stargazers fetched per repository.
    pub stargazer_cap: usize,
    /// Size of the top-repos list in a user analysis.
    pub top_repo_count: usize,
    /// Concurrent scrapes in a batch.
    pub concurrency: usize,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            contributor_cap: DEFAULT_CONTRIBUTOR_CAP,
            issue_cap: DEFAULT_ISSUE_CAP,
            issue_state: "open".to_string(),
            user_repo_cap: DEFAULT_USER_REPO_CAP,
            search_cap: DEFAULT_SEARCH_CAP,
            stargazer_cap: DEFAULT_STARGAZER_CAP,
            top_repo_count: DEFAULT_TOP_REPO_COUNT,
            concurrency: DEFAULT_SCRAPE_CONCURRENCY,
        }
    }
}

/// Build the trending search query: `stars:>100`, optionally narrowed to a
/// language.
#[must_use]
pub fn trending_query(language: Option<&str>) -> String {
    match language {
        Some(lang) if !lang.is_empty() => {
            format!("stars:>{TRENDING_STAR_FLOOR} language:{lang}")
        }
        _ => format!("stars:>{TRENDING_STAR_FLOOR}"),
    }
}

/// Derive a [`UserAnalysis`] from a profile and repository listing.
///
/// Pure aggregation: star/fork totals, a primary-language histogram that
/// excludes language-less repos, and the top `top_count` repos by stars.
/// The sort is stable, so ties keep their listing order.
#[must_use]
pub fn analyze_repos(
    profile: &UserProfile,
    repos: &[RepositoryRecord],
    top_count: usize,
) -> UserAnalysis {
    let total_stars = repos.iter().map(|r| r.stars).sum();
    let total_forks = repos.iter().map(|r| r.forks).sum();

    let mut languages: BTreeMap<String, usize> = BTreeMap::new();
    for repo in repos {
        if let Some(lang) = &repo.language {
            *languages.entry(lang.clone()).or_insert(0) += 1;
        }
    }

    let mut top_repos = repos.to_vec();
    top_repos.sort_by(|a, b| b.stars.cmp(&a.stars));
    top_repos.truncate(top_count);

    UserAnalysis {
        username: profile.login.clone(),
        name: profile.name.clone(),
        bio: profile.bio.clone(),
        followers: profile.followers,
        following: profile.following,
        public_repos: profile.public_repos,
        total_stars,
        total_forks,
        languages,
        top_repos,
    }
}

/// Orchestrates multi-endpoint scrapes over one [`GitHubClient`].
///
/// Cloning shares the client (and therefore its quota gate); batch
/// operations rely on that to coordinate throttling across tasks.
#[derive(Clone)]
pub struct Scraper {
    client: GitHubClient,
    options: ScrapeOptions,
}

impl Scraper {
    #[must_use]
    pub fn new(client: GitHubClient) -> Self {
        Self::with_options(client, ScrapeOptions::default())
    }

    #[must_use]
    pub fn with_options(client: GitHubClient, options: ScrapeOptions) -> Self {
        Self { client, options }
    }

    #[must_use]
    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    #[must_use]
    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// Scrape one repository into a [`CompositeRepoRecord`].
    ///
    /// Fetch order: repository metadata, contributor listing, issue
    /// listing, language breakdown. The first sub-fetch error (after
    /// rate-limit retries) aborts the whole composite.
    pub async fn scrape_repo(
        &self,
        owner: &str,
        name: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<CompositeRepoRecord> {
        let label = format!("{owner}/{name}");
        emit(
            on_progress,
            ScrapeProgress::Fetching {
                label: label.clone(),
            },
        );

        let repo = with_retry(
            || self.client.get_repo(owner, name),
            is_rate_limit_error,
            short_error_message,
            &label,
            on_progress,
        )
        .await?;

        let contributors = with_retry(
            || {
                self.client
                    .list_contributors(owner, name, self.options.contributor_cap, on_progress)
            },
            is_rate_limit_error,
            short_error_message,
            &label,
            on_progress,
        )
        .await?;

        let issues = with_retry(
            || {
                self.client.list_issues(
                    owner,
                    name,
                    &self.options.issue_state,
                    self.options.issue_cap,
                    on_progress,
                )
            },
            is_rate_limit_error,
            short_error_message,
            &label,
            on_progress,
        )
        .await?;

        let languages = with_retry(
            || self.client.get_languages(owner, name),
            is_rate_limit_error,
            short_error_message,
            &label,
            on_progress,
        )
        .await?;

        Ok(CompositeRepoRecord {
            repo,
            contributors,
            issues,
            languages,
        })
    }

    /// Analyze a user from their profile and repository listing.
    pub async fn analyze_user(
        &self,
        login: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<UserAnalysis> {
        let profile = with_retry(
            || self.client.get_user(login),
            is_rate_limit_error,
            short_error_message,
            login,
            on_progress,
        )
        .await?;

        let repos = with_retry(
            || {
                self.client
                    .list_user_repos(login, self.options.user_repo_cap, on_progress)
            },
            is_rate_limit_error,
            short_error_message,
            login,
            on_progress,
        )
        .await?;

        Ok(analyze_repos(&profile, &repos, self.options.top_repo_count))
    }

    /// Search for trending repositories, sorted by stars descending.
    ///
    /// `limit` overrides the configured search cap when given.
    pub async fn search_trending(
        &self,
        language: Option<&str>,
        limit: Option<usize>,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<RepositoryRecord>> {
        let cap = limit.unwrap_or(self.options.search_cap);
        let query = trending_query(language);
        self.client.search_repos(&query, cap, on_progress).await
    }

    /// List a repository's stargazer logins, up to the configured cap.
    pub async fn list_stargazers(
        &self,
        owner: &str,
        name: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<String>> {
        self.client
            .list_stargazers(owner, name, self.options.stargazer_cap, on_progress)
            .await
    }

    /// Scrape a batch of unrelated repositories concurrently.
    ///
    /// At most `ScrapeOptions::concurrency` scrapes run at once; all of
    /// them throttle through the shared quota gate. Results come back in
    /// input order, one per target, so a failed target never hides the
    /// others.
    pub async fn scrape_many(
        &self,
        targets: &[(String, String)],
    ) -> Vec<Result<CompositeRepoRecord>> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut handles = Vec::with_capacity(targets.len());

        for (owner, name) in targets {
            let task_semaphore = Arc::clone(&semaphore);
            let scraper = self.clone();
            let owner = owner.clone();
            let name = name.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match task_semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return Err(GitHubError::Internal(
                            "scrape concurrency gate closed".to_string(),
                        ));
                    }
                };
                scraper.scrape_repo(&owner, &name, None).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!("scrape task failed to complete: {e}");
                    results.push(Err(GitHubError::Internal(format!(
                        "scrape task aborted: {e}"
                    ))));
                }
            }
        }
        results
    }
}
