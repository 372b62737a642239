//! octoharvest - rate-limit-aware scraping of repository data.
//!
//! This library collects structured data about hosted repositories, their
//! contributors, issues, and stargazers from the GitHub REST API. It walks
//! paginated listings, throttles against the quota advertised in response
//! headers, and composes independent endpoint fetches into composite
//! records for downstream analytics.
//!
//! # Example
//!
//! ```ignore
//! use octoharvest::{ClientConfig, GitHubClient, Scraper};
//!
//! let client = GitHubClient::new(ClientConfig::new().token_from_env())?;
//! let scraper = Scraper::new(client);
//!
//! // One repository with contributors, issues, and languages.
//! let composite = scraper.scrape_repo("rust-lang", "rust", None).await?;
//!
//! // Aggregate view of a user's owned repositories.
//! let analysis = scraper.analyze_user("octocat", None).await?;
//!
//! // Trending repositories for a language.
//! let trending = scraper.search_trending(Some("rust"), None, None).await?;
//! ```
//!
//! A failed composite scrape yields no record at all; callers wanting
//! partial results use the per-endpoint methods on [`GitHubClient`]
//! directly. Dropping an in-flight future cancels the scrape at its next
//! suspension point and releases the connection pool with the last client
//! handle.

pub mod github;
pub mod http;
pub mod progress;
pub mod records;
pub mod retry;
pub mod scrape;

pub use github::{ClientConfig, GitHubClient, GitHubError, QuotaGate, RateLimitInfo, Result};
pub use progress::{ProgressCallback, ScrapeProgress};
pub use records::{
    CompositeRepoRecord, ContributorRecord, IssueRecord, RepositoryRecord, UserAnalysis,
    UserProfile,
};
pub use scrape::{ScrapeOptions, Scraper, trending_query};
