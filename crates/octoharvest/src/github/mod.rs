//! GitHub API client for scraping repository data.
//!
//! # Module Structure
//!
//! - [`error`] - Error taxonomy for API operations
//! - [`client`] - Client configuration and the authenticated request primitive
//! - [`ratelimit`] - Quota gate and proactive pacing
//! - [`paginate`] - Paginated walks over listing endpoints
//! - [`convert`] - Mapping raw payloads to output records
//!
//! Composite operations (scraping a whole repository, analyzing a user)
//! live in [`crate::scrape`].

mod client;
mod convert;
mod error;
mod paginate;
mod ratelimit;

pub use client::{ClientConfig, DEFAULT_TIMEOUT, GITHUB_API_URL, GitHubClient, TOKEN_ENV_VAR};
pub use convert::{map_contributor, map_issue, map_repository, map_stargazer, map_user_profile};
pub use error::{GitHubError, Result, is_rate_limit_error, short_error_message};
pub use paginate::{DEFAULT_PAGE_SIZE, PageShape, PageWalk};
pub use ratelimit::{
    ApiRateLimiter, LOW_WATER_MARK, QuotaGate, RateLimitInfo, parse_rate_limit_headers,
    throttle_delay,
};
