//! Output records handed to downstream consumers.
//!
//! Every record is a plain value object copied out of API responses at
//! scrape time. Nothing here is cached or merged across scrapes; each
//! invocation produces an independent snapshot. Timestamps stay as the
//! ISO-8601 strings the API returned. Maps are `BTreeMap` so serialized
//! output is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single repository's metadata.
///
/// `full_name` ("owner/name") uniquely identifies the repository on the
/// remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub name: String,
    pub owner: String,
    pub full_name: String,
    pub description: String,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    /// Primary language, absent for repos the service has not classified.
    pub language: Option<String>,
    /// License name, absent for unlicensed repos.
    pub license: Option<String>,
    pub topics: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub pushed_at: String,
    pub url: String,
}

/// One contributor within a single repository's contributor listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRecord {
    pub login: String,
    pub avatar_url: String,
    pub contributions: u64,
    pub url: String,
}

/// An issue. Pull requests never appear here; they are filtered out at
/// mapping time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub number: u64,
    pub title: String,
    /// "open" or "closed".
    pub state: String,
    pub author: String,
    pub created_at: String,
    pub closed_at: Option<String>,
    pub labels: Vec<String>,
    pub comments: u64,
}

/// Everything scraped for one repository in one pass: metadata plus the
/// contributor listing, issue listing, and language byte counts.
///
/// Assembled atomically by the aggregator; a sub-fetch failure yields no
/// record at all rather than a partial one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeRepoRecord {
    pub repo: RepositoryRecord,
    pub contributors: Vec<ContributorRecord>,
    pub issues: Vec<IssueRecord>,
    /// Language name to byte count, as reported by the language endpoint.
    pub languages: BTreeMap<String, u64>,
}

/// A user's profile as returned by the user endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub public_repos: u64,
    pub avatar_url: String,
    pub url: String,
}

/// Aggregate view of a user derived from their profile and repository
/// listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAnalysis {
    pub username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub public_repos: u64,
    /// Sum of stars across the listed repositories.
    pub total_stars: u64,
    /// Sum of forks across the listed repositories.
    pub total_forks: u64,
    /// Primary language to owned-repo count; repos without a primary
    /// language are excluded.
    pub languages: BTreeMap<String, usize>,
    /// Top repositories by stars, ties kept in listing order.
    pub top_repos: Vec<RepositoryRecord>,
}
