//! Conversion from raw API payloads to output records.
//!
//! Each mapper is a pure, total function over one `serde_json::Value` item:
//! every absent or mistyped field falls back to a documented default rather
//! than failing, so one malformed item can never abort mapping of its
//! siblings. Partial metadata beats a dropped entity.
//!
//! Defaults: missing strings map to `""`, missing counts to `0`, missing
//! `language`/`license`/`closed_at` to `None`, missing `topics`/`labels` to
//! empty lists.

use serde_json::Value;

use crate::records::{ContributorRecord, IssueRecord, RepositoryRecord, UserProfile};

fn str_field(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_str_field(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(Value::as_str).map(String::from)
}

fn u64_field(item: &Value, key: &str) -> u64 {
    item.get(key).and_then(Value::as_u64).unwrap_or_default()
}

fn str_list_field(item: &Value, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Map a repository payload to a [`RepositoryRecord`].
///
/// The owner comes from `owner.login`, falling back to the prefix of
/// `full_name` when the payload carries no owner object.
pub fn map_repository(item: &Value) -> RepositoryRecord {
    let full_name = str_field(item, "full_name");
    let owner = item
        .get("owner")
        .and_then(|o| o.get("login"))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| {
            full_name
                .split_once('/')
                .map(|(owner, _)| owner.to_string())
                .unwrap_or_default()
        });

    RepositoryRecord {
        name: str_field(item, "name"),
        owner,
        full_name,
        description: str_field(item, "description"),
        stars: u64_field(item, "stargazers_count"),
        forks: u64_field(item, "forks_count"),
        watchers: u64_field(item, "watchers_count"),
        open_issues: u64_field(item, "open_issues_count"),
        language: opt_str_field(item, "language"),
        license: item
            .get("license")
            .and_then(|l| l.get("name"))
            .and_then(Value::as_str)
            .map(String::from),
        topics: str_list_field(item, "topics"),
        created_at: str_field(item, "created_at"),
        updated_at: str_field(item, "updated_at"),
        pushed_at: str_field(item, "pushed_at"),
        url: str_field(item, "html_url"),
    }
}

/// Map a contributor-listing item to a [`ContributorRecord`].
pub fn map_contributor(item: &Value) -> ContributorRecord {
    ContributorRecord {
        login: str_field(item, "login"),
        avatar_url: str_field(item, "avatar_url"),
        contributions: u64_field(item, "contributions"),
        url: str_field(item, "html_url"),
    }
}

/// Map an issue-listing item to an [`IssueRecord`].
///
/// The issue listing endpoint interleaves pull requests; any item carrying
/// the `pull_request` marker yields `None` and is dropped by the caller.
pub fn map_issue(item: &Value) -> Option<IssueRecord> {
    if item.get("pull_request").is_some() {
        return None;
    }

    let labels = item
        .get("labels")
        .and_then(Value::as_array)
        .map(|labels| labels.iter().map(|l| str_field(l, "name")).collect())
        .unwrap_or_default();

    Some(IssueRecord {
        number: u64_field(item, "number"),
        title: str_field(item, "title"),
        state: str_field(item, "state"),
        author: item
            .get("user")
            .map(|u| str_field(u, "login"))
            .unwrap_or_default(),
        created_at: str_field(item, "created_at"),
        closed_at: opt_str_field(item, "closed_at"),
        labels,
        comments: u64_field(item, "comments"),
    })
}

/// Map a stargazer-listing item to the stargazer's login.
pub fn map_stargazer(item: &Value) -> String {
    str_field(item, "login")
}

/// Map a user payload to a [`UserProfile`].
pub fn map_user_profile(item: &Value) -> UserProfile {
    UserProfile {
        login: str_field(item, "login"),
        name: opt_str_field(item, "name"),
        bio: opt_str_field(item, "bio"),
        followers: u64_field(item, "followers"),
        following: u64_field(item, "following"),
        public_repos: u64_field(item, "public_repos"),
        avatar_url: str_field(item, "avatar_url"),
        url: str_field(item, "html_url"),
    }
}
