//! Progress events emitted during scrape operations.

/// Progress events emitted while fetching.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ScrapeProgress {
    /// Starting a paginated walk or a composite fetch.
    Fetching {
        /// What is being fetched (e.g. "rust-lang/rust contributors").
        label: String,
    },

    /// Fetched one page of a paginated listing.
    FetchedPage {
        label: String,
        /// Page number (1-indexed).
        page: u32,
        /// Items on this page.
        count: usize,
        /// Running total of items accumulated so far.
        total_so_far: usize,
    },

    /// A paginated walk finished.
    FetchComplete {
        label: String,
        /// Total items accumulated.
        total: usize,
    },

    /// The quota gate is pausing before the next request.
    QuotaWait {
        /// Remaining requests reported by the last response.
        remaining: usize,
        /// How long the pause will last (ms).
        wait_ms: u64,
    },

    /// A rate-limited operation is backing off before a retry.
    RateLimitBackoff {
        label: String,
        /// Time until the retry (ms).
        retry_after_ms: u64,
        /// Attempt number about to be retried.
        attempt: u32,
    },
}

/// Callback for progress updates.
pub type ProgressCallback = Box<dyn Fn(ScrapeProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: ScrapeProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
