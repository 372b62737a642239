//! Quota tracking and request pacing.
//!
//! Two cooperating mechanisms:
//!
//! - [`QuotaGate`]: advisory throttling driven by the rate-limit headers the
//!   API attaches to every response. When the advertised remaining quota
//!   drops below [`LOW_WATER_MARK`], the gate pauses the next request until
//!   the advertised reset time. All concurrent fetches share one gate, so
//!   the read-then-act decision happens at a single synchronized point.
//! - [`ApiRateLimiter`]: optional proactive requests-per-second pacing,
//!   independent of response headers.
//!
//! Throttling is advisory. A hard quota rejection still surfaces as an
//! error and is never retried at this layer.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::http::{HttpHeaders, header_get};
use crate::progress::{ProgressCallback, ScrapeProgress, emit};

/// Remaining-quota threshold below which the gate starts pausing.
pub const LOW_WATER_MARK: usize = 5;

/// Rate limit information advertised by a response.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per window.
    pub limit: usize,
    /// Remaining requests in the current window.
    pub remaining: usize,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

/// Extract rate limit info from response headers.
///
/// Returns `None` when any of the three `x-ratelimit-*` headers is missing
/// or unparseable; the gate then simply keeps its previous view.
pub fn parse_rate_limit_headers(headers: &HttpHeaders) -> Option<RateLimitInfo> {
    let limit = header_get(headers, "x-ratelimit-limit")?
        .parse::<usize>()
        .ok()?;
    let remaining = header_get(headers, "x-ratelimit-remaining")?
        .parse::<usize>()
        .ok()?;
    let reset_epoch = header_get(headers, "x-ratelimit-reset")?
        .parse::<i64>()
        .ok()?;
    let reset_at = DateTime::from_timestamp(reset_epoch, 0).unwrap_or_else(Utc::now);
    Some(RateLimitInfo {
        limit,
        remaining,
        reset_at,
    })
}

/// The pure throttling decision: how long to pause before the next request
/// given the latest observed quota state.
///
/// Below the low-water mark the pause lasts until the advertised reset
/// (never negative); otherwise no pause.
#[must_use]
pub fn throttle_delay(info: &RateLimitInfo, now: DateTime<Utc>) -> StdDuration {
    if info.remaining >= LOW_WATER_MARK {
        return StdDuration::ZERO;
    }
    (info.reset_at - now).to_std().unwrap_or(StdDuration::ZERO)
}

/// Shared quota gate consulted before every request.
///
/// Cloning yields handles to the same underlying state, so a batch of
/// concurrent scrapes makes its throttling decisions through one
/// coordination point instead of each acting on a privately observed (and
/// possibly stale) remaining count.
#[derive(Clone, Default)]
pub struct QuotaGate {
    latest: Arc<Mutex<Option<RateLimitInfo>>>,
}

impl QuotaGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the quota view from a response's headers.
    pub fn observe(&self, headers: &HttpHeaders) {
        if let Some(info) = parse_rate_limit_headers(headers) {
            let mut latest = self
                .latest
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *latest = Some(info);
        }
    }

    /// The pause the gate would impose right now.
    #[must_use]
    pub fn pending_delay(&self, now: DateTime<Utc>) -> StdDuration {
        let latest = self
            .latest
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        latest
            .as_ref()
            .map(|info| throttle_delay(info, now))
            .unwrap_or(StdDuration::ZERO)
    }

    /// Last observed remaining count, if any response has been seen.
    #[must_use]
    pub fn remaining(&self) -> Option<usize> {
        let latest = self
            .latest
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        latest.as_ref().map(|info| info.remaining)
    }

    /// Suspend until the gate allows the next request.
    ///
    /// The delay is computed under the lock, the sleep happens outside it.
    /// Cancellation takes effect at the sleep's await point.
    pub async fn pace(&self, on_progress: Option<&ProgressCallback>) {
        let (delay, remaining) = {
            let latest = self
                .latest
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            match latest.as_ref() {
                Some(info) => (throttle_delay(info, Utc::now()), info.remaining),
                None => (StdDuration::ZERO, 0),
            }
        };

        if delay.is_zero() {
            return;
        }

        tracing::warn!(
            remaining,
            wait_secs = delay.as_secs(),
            "quota low, pausing before next request"
        );
        emit(
            on_progress,
            ScrapeProgress::QuotaWait {
                remaining,
                wait_ms: delay.as_millis() as u64,
            },
        );
        tokio::time::sleep(delay).await;
    }
}

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Proactive requests-per-second pacer using the governor crate.
///
/// Applied before the header-driven gate when configured; useful to stay
/// under secondary limits when fanning out many concurrent scrapes.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a limiter allowing `requests_per_second` requests (a value of
    /// 0 is treated as 1).
    #[must_use]
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// Suspend until the limiter allows another request.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}
