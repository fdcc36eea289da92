//! Per-client rate limiting middleware.
//!
//! A fixed window counter keyed by client IP. The increment-and-compare for
//! a key runs entirely under that key's map entry lock with no await point
//! in between, so two concurrent requests from one client cannot both slip
//! under the ceiling.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Body sent with every rate-limit rejection.
pub const REJECTION_BODY: &str = "Too many requests from this IP, please try again later";

/// Standard (draft RFC) rate-limit headers. No legacy `X-RateLimit-*` set.
pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// One client's window: how many requests it has made and when the window
/// opened.
struct Window {
    count: u32,
    started: Instant,
}

/// Outcome of one increment-and-compare, captured while the entry lock was
/// held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Requests left in the window after this one.
    pub remaining: u32,
    /// Seconds until the window resets.
    pub reset_secs: u64,
}

/// Process-wide window table shared by all in-flight requests.
///
/// Windows are created lazily on a key's first request, reset in place when
/// a request arrives after expiry, and evicted by the background sweeper so
/// idle clients do not pin memory forever.
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
        }
    }

    /// Count this request against `key` and decide whether it may proceed.
    ///
    /// Holds the key's entry lock for the whole increment-and-compare; the
    /// lock is synchronous and never crosses an await point.
    pub fn check(&self, key: IpAddr) -> Decision {
        let mut entry = self.windows.entry(key).or_insert_with(|| Window {
            count: 0,
            started: Instant::now(),
        });

        if entry.started.elapsed() >= self.window {
            entry.count = 0;
            entry.started = Instant::now();
        }

        entry.count = entry.count.saturating_add(1);

        let reset = self.window.saturating_sub(entry.started.elapsed());
        Decision {
            allowed: entry.count <= self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_secs: reset.as_secs().max(1),
        }
    }

    /// Drop windows that have outlived the configured interval.
    pub fn sweep(&self) {
        self.windows.retain(|_, window| window.started.elapsed() < self.window);
    }

    /// Number of live windows; sweeper diagnostics.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Spawn the background eviction task. Stops when the shutdown channel
    /// fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        limiter.sweep();
                        tracing::trace!(
                            tracked = limiter.tracked_clients(),
                            "Swept expired rate-limit windows"
                        );
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });
    }
}

/// Middleware enforcing the per-client ceiling.
///
/// Rejection is a designed control-flow branch, not an error: over-limit
/// clients get a deterministic 429 with the standard headers and a
/// `Retry-After`. Responses that pass the limiter carry the same standard
/// headers so well-behaved clients can pace themselves.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.rate_limit.enabled {
        return next.run(request).await;
    }

    let decision = state.rate_limiter.check(addr.ip());

    if !decision.allowed {
        tracing::warn!(client = %addr.ip(), "Rate limit exceeded");
        metrics::record_rate_limited();

        let mut response = Response::new(Body::from(REJECTION_BODY));
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(header::RETRY_AFTER, HeaderValue::from(decision.reset_secs));
        apply_ratelimit_headers(headers, state.config.rate_limit.max_requests, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_ratelimit_headers(
        response.headers_mut(),
        state.config.rate_limit.max_requests,
        &decision,
    );
    response
}

fn apply_ratelimit_headers(
    headers: &mut axum::http::HeaderMap,
    limit: u32,
    decision: &Decision,
) {
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(decision.reset_secs));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            window_secs,
            max_requests,
            sweep_interval_secs: 60,
        })
    }

    fn key() -> IpAddr {
        "203.0.113.7".parse().unwrap()
    }

    #[test]
    fn requests_under_ceiling_are_allowed() {
        let limiter = limiter(3, 900);
        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check(key());
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }
    }

    #[test]
    fn request_over_ceiling_is_rejected() {
        let limiter = limiter(100, 900);
        for _ in 0..100 {
            assert!(limiter.check(key()).allowed);
        }
        let decision = limiter.check(key());
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter(1, 900);
        let other: IpAddr = "198.51.100.9".parse().unwrap();
        assert!(limiter.check(key()).allowed);
        assert!(!limiter.check(key()).allowed);
        assert!(limiter.check(other).allowed);
    }

    #[test]
    fn window_resets_in_place_after_expiry() {
        let mut limiter = limiter(1, 900);
        limiter.window = Duration::from_millis(30);
        assert!(limiter.check(key()).allowed);
        assert!(!limiter.check(key()).allowed);

        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.check(key()).allowed, "expired window starts fresh");
    }

    #[test]
    fn sweep_evicts_expired_windows_only() {
        let mut limiter = limiter(5, 900);
        limiter.window = Duration::from_millis(30);
        limiter.check(key());
        assert_eq!(limiter.tracked_clients(), 1);

        limiter.sweep();
        assert_eq!(limiter.tracked_clients(), 1, "live window survives a sweep");

        std::thread::sleep(Duration::from_millis(40));
        limiter.sweep();
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn concurrent_requests_cannot_both_slip_under_the_ceiling() {
        let limiter = Arc::new(limiter(50, 900));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(std::thread::spawn(move || {
                (0..25).filter(|_| limiter.check(key()).allowed).count()
            }));
        }
        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 50, "exactly the ceiling is admitted");
    }
}
