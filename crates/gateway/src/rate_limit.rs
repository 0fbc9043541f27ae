//! Token-bucket rate limiting, keyed per client (best effort).
//!
//! Each bucket starts full at `burst` tokens and refills at `rps`
//! tokens per second; a request costs one token. The bucket map is
//! cleaned up opportunistically so a churn of one-off clients cannot
//! grow it without bound.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};

const IDLE_EVICTION: Duration = Duration::from_secs(600);
const CLEANUP_THRESHOLD: usize = 4096;

pub struct RateLimiter {
    rps: f64,
    burst: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
}

struct Bucket {
    tokens: f64,
    last: Instant,
    last_hit: Instant,
}

impl RateLimiter {
    /// Non-positive arguments fall back to 5 rps / burst 10.
    pub fn new(rps: f64, burst: u32) -> Self {
        let rps = if rps <= 0.0 { 5.0 } else { rps };
        let burst = if burst == 0 { 10.0 } else { f64::from(burst) };
        Self { rps, burst, buckets: Mutex::new(HashMap::new()) }
    }

    /// Whether `key` may proceed right now.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Same as [`allow`](Self::allow) with an explicit clock, so tests
    /// can simulate elapsed time without sleeping.
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        // Lazy cleanup to prevent unbounded growth.
        if buckets.len() > CLEANUP_THRESHOLD {
            buckets.retain(|_, b| now.saturating_duration_since(b.last_hit) <= IDLE_EVICTION);
        }

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.burst,
            last: now,
            last_hit: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last).as_secs_f64();
        if elapsed > 0.0 {
            bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.burst);
            bucket.last = now;
        }
        bucket.last_hit = now;

        if bucket.tokens < 1.0 {
            return false;
        }
        bucket.tokens -= 1.0;
        true
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets.lock().unwrap().len()
    }
}

/// Derive a per-client key for the limiter.
///
/// Behind a reverse proxy the left-most `X-Forwarded-For` entry is the
/// original client; otherwise fall back to `X-Real-IP`, then the socket
/// peer address.
pub fn client_key(request: &Request) -> String {
    if let Some(forwarded) = header_str(request, "x-forwarded-for")
        && let Some(first) = forwarded.split(',').next()
    {
        let ip = first.trim();
        if !ip.is_empty() {
            return ip.to_string();
        }
    }

    if let Some(real_ip) = header_str(request, "x-real-ip") {
        let ip = real_ip.trim();
        if !ip.is_empty() {
            return ip.to_string();
        }
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

fn header_str<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_deny_then_refill() {
        let limiter = RateLimiter::new(5.0, 10);
        let now = Instant::now();

        let allowed = (0..15).filter(|_| limiter.allow_at("client", now)).count();
        assert_eq!(allowed, 10);

        // One simulated second refills rps tokens.
        let later = now + Duration::from_secs(1);
        let allowed = (0..10).filter(|_| limiter.allow_at("client", later)).count();
        assert!(allowed >= 5);
    }

    #[test]
    fn refill_is_capped_at_burst() {
        let limiter = RateLimiter::new(5.0, 10);
        let now = Instant::now();
        assert!(limiter.allow_at("client", now));

        let much_later = now + Duration::from_secs(3600);
        let allowed = (0..20).filter(|_| limiter.allow_at("client", much_later)).count();
        assert_eq!(allowed, 10);
    }

    #[test]
    fn clients_have_independent_buckets() {
        let limiter = RateLimiter::new(5.0, 2);
        let now = Instant::now();

        assert!(limiter.allow_at("a", now));
        assert!(limiter.allow_at("a", now));
        assert!(!limiter.allow_at("a", now));
        assert!(limiter.allow_at("b", now));
    }

    #[test]
    fn non_positive_settings_fall_back_to_defaults() {
        let limiter = RateLimiter::new(0.0, 0);
        let now = Instant::now();
        let allowed = (0..15).filter(|_| limiter.allow_at("client", now)).count();
        assert_eq!(allowed, 10);
    }

    #[test]
    fn idle_buckets_are_evicted_once_the_map_is_large() {
        let limiter = RateLimiter::new(5.0, 10);
        let now = Instant::now();
        for i in 0..=CLEANUP_THRESHOLD {
            limiter.allow_at(&format!("client-{i}"), now);
        }
        assert!(limiter.bucket_count() > CLEANUP_THRESHOLD);

        let later = now + IDLE_EVICTION + Duration::from_secs(1);
        limiter.allow_at("fresh", later);
        assert_eq!(limiter.bucket_count(), 1);
    }

    #[test]
    fn key_prefers_leftmost_forwarded_for() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .header("X-Real-IP", "198.51.100.2")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "203.0.113.7");
    }

    #[test]
    fn key_falls_back_to_real_ip_then_unknown() {
        let request = Request::builder()
            .header("X-Real-IP", " 198.51.100.2 ")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "198.51.100.2");

        let bare = Request::builder().body(axum::body::Body::empty()).unwrap();
        assert_eq!(client_key(&bare), "unknown");
    }

    #[test]
    fn key_uses_peer_address_when_no_headers() {
        let mut request = Request::builder().body(axum::body::Body::empty()).unwrap();
        let addr: SocketAddr = "192.0.2.9:54321".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_key(&request), "192.0.2.9");
    }
}
