//! Rate limiter for login attempts
//!
//! Two sliding windows guard the login endpoint:
//! - failed attempts per email (5 per 15 minutes)
//! - requests per client IP (10 per minute)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;

const EMAIL_MAX_FAILURES: usize = 5;
const EMAIL_WINDOW_MINUTES: i64 = 15;
const IP_MAX_REQUESTS: usize = 10;
const IP_WINDOW_MINUTES: i64 = 1;

/// Timestamps of recent hits per key, pruned to the window on every touch
struct SlidingWindow<K> {
    hits: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
    limit: usize,
    window: Duration,
}

impl<K: Eq + Hash> SlidingWindow<K> {
    fn new(limit: usize, window: Duration) -> Self {
        Self {
            hits: RwLock::new(HashMap::new()),
            limit,
            window,
        }
    }

    async fn is_limited(&self, key: K) -> bool {
        let cutoff = Utc::now() - self.window;
        let mut hits = self.hits.write().await;
        let entry = hits.entry(key).or_default();
        entry.retain(|t| *t > cutoff);
        entry.len() >= self.limit
    }

    async fn record(&self, key: K) {
        self.hits.write().await.entry(key).or_default().push(Utc::now());
    }

    async fn clear(&self, key: &K) {
        self.hits.write().await.remove(key);
    }

    async fn prune(&self) -> usize {
        let cutoff = Utc::now() - self.window;
        let mut hits = self.hits.write().await;
        hits.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
        hits.len()
    }
}

/// Login rate limiter
pub struct LoginRateLimiter {
    failures_by_email: SlidingWindow<String>,
    requests_by_ip: SlidingWindow<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            failures_by_email: SlidingWindow::new(
                EMAIL_MAX_FAILURES,
                Duration::minutes(EMAIL_WINDOW_MINUTES),
            ),
            requests_by_ip: SlidingWindow::new(IP_MAX_REQUESTS, Duration::minutes(IP_WINDOW_MINUTES)),
        }
    }

    /// Whether this email has too many recent failures
    pub async fn is_email_limited(&self, email: &str) -> bool {
        self.failures_by_email.is_limited(email.trim().to_lowercase()).await
    }

    pub async fn record_failed_attempt(&self, email: &str) {
        self.failures_by_email.record(email.trim().to_lowercase()).await;
    }

    /// Forget failures after a successful login
    pub async fn clear_email_attempts(&self, email: &str) {
        self.failures_by_email.clear(&email.trim().to_lowercase()).await;
    }

    /// Whether this IP has made too many requests in the last minute
    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        self.requests_by_ip.is_limited(ip).await
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.requests_by_ip.record(ip).await;
    }

    /// Drop expired entries; returns how many keys are still tracked
    pub async fn cleanup(&self) -> usize {
        self.failures_by_email.prune().await + self.requests_by_ip.prune().await
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
