//! Login session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side session; `id` is the opaque token carried by the cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user_id` that lasts `ttl`
    pub fn start(user_id: i64, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Seconds until expiry, for the cookie `Max-Age`
    pub fn max_age_seconds(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_live() {
        let session = Session::start(7, Duration::days(7));
        assert!(!session.is_expired());
        assert!(session.max_age_seconds() > 6 * 24 * 3600);
    }

    #[test]
    fn test_negative_ttl_is_expired() {
        let session = Session::start(7, Duration::seconds(-5));
        assert!(session.is_expired());
        assert_eq!(session.max_age_seconds(), 0);
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = Session::start(1, Duration::days(1));
        let b = Session::start(1, Duration::days(1));
        assert_ne!(a.id, b.id);
    }
}
