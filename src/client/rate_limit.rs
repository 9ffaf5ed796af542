use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::error::{ClientError, ClientResult};
use super::storage::LocalStorage;
use crate::models::user::normalize_email;

const KEY_PREFIX: &str = "gymlog.login_attempts.";

/// Failed sign-in attempts per email in a sliding window, kept in local
/// storage as a JSON array of millisecond timestamps.
pub struct LoginRateLimiter {
    storage: Arc<dyn LocalStorage>,
    max_attempts: usize,
    window: Duration,
}

impl LoginRateLimiter {
    pub fn new(storage: Arc<dyn LocalStorage>, max_attempts: usize, window: Duration) -> Self {
        Self {
            storage,
            max_attempts,
            window,
        }
    }

    fn key(email: &str) -> String {
        format!("{}{}", KEY_PREFIX, normalize_email(email))
    }

    fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }

    /// Attempts still inside the window, oldest first.
    fn recent(&self, email: &str, now: DateTime<Utc>) -> Vec<i64> {
        let Some(raw) = self.storage.get_item(&Self::key(email)) else {
            return Vec::new();
        };
        let mut attempts: Vec<i64> = serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable login attempts: {}", e);
            Vec::new()
        });

        let cutoff = now.timestamp_millis().saturating_sub(self.window_ms());
        attempts.retain(|&at| at > cutoff);
        attempts.sort_unstable();
        attempts
    }

    fn store(&self, email: &str, attempts: &[i64]) -> ClientResult<()> {
        let key = Self::key(email);
        if attempts.is_empty() {
            return self.storage.remove_item(&key);
        }
        let json = serde_json::to_string(attempts).map_err(ClientError::storage)?;
        self.storage.set_item(&key, &json)
    }

    pub fn check(&self, email: &str) -> ClientResult<()> {
        self.check_at(email, Utc::now())
    }

    /// Refuse once `max_attempts` failures sit inside the window.
    pub fn check_at(&self, email: &str, now: DateTime<Utc>) -> ClientResult<()> {
        let attempts = self.recent(email, now);
        if self.max_attempts == 0 || attempts.len() < self.max_attempts {
            return Ok(());
        }

        // The block lifts when the oldest counted attempt leaves the window
        let oldest = attempts[attempts.len() - self.max_attempts];
        let wait_ms = (oldest + self.window_ms() - now.timestamp_millis()).max(0);
        tracing::warn!("Sign-in rate limit hit for {}", normalize_email(email));
        Err(ClientError::rate_limited(Duration::from_millis(
            wait_ms.unsigned_abs(),
        )))
    }

    pub fn record_failure(&self, email: &str) -> ClientResult<()> {
        self.record_failure_at(email, Utc::now())
    }

    pub fn record_failure_at(&self, email: &str, now: DateTime<Utc>) -> ClientResult<()> {
        let mut attempts = self.recent(email, now);
        attempts.push(now.timestamp_millis());
        self.store(email, &attempts)
    }

    pub fn remaining_attempts_at(&self, email: &str, now: DateTime<Utc>) -> usize {
        self.max_attempts
            .saturating_sub(self.recent(email, now).len())
    }

    pub fn reset(&self, email: &str) -> ClientResult<()> {
        self.storage.remove_item(&Self::key(email))
    }
}
