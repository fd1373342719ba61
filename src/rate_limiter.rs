//! Admission control for state changes sent to the assistant
//!
//! Each endpoint may change at most [`HOURLY_LIMIT`] times per clock hour,
//! and all endpoints together at most [`DAILY_LIMIT`] times per UTC day.
//! Counters live in memory only; a restart resets them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::response::DirectiveError;

/// Changes allowed per endpoint and clock hour
pub const HOURLY_LIMIT: u32 = 60;

/// Changes allowed over all endpoints per day
pub const DAILY_LIMIT: u32 = 1000;

const SECONDS_PER_HOUR: i64 = 3600;

/// Rejection reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// One endpoint changed too often within the current hour
    #[error("hourly device rate limit of {HOURLY_LIMIT} changes exceeded")]
    HourlyDeviceRateLimitExceeded,

    /// All endpoints together changed too often today
    #[error("overall daily rate limit of {DAILY_LIMIT} changes exceeded")]
    OverallDailyRateLimitExceeded,
}

impl From<RateLimitError> for DirectiveError {
    fn from(e: RateLimitError) -> Self {
        Self::Throttling(e.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
struct Usage {
    hour: i64,
    hour_changes: u32,
    day: NaiveDate,
    day_changes: u32,
}

/// Per-endpoint change counter
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    usage: Arc<Mutex<HashMap<String, Usage>>>,
}

impl RateLimiter {
    /// Create an empty limiter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one change of `endpoint_id` now
    ///
    /// # Errors
    ///
    /// Returns error if the hourly or daily limit is exceeded
    pub fn increment_and_get(&self, endpoint_id: &str) -> Result<u32, RateLimitError> {
        self.increment_and_get_at(endpoint_id, Utc::now())
    }

    /// Count one change of `endpoint_id` at `now`; returns the endpoint's
    /// count in the current hour
    ///
    /// # Errors
    ///
    /// Returns error if the hourly or daily limit is exceeded
    pub fn increment_and_get_at(
        &self,
        endpoint_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u32, RateLimitError> {
        let hour = now.timestamp().div_euclid(SECONDS_PER_HOUR);
        let day = now.date_naive();

        let mut usage = self.usage.lock().unwrap_or_else(|e| e.into_inner());
        let entry = usage.entry(endpoint_id.to_string()).or_insert(Usage {
            hour,
            hour_changes: 0,
            day,
            day_changes: 0,
        });

        if entry.hour != hour {
            entry.hour = hour;
            entry.hour_changes = 0;
        }
        if entry.day != day {
            entry.day = day;
            entry.day_changes = 0;
        }
        entry.hour_changes += 1;
        entry.day_changes += 1;
        let changes = entry.hour_changes;

        if changes > HOURLY_LIMIT {
            tracing::debug!(endpoint_id, changes, "hourly rate limit exceeded");
            return Err(RateLimitError::HourlyDeviceRateLimitExceeded);
        }

        let daily: u32 = usage
            .values()
            .filter(|u| u.day == day)
            .map(|u| u.day_changes)
            .sum();
        if daily > DAILY_LIMIT {
            tracing::debug!(endpoint_id, daily, "daily rate limit exceeded");
            return Err(RateLimitError::OverallDailyRateLimitExceeded);
        }

        Ok(changes)
    }

    /// Changes of `endpoint_id` counted in the hour of `now`
    #[must_use]
    pub fn usage_at(&self, endpoint_id: &str, now: DateTime<Utc>) -> u32 {
        let hour = now.timestamp().div_euclid(SECONDS_PER_HOUR);
        self.usage
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(endpoint_id)
            .filter(|u| u.hour == hour)
            .map_or(0, |u| u.hour_changes)
    }
}
