//! Quota rules. The same limits are enforced by triggers in the schema.

use crate::error::{AppError, Result};

pub const MAX_SESSIONS_PER_DAY: i64 = 5;
pub const MAX_SETS_PER_SESSION: i64 = 50;

/// `existing` is the number of sessions the user already has on that calendar day.
pub fn ensure_daily_session_quota(existing: i64) -> Result<()> {
    if existing >= MAX_SESSIONS_PER_DAY {
        tracing::debug!("Daily session quota reached ({} sessions)", existing);
        return Err(AppError::DailyLimitExceeded);
    }
    Ok(())
}

pub fn ensure_set_quota(existing: i64) -> Result<()> {
    if existing >= MAX_SETS_PER_SESSION {
        tracing::debug!("Set quota reached ({} sets)", existing);
        return Err(AppError::SetLimitExceeded);
    }
    Ok(())
}
