//! Input checks that run before any store access or network call.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{
    CreateExerciseSet, CreateWorkoutSession, UpdateExerciseSet, UpdateWorkoutSession,
};

pub const MAX_EMAIL_LEN: usize = 254;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_LOCATION_LEN: usize = 100;
pub const MIN_REPS: i32 = 1;
pub const MAX_REPS: i32 = 1000;
pub const MIN_WEIGHT: f64 = 0.0;
pub const MAX_WEIGHT: f64 = 1000.0;
pub const MAX_PER_PAGE: i64 = 50;

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(AppError::Validation(format!(
            "Email must be at most {} characters",
            MAX_EMAIL_LEN
        )));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::Validation("Email is invalid".to_string())),
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at most {} characters",
            MAX_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> Result<()> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(AppError::Validation(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        ))),
        _ => Ok(()),
    }
}

pub fn validate_location(location: Option<&str>) -> Result<()> {
    match location {
        Some(l) if l.chars().count() > MAX_LOCATION_LEN => Err(AppError::Validation(format!(
            "Location must be at most {} characters",
            MAX_LOCATION_LEN
        ))),
        _ => Ok(()),
    }
}

pub fn validate_reps(reps: i32) -> Result<()> {
    if !(MIN_REPS..=MAX_REPS).contains(&reps) {
        return Err(AppError::Validation(format!(
            "Reps must be between {} and {}",
            MIN_REPS, MAX_REPS
        )));
    }
    Ok(())
}

pub fn validate_weight(weight: f64) -> Result<()> {
    if !weight.is_finite() || !(MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
        return Err(AppError::Validation(format!(
            "Weight must be between {} and {}",
            MIN_WEIGHT, MAX_WEIGHT
        )));
    }
    Ok(())
}

pub fn validate_pagination(page: i64, per_page: i64) -> Result<()> {
    page_offset(page, per_page).map(|_| ())
}

/// Row offset for a 1-based page. Pages past what an `i64` offset can
/// address are rejected.
pub fn page_offset(page: i64, per_page: i64) -> Result<i64> {
    if page < 1 {
        return Err(AppError::Validation("Page must be at least 1".to_string()));
    }
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(AppError::Validation(format!(
            "Page size must be between 1 and {}",
            MAX_PER_PAGE
        )));
    }
    (page - 1)
        .checked_mul(per_page)
        .ok_or_else(|| AppError::Validation("Page is out of range".to_string()))
}

pub fn validate_date_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::Validation(
                "Range start must not be after its end".to_string(),
            ));
        }
    }
    Ok(())
}

pub fn validate_new_session(input: &CreateWorkoutSession) -> Result<()> {
    validate_description(input.description.as_deref())?;
    validate_location(input.location.as_deref())
}

pub fn validate_session_update(input: &UpdateWorkoutSession) -> Result<()> {
    validate_description(input.description.as_deref())?;
    validate_location(input.location.as_deref())
}

pub fn validate_new_set(input: &CreateExerciseSet) -> Result<()> {
    if input.exercise_id.trim().is_empty() {
        return Err(AppError::Validation("Exercise is required".to_string()));
    }
    validate_reps(input.reps)?;
    validate_weight(input.weight)
}

pub fn validate_set_update(input: &UpdateExerciseSet) -> Result<()> {
    validate_reps(input.reps)?;
    validate_weight(input.weight)
}
