use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{
    CreateWorkoutSession, Page, SessionDetail, SessionTotals, SessionWithTotals,
    UpdateWorkoutSession, WorkoutSession,
};
use crate::repositories::DateRange;
use crate::rules::ensure_daily_session_quota;
use crate::state::AppState;
use crate::validation::{
    page_offset, validate_date_range, validate_new_session, validate_session_update,
};

const DEFAULT_PER_PAGE: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<i64>,
    per_page: Option<i64>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

/// Fetch a session the caller owns. Sessions of other users look missing.
pub(crate) async fn load_owned_session(
    state: &AppState,
    user_id: &str,
    id: &str,
) -> Result<WorkoutSession> {
    let session = state
        .workout_repo
        .find_session_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Workout not found".to_string()))?;

    if session.user_id != user_id {
        return Err(AppError::NotFound("Workout not found".to_string()));
    }

    Ok(session)
}

pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<SessionWithTotals>>> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
    let offset = page_offset(page, per_page)?;
    validate_date_range(query.from, query.to)?;

    let range = DateRange {
        from: query.from,
        to: query.to,
    };
    let sessions = state
        .workout_repo
        .find_sessions_by_user_paginated(&auth_user.id, range, per_page, offset)
        .await?;
    let total = state
        .workout_repo
        .count_sessions_by_user(&auth_user.id, range)
        .await?;

    Ok(Json(Page::new(sessions, page, per_page, total)))
}

pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<CreateWorkoutSession>,
) -> Result<(StatusCode, Json<WorkoutSession>)> {
    validate_new_session(&input)?;

    let same_day = state
        .workout_repo
        .count_sessions_on_day(&auth_user.id, input.performed_at, None)
        .await?;
    ensure_daily_session_quota(same_day)?;

    let session = state
        .workout_repo
        .create_session(&auth_user.id, &input)
        .await?;
    tracing::debug!("Created session {} for {}", session.id, auth_user.id);

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn show(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>> {
    let session = load_owned_session(&state, &auth_user.id, &id).await?;
    let sets = state.set_repo.find_sets_by_session(&id).await?;
    let totals = SessionTotals::from_sets(&sets);

    Ok(Json(SessionDetail {
        session,
        sets,
        totals,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateWorkoutSession>,
) -> Result<Json<WorkoutSession>> {
    validate_session_update(&input)?;
    let existing = load_owned_session(&state, &auth_user.id, &id).await?;

    if existing.performed_at.date_naive() != input.performed_at.date_naive() {
        let same_day = state
            .workout_repo
            .count_sessions_on_day(&auth_user.id, input.performed_at, Some(&id))
            .await?;
        ensure_daily_session_quota(same_day)?;
    }

    state
        .workout_repo
        .update_session(&id, &auth_user.id, &input)
        .await?;

    let updated = load_owned_session(&state, &auth_user.id, &id).await?;
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.workout_repo.delete_session(&id, &auth_user.id).await? {
        return Err(AppError::NotFound("Workout not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
