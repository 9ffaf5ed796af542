use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::sessions::load_owned_session;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{CreateExerciseSet, ExerciseSet, UpdateExerciseSet};
use crate::rules::ensure_set_quota;
use crate::state::AppState;
use crate::validation::{validate_new_set, validate_set_update};

pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(session_id): Path<String>,
    Json(input): Json<CreateExerciseSet>,
) -> Result<(StatusCode, Json<ExerciseSet>)> {
    validate_new_set(&input)?;
    load_owned_session(&state, &auth_user.id, &session_id).await?;

    if state.exercise_repo.find_by_id(&input.exercise_id).await?.is_none() {
        return Err(AppError::NotFound("Exercise not found".to_string()));
    }

    let existing = state.set_repo.count_sets(&session_id).await?;
    ensure_set_quota(existing)?;

    let set = state.set_repo.create_set(&session_id, &input).await?;
    Ok((StatusCode::CREATED, Json(set)))
}

pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((session_id, set_id)): Path<(String, String)>,
    Json(input): Json<UpdateExerciseSet>,
) -> Result<Json<ExerciseSet>> {
    validate_set_update(&input)?;
    load_owned_session(&state, &auth_user.id, &session_id).await?;

    if !state
        .set_repo
        .update_set(&set_id, &session_id, &input)
        .await?
    {
        return Err(AppError::NotFound("Set not found".to_string()));
    }

    let set = state
        .set_repo
        .find_set_by_id(&set_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Set not found".to_string()))?;
    Ok(Json(set))
}

pub async fn delete(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((session_id, set_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    load_owned_session(&state, &auth_user.id, &session_id).await?;

    if !state.set_repo.delete_set(&set_id, &session_id).await? {
        return Err(AppError::NotFound("Set not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
