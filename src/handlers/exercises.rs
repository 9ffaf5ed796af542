use axum::{extract::State, Json};

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::Exercise;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<Vec<Exercise>>> {
    let exercises = state.exercise_repo.find_all().await?;
    Ok(Json(exercises))
}
