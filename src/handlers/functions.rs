use axum::{extract::State, Json};

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{GenerateSummaryRequest, SummaryResponse};
use crate::state::AppState;

pub async fn generate_summary(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<GenerateSummaryRequest>,
) -> Result<Json<SummaryResponse>> {
    if request.session_id.trim().is_empty() {
        return Err(AppError::Validation("Session id is required".to_string()));
    }

    let response = state
        .summaries
        .generate(&auth_user.id, &request.session_id)
        .await?;
    Ok(Json(response))
}
