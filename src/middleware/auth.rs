use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::session::get_session_token;
use crate::state::AppState;

/// The signed-in caller, resolved from the bearer token or session cookie.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = get_session_token(&parts.headers).ok_or(AppError::Unauthorized)?;

        let user_id = state
            .token_repo
            .find_valid(&token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let user = state
            .user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            token,
        })
    }
}
