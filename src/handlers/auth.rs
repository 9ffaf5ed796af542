use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::CookieJar;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{
    AuthResponse, AuthSession, Credentials, PasswordResetConfirm, PasswordResetRequest, User,
    UserProfile,
};
use crate::session::{create_session_cookie, remove_session_cookie};
use crate::state::AppState;
use crate::validation::{validate_email, validate_password};

async fn issue_session(state: &AppState, user: &User) -> Result<AuthResponse> {
    let (access_token, expires_at) = state.token_repo.create(&user.id).await?;
    Ok(AuthResponse {
        user: user.profile(),
        session: AuthSession {
            access_token,
            expires_at,
        },
    })
}

pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    validate_email(&credentials.email)?;
    validate_password(&credentials.password)?;

    let user = state
        .user_repo
        .create(&credentials.email, &credentials.password)
        .await?;
    tracing::info!("Created account {}", user.id);

    let response = issue_session(&state, &user).await?;
    let jar = jar.add(create_session_cookie(&response.session.access_token));

    Ok((StatusCode::CREATED, jar, Json(response)))
}

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    validate_email(&credentials.email)?;
    if credentials.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let user = state
        .user_repo
        .verify_password(&credentials.email, &credentials.password)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let response = issue_session(&state, &user).await?;
    let jar = jar.add(create_session_cookie(&response.session.access_token));

    Ok((jar, Json(response)))
}

pub async fn sign_out(
    State(state): State<AppState>,
    auth_user: AuthUser,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar)> {
    state.token_repo.delete(&auth_user.token).await?;
    Ok((StatusCode::NO_CONTENT, jar.add(remove_session_cookie())))
}

pub async fn current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserProfile>> {
    let user = state
        .user_repo
        .find_by_id(&auth_user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user.profile()))
}

/// Swap the caller's token for a fresh one.
pub async fn refresh(
    State(state): State<AppState>,
    auth_user: AuthUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let user = state
        .user_repo
        .find_by_id(&auth_user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let response = issue_session(&state, &user).await?;
    state.token_repo.delete(&auth_user.token).await?;
    let jar = jar.add(create_session_cookie(&response.session.access_token));

    Ok((jar, Json(response)))
}

/// Always accepted, so the endpoint does not reveal which emails exist.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetRequest>,
) -> Result<StatusCode> {
    validate_email(&request.email)?;

    if let Some(user) = state.user_repo.find_by_email(&request.email).await? {
        let token = state.user_repo.create_reset_token(&user.id).await?;
        // No mail transport; operators hand the link out from the logs
        tracing::info!("Password reset requested for {}: token {}", user.email, token);
    } else {
        tracing::debug!("Password reset requested for unknown email");
    }

    Ok(StatusCode::ACCEPTED)
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetConfirm>,
) -> Result<StatusCode> {
    validate_password(&request.password)?;

    let user_id = state
        .user_repo
        .consume_reset_token(&request.token)
        .await?
        .ok_or_else(|| AppError::Validation("Reset link is invalid or has expired".to_string()))?;

    state
        .user_repo
        .update_password(&user_id, &request.password)
        .await?;
    state.token_repo.delete_all_for_user(&user_id).await?;
    tracing::info!("Password reset for {}", user_id);

    Ok(StatusCode::NO_CONTENT)
}
