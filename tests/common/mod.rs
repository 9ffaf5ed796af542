#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use gymlog::db::{create_memory_pool, DbPool};
use gymlog::error::ErrorBody;
use gymlog::migrations::run_migrations;
use gymlog::models::{CreateExerciseSet, CreateWorkoutSession, ExerciseSet, User, WorkoutSession};
use gymlog::repositories::{SetRepository, TokenRepository, UserRepository, WorkoutRepository};
use gymlog::state::AppState;
use gymlog::summaries::TotalsSummarizer;

pub const PASSWORD: &str = "password123";

pub fn setup_test_db() -> DbPool {
    let pool = create_memory_pool().expect("Failed to create test database");
    run_migrations(&pool).expect("Failed to run migrations");
    pool
}

pub fn create_test_state(pool: DbPool) -> AppState {
    AppState::new(pool, Arc::new(TotalsSummarizer), Duration::from_secs(5))
}

pub fn create_test_app(pool: DbPool) -> Router {
    gymlog::routes::create_router(create_test_state(pool))
}

pub async fn create_test_user(pool: &DbPool, email: &str) -> User {
    let user_repo = UserRepository::new(pool.clone());
    user_repo.create(email, PASSWORD).await.unwrap()
}

pub async fn create_auth_token(pool: &DbPool, user: &User) -> String {
    let token_repo = TokenRepository::new(pool.clone());
    let (token, _) = token_repo.create(&user.id).await.unwrap();
    token
}

/// A user plus a bearer token for them.
pub async fn signed_in_user(pool: &DbPool, email: &str) -> (User, String) {
    let user = create_test_user(pool, email).await;
    let token = create_auth_token(pool, &user).await;
    (user, token)
}

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

pub async fn create_test_session(
    pool: &DbPool,
    user_id: &str,
    performed_at: DateTime<Utc>,
) -> WorkoutSession {
    let workout_repo = WorkoutRepository::new(pool.clone());
    workout_repo
        .create_session(
            user_id,
            &CreateWorkoutSession {
                performed_at,
                description: None,
                location: None,
            },
        )
        .await
        .unwrap()
}

pub async fn create_test_set(
    pool: &DbPool,
    session_id: &str,
    exercise_id: &str,
    reps: i32,
    weight: f64,
) -> ExerciseSet {
    let set_repo = SetRepository::new(pool.clone());
    set_repo
        .create_set(
            session_id,
            &CreateExerciseSet {
                exercise_id: exercise_id.to_string(),
                reps,
                weight,
            },
        )
        .await
        .unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub async fn read_error(response: Response<Body>) -> ErrorBody {
    read_json(response).await
}
