use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, exercises, functions, health, sessions, sets, stats};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/signout", post(auth::sign_out))
        .route("/auth/user", get(auth::current_user))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/reset-password", post(auth::request_password_reset))
        .route(
            "/auth/reset-password/confirm",
            post(auth::confirm_password_reset),
        )
        // Sessions
        .route("/sessions", get(sessions::list).post(sessions::create))
        .route(
            "/sessions/{id}",
            get(sessions::show)
                .put(sessions::update)
                .delete(sessions::delete),
        )
        // Sets
        .route("/sessions/{id}/sets", post(sets::create))
        .route(
            "/sessions/{id}/sets/{set_id}",
            put(sets::update).delete(sets::delete),
        )
        .route("/exercises", get(exercises::list))
        .route("/stats", get(stats::index))
        .route("/functions/generate-summary", post(functions::generate_summary))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
