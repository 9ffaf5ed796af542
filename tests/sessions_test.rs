mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{at, json_request, read_error, read_json};
use gymlog::error::ErrorCode;
use gymlog::models::{Page, SessionDetail, SessionWithTotals, WorkoutSession};

#[tokio::test]
async fn test_sessions_require_auth() {
    let pool = common::setup_test_db();
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(json_request("GET", "/sessions", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_session() {
    let pool = common::setup_test_db();
    let (user, token) = common::signed_in_user(&pool, "lifter@example.com").await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(json_request(
            "POST",
            "/sessions",
            Some(&token),
            Some(json!({
                "performed_at": "2024-05-01T18:30:00Z",
                "description": "Heavy lower day",
                "location": "Home gym"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let session: WorkoutSession = read_json(response).await;
    assert_eq!(session.user_id, user.id);
    assert_eq!(session.performed_at, at("2024-05-01T18:30:00Z"));
    assert_eq!(session.location.as_deref(), Some("Home gym"));
    assert!(session.summary.is_none());
}

#[tokio::test]
async fn test_create_session_rejects_long_description() {
    let pool = common::setup_test_db();
    let (_, token) = common::signed_in_user(&pool, "lifter@example.com").await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(json_request(
            "POST",
            "/sessions",
            Some(&token),
            Some(json!({
                "performed_at": "2024-05-01T18:30:00Z",
                "description": "x".repeat(501),
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_error(response).await.code, ErrorCode::Validation);
}

#[tokio::test]
async fn test_daily_session_limit() {
    let pool = common::setup_test_db();
    let (user, token) = common::signed_in_user(&pool, "lifter@example.com").await;
    for hour in 6..11 {
        common::create_test_session(&pool, &user.id, at(&format!("2024-05-01T{:02}:00:00Z", hour)))
            .await;
    }
    let app = common::create_test_app(pool);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/sessions",
            Some(&token),
            Some(json!({ "performed_at": "2024-05-01T21:00:00Z" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_error(response).await.code, ErrorCode::DailyLimitExceeded);

    // The next UTC day is a fresh quota
    let response = app
        .oneshot(json_request(
            "POST",
            "/sessions",
            Some(&token),
            Some(json!({ "performed_at": "2024-05-02T00:30:00Z" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_daily_limit_is_per_user() {
    let pool = common::setup_test_db();
    let other = common::create_test_user(&pool, "other@example.com").await;
    for hour in 6..11 {
        common::create_test_session(&pool, &other.id, at(&format!("2024-05-01T{:02}:00:00Z", hour)))
            .await;
    }
    let (_, token) = common::signed_in_user(&pool, "lifter@example.com").await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(json_request(
            "POST",
            "/sessions",
            Some(&token),
            Some(json!({ "performed_at": "2024-05-01T12:00:00Z" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_moving_session_into_full_day_refused() {
    let pool = common::setup_test_db();
    let (user, token) = common::signed_in_user(&pool, "lifter@example.com").await;
    for hour in 6..11 {
        common::create_test_session(&pool, &user.id, at(&format!("2024-05-01T{:02}:00:00Z", hour)))
            .await;
    }
    let movable = common::create_test_session(&pool, &user.id, at("2024-05-02T08:00:00Z")).await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/sessions/{}", movable.id),
            Some(&token),
            Some(json!({ "performed_at": "2024-05-01T20:00:00Z", "description": "moved" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_error(response).await.code, ErrorCode::DailyLimitExceeded);
}

#[tokio::test]
async fn test_update_session_same_day() {
    let pool = common::setup_test_db();
    let (user, token) = common::signed_in_user(&pool, "lifter@example.com").await;
    let session = common::create_test_session(&pool, &user.id, at("2024-05-01T08:00:00Z")).await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/sessions/{}", session.id),
            Some(&token),
            Some(json!({
                "performed_at": "2024-05-01T09:15:00Z",
                "description": "Felt strong",
                "location": null
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let updated: WorkoutSession = read_json(response).await;
    assert_eq!(updated.description.as_deref(), Some("Felt strong"));
    assert_eq!(updated.performed_at, at("2024-05-01T09:15:00Z"));
}

#[tokio::test]
async fn test_list_sessions_with_totals_newest_first() {
    let pool = common::setup_test_db();
    let (user, token) = common::signed_in_user(&pool, "lifter@example.com").await;
    let older = common::create_test_session(&pool, &user.id, at("2024-04-01T08:00:00Z")).await;
    let newer = common::create_test_session(&pool, &user.id, at("2024-05-01T08:00:00Z")).await;
    common::create_test_set(&pool, &newer.id, "squat", 5, 100.0).await;
    common::create_test_set(&pool, &newer.id, "squat", 3, 110.0).await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(json_request("GET", "/sessions", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page: Page<SessionWithTotals> = read_json(response).await;
    assert_eq!(page.total, 2);
    assert_eq!(page.page, 1);
    assert_eq!(page.items[0].session.id, newer.id);
    assert_eq!(page.items[0].totals.set_count, 2);
    assert_eq!(page.items[0].totals.total_reps, 8);
    assert_eq!(page.items[0].totals.total_weight, 830.0);
    assert_eq!(page.items[1].session.id, older.id);
    assert_eq!(page.items[1].totals.set_count, 0);
    assert_eq!(page.items[1].totals.total_weight, 0.0);
}

#[tokio::test]
async fn test_list_sessions_pagination_and_range() {
    let pool = common::setup_test_db();
    let (user, token) = common::signed_in_user(&pool, "lifter@example.com").await;
    for day in 1..=7 {
        common::create_test_session(&pool, &user.id, at(&format!("2024-05-{:02}T08:00:00Z", day)))
            .await;
    }
    let app = common::create_test_app(pool);

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            "/sessions?page=2&per_page=3",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    let page: Value = read_json(response).await;
    assert_eq!(page["total"], 7);
    assert_eq!(page["total_pages"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 3);

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            "/sessions?from=2024-05-03T00:00:00Z&to=2024-05-05T23:59:59Z",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    let page: Page<SessionWithTotals> = read_json(response).await;
    assert_eq!(page.total, 3);

    let response = app
        .oneshot(json_request(
            "GET",
            "/sessions?per_page=51",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_sessions_page_out_of_range() {
    let pool = common::setup_test_db();
    let (_, token) = common::signed_in_user(&pool, "lifter@example.com").await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(json_request(
            "GET",
            &format!("/sessions?page={}&per_page=50", i64::MAX),
            Some(&token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_error(response).await.code, ErrorCode::Validation);
}

#[tokio::test]
async fn test_show_session_with_sets() {
    let pool = common::setup_test_db();
    let (user, token) = common::signed_in_user(&pool, "lifter@example.com").await;
    let session = common::create_test_session(&pool, &user.id, at("2024-05-01T08:00:00Z")).await;
    common::create_test_set(&pool, &session.id, "bench-press", 5, 80.0).await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(json_request(
            "GET",
            &format!("/sessions/{}", session.id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let detail: SessionDetail = read_json(response).await;
    assert_eq!(detail.sets.len(), 1);
    assert_eq!(detail.sets[0].exercise_name, "Bench Press");
    assert_eq!(detail.totals.total_weight, 400.0);
}

#[tokio::test]
async fn test_other_users_session_looks_missing() {
    let pool = common::setup_test_db();
    let owner = common::create_test_user(&pool, "owner@example.com").await;
    let session = common::create_test_session(&pool, &owner.id, at("2024-05-01T08:00:00Z")).await;
    let (_, token) = common::signed_in_user(&pool, "intruder@example.com").await;
    let app = common::create_test_app(pool);

    for (method, body) in [
        ("GET", None),
        ("PUT", Some(json!({ "performed_at": "2024-05-01T08:00:00Z" }))),
        ("DELETE", None),
    ] {
        let response = app
            .clone()
            .oneshot(json_request(
                method,
                &format!("/sessions/{}", session.id),
                Some(&token),
                body,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", method);
        assert_eq!(read_error(response).await.code, ErrorCode::NotFound);
    }
}

#[tokio::test]
async fn test_delete_session_removes_sets() {
    let pool = common::setup_test_db();
    let (user, token) = common::signed_in_user(&pool, "lifter@example.com").await;
    let session = common::create_test_session(&pool, &user.id, at("2024-05-01T08:00:00Z")).await;
    let set = common::create_test_set(&pool, &session.id, "deadlift", 3, 180.0).await;
    let app = common::create_test_app(pool.clone());

    let response = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/sessions/{}", session.id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(json_request(
            "GET",
            &format!("/sessions/{}", session.id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let remaining = gymlog::repositories::SetRepository::new(pool)
        .find_set_by_id(&set.id)
        .await
        .unwrap();
    assert!(remaining.is_none());
}
