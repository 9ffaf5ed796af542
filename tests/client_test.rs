mod common;

use std::sync::Arc;

use gymlog::client::{
    AuthCore, ClientConfig, FileStorage, HttpGateway, LocalStorage, MemoryStorage, SessionQuery,
    SummaryOrchestrator, SummaryStatus, SESSION_KEY,
};
use gymlog::db::DbPool;
use gymlog::error::ErrorCode;
use gymlog::models::{CreateExerciseSet, CreateWorkoutSession, UpdateExerciseSet};

use common::{at, PASSWORD};

async fn spawn_server() -> (String, DbPool) {
    let pool = common::setup_test_db();
    let app = common::create_test_app(pool.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), pool)
}

fn new_session(performed_at: &str) -> CreateWorkoutSession {
    CreateWorkoutSession {
        performed_at: at(performed_at),
        description: Some("Pull day".to_string()),
        location: None,
    }
}

#[tokio::test]
async fn test_gateway_workout_flow() {
    let (base_url, _pool) = spawn_server().await;
    let gateway = HttpGateway::new(base_url);

    let auth = gateway.sign_up("lifter@example.com", PASSWORD).await.unwrap();
    assert_eq!(gateway.access_token(), Some(auth.session.access_token));

    let session = gateway
        .create_session(&new_session("2024-05-01T08:00:00Z"))
        .await
        .unwrap();
    let set = gateway
        .add_set(
            &session.id,
            &CreateExerciseSet {
                exercise_id: "deadlift".to_string(),
                reps: 5,
                weight: 150.0,
            },
        )
        .await
        .unwrap();
    gateway
        .update_set(
            &session.id,
            &set.id,
            &UpdateExerciseSet {
                reps: 4,
                weight: 160.0,
            },
        )
        .await
        .unwrap();

    let detail = gateway.get_session(&session.id).await.unwrap();
    assert_eq!(detail.totals.total_weight, 640.0);
    assert_eq!(detail.sets[0].exercise_name, "Deadlift");

    let page = gateway.list_sessions(&SessionQuery::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].totals.total_reps, 4);

    let stats = gateway.stats(None, None).await.unwrap();
    assert_eq!(stats.range.set_count, 1);

    let exercises = gateway.list_exercises().await.unwrap();
    assert!(exercises.iter().any(|e| e.id == "deadlift"));

    gateway.delete_set(&session.id, &set.id).await.unwrap();
    gateway.delete_session(&session.id).await.unwrap();
    let err = gateway.get_session(&session.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_gateway_maps_quota_errors() {
    let (base_url, _pool) = spawn_server().await;
    let gateway = HttpGateway::new(base_url);
    gateway.sign_up("lifter@example.com", PASSWORD).await.unwrap();

    for hour in 6..11 {
        gateway
            .create_session(&new_session(&format!("2024-05-01T{:02}:00:00Z", hour)))
            .await
            .unwrap();
    }

    let err = gateway
        .create_session(&new_session("2024-05-01T20:00:00Z"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DailyLimitExceeded);
    assert_eq!(err.message, "Daily session limit reached");
}

#[tokio::test]
async fn test_auth_core_rate_limits_sign_in() {
    let (base_url, pool) = spawn_server().await;
    common::create_test_user(&pool, "lifter@example.com").await;

    let gateway = Arc::new(HttpGateway::new(base_url));
    let core = AuthCore::new(gateway, Arc::new(MemoryStorage::new()), &ClientConfig::default());

    for _ in 0..5 {
        let err = core.sign_in("lifter@example.com", "wrong-pass").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);
    }

    // Even the right password is refused until the window passes
    let err = core.sign_in("lifter@example.com", PASSWORD).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RateLimited);
    assert!(!core.state().is_authenticated);
}

#[tokio::test]
async fn test_auth_core_restores_and_signs_out() {
    let (base_url, _pool) = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let storage_path = dir.path().join("client.json");
    let config = ClientConfig::default();

    let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(&storage_path));
    let gateway =
        Arc::new(HttpGateway::new(base_url.clone()).with_session_storage(storage.clone()));
    let core = AuthCore::new(gateway, storage, &config);
    core.sign_up("lifter@example.com", PASSWORD).await.unwrap();
    drop(core);

    // A restart: new storage handle, new gateway, new core over the same file
    let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(&storage_path));
    let gateway = Arc::new(HttpGateway::new(base_url).with_session_storage(storage.clone()));
    assert!(gateway.access_token().is_some());
    let core = AuthCore::new(gateway.clone(), storage.clone(), &config);
    core.initialize().await;
    let state = core.state();
    assert!(state.is_authenticated);
    assert_eq!(
        state.user.map(|u| u.email).as_deref(),
        Some("lifter@example.com")
    );

    core.sign_out().await.unwrap();
    assert!(!core.state().is_authenticated);
    assert!(gateway.access_token().is_none());
    assert!(storage.get_item(SESSION_KEY).is_none());
    let err = gateway.current_user().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthorized);
}

#[tokio::test]
async fn test_restore_without_stored_session_signs_out() {
    let (base_url, _pool) = spawn_server().await;
    let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
    let config = ClientConfig::default();

    // The gateway here does not keep its session, so a restart loses it
    let gateway = Arc::new(HttpGateway::new(base_url.clone()));
    let core = AuthCore::new(gateway, storage.clone(), &config);
    core.sign_up("lifter@example.com", PASSWORD).await.unwrap();
    drop(core);

    let core = AuthCore::new(Arc::new(HttpGateway::new(base_url)), storage, &config);
    core.initialize().await;
    let state = core.state();
    assert!(!state.is_authenticated);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_orchestrator_generates_over_http() {
    let (base_url, _pool) = spawn_server().await;
    let gateway = Arc::new(HttpGateway::new(base_url));
    gateway.sign_up("lifter@example.com", PASSWORD).await.unwrap();

    let session = gateway
        .create_session(&new_session("2024-05-01T08:00:00Z"))
        .await
        .unwrap();
    gateway
        .add_set(
            &session.id,
            &CreateExerciseSet {
                exercise_id: "pull-up".to_string(),
                reps: 10,
                weight: 0.0,
            },
        )
        .await
        .unwrap();

    let orchestrator = SummaryOrchestrator::new(gateway.clone(), &ClientConfig::default());
    let summary = orchestrator.generate_now(&session.id).await.unwrap();
    assert!(summary.contains("Pull Up"));
    assert!(matches!(
        orchestrator.status(),
        SummaryStatus::Completed { .. }
    ));

    let err = orchestrator.generate_now(&session.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::AlreadySummarized);

    let stored = gateway.get_session(&session.id).await.unwrap();
    assert_eq!(stored.session.summary.as_deref(), Some(summary.as_str()));
}

#[tokio::test]
async fn test_orchestrator_refuses_other_users_session() {
    let (base_url, _pool) = spawn_server().await;
    let owner = HttpGateway::new(base_url.clone());
    owner.sign_up("owner@example.com", PASSWORD).await.unwrap();
    let session = owner
        .create_session(&new_session("2024-05-01T08:00:00Z"))
        .await
        .unwrap();
    owner
        .add_set(
            &session.id,
            &CreateExerciseSet {
                exercise_id: "squat".to_string(),
                reps: 5,
                weight: 100.0,
            },
        )
        .await
        .unwrap();

    let intruder = Arc::new(HttpGateway::new(base_url));
    intruder.sign_up("intruder@example.com", PASSWORD).await.unwrap();
    let orchestrator = SummaryOrchestrator::new(intruder, &ClientConfig::default());

    let err = orchestrator.generate_now(&session.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);

    let err = orchestrator.generate_now("no-such-session").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    let stored = owner.get_session(&session.id).await.unwrap();
    assert!(stored.session.summary.is_none());
}
