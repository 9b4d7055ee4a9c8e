use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use idlewatch::{create_router, AppState, LeaseStore};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

fn test_app(dir: &tempfile::TempDir) -> (Router, PathBuf) {
    let lease_path = dir.path().join("stay_awake_until");
    let app = create_router().with_state(Arc::new(AppState {
        lease: LeaseStore::new(&lease_path),
    }));
    (app, lease_path)
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn health_returns_ok() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(&dir);

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn stay_without_seconds_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let (app, lease_path) = test_app(&dir);

    let (status, body) = get(app, "/stay").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("missing parameter"));
    assert!(!lease_path.exists());
}

#[tokio::test]
async fn stay_with_non_numeric_seconds_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let (app, lease_path) = test_app(&dir);

    let (status, body) = get(app, "/stay?s=soon").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("invalid seconds"));
    assert!(!lease_path.exists());
}

#[tokio::test]
async fn stay_with_non_positive_seconds_is_rejected_without_a_lease() {
    let dir = tempfile::tempdir().unwrap();
    let (app, lease_path) = test_app(&dir);

    let (status, _) = get(app.clone(), "/stay?s=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(app, "/stay?s=-5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("must be positive"));
    assert!(!lease_path.exists());
}

#[tokio::test]
async fn stay_writes_a_lease_and_confirms_the_duration() {
    let dir = tempfile::tempdir().unwrap();
    let (app, lease_path) = test_app(&dir);

    let (status, body) = get(app, "/stay?s=600").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("stay-awake activated for 600 seconds"));
    assert!(body.contains("(10m)"));

    let expiry: i64 = std::fs::read_to_string(&lease_path)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    assert!((expiry - now - 600).abs() <= 2);
}

#[tokio::test]
async fn oversized_durations_are_clamped_to_24_hours() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(&dir);

    let (status, body) = get(app, "/stay?s=100000").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("86400 seconds"));
    assert!(body.contains("(24h 0m)"));
}

#[tokio::test]
async fn status_reflects_grants() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(&dir);

    let (status, body) = get(app.clone(), "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "stay-awake: inactive");

    get(app.clone(), "/stay?s=3600").await;

    let (status, body) = get(app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("stay-awake: active"));
    assert!(body.contains("remaining: 0h 59m") || body.contains("remaining: 1h 0m"));
}

#[tokio::test]
async fn status_reports_an_expired_lease_as_inactive_without_reaping_it() {
    let dir = tempfile::tempdir().unwrap();
    let (app, lease_path) = test_app(&dir);

    // expiry far in the past
    std::fs::write(&lease_path, "1000").unwrap();

    let (status, body) = get(app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "stay-awake: inactive");
    // reaping is the readers' job (monitor, reporter), not the creator's
    assert!(lease_path.exists());
}

#[tokio::test]
async fn unknown_paths_return_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(&dir);

    let (status, _) = get(app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
