//! Liveness/readiness endpoint tests.

mod common;

use common::TestApp;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn health_check_reports_ok() {
    let app = TestApp::spawn().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("invalid body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "marketplace-service");
}

#[tokio::test]
#[serial]
async fn readiness_check_reports_ok() {
    let app = TestApp::spawn().await;

    let response = app.get("/ready", None).await;
    assert_eq!(response.status(), 200);
}
