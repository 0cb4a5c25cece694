//! Submission, status, retry and history over HTTP.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json, wait_for_terminal, StubBackend};

#[tokio::test]
async fn submit_returns_202_then_status_reaches_success() {
    let app = common::build_test_app(StubBackend::succeeding());

    let response = post_json(
        app.router.clone(),
        "/api/v1/jobs",
        common::submission("case-42"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let accepted = body_json(response).await;
    assert_eq!(accepted["data"]["jobId"], "case-42");
    assert_eq!(accepted["data"]["attempt"], 1);

    wait_for_terminal(&app.state, "case-42").await;

    let response = get(app.router, "/api/v1/jobs/case-42/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "success");
    assert_eq!(json["data"]["progress"], 100);
    assert_eq!(
        json["data"]["result"]["outputs"],
        serde_json::json!(["petition", "summons"])
    );
}

#[tokio::test]
async fn submit_without_job_id_mints_one() {
    let app = common::build_test_app(StubBackend::succeeding());
    let body = serde_json::json!({
        "payload": {},
        "parameters": { "outputs": ["petition"] },
    });

    let response = post_json(app.router, "/api/v1/jobs", body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = body_json(response).await;
    let job_id = json["data"]["jobId"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(job_id).is_ok());
}

#[tokio::test]
async fn rejected_render_is_recorded_as_failed() {
    let app = common::build_test_app(StubBackend::rejecting());

    let response = post_json(
        app.router.clone(),
        "/api/v1/jobs",
        common::submission("case-7"),
    )
    .await;
    // The failure happens after acceptance.
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    wait_for_terminal(&app.state, "case-7").await;

    let json = body_json(get(app.router, "/api/v1/jobs/case-7/status").await).await;
    assert_eq!(json["data"]["status"], "failed");
    assert_eq!(json["data"]["errorKind"], "upstream_rejected");
    assert_eq!(json["data"]["continued"], true);
}

#[tokio::test]
async fn retry_reruns_with_new_parameters_and_records_history() {
    let app = common::build_test_app(StubBackend::succeeding());

    post_json(
        app.router.clone(),
        "/api/v1/jobs",
        common::submission("case-42"),
    )
    .await;
    wait_for_terminal(&app.state, "case-42").await;

    let body = serde_json::json!({ "parameters": { "outputs": ["summons"] } });
    let response = post_json(app.router.clone(), "/api/v1/jobs/case-42/retry", body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["data"]["attempt"], 2);

    wait_for_terminal(&app.state, "case-42").await;

    let json = body_json(get(app.router.clone(), "/api/v1/jobs/case-42/status").await).await;
    assert_eq!(json["data"]["status"], "success");
    assert_eq!(json["data"]["attempt"], 2);
    assert_eq!(json["data"]["result"]["outputs"], serde_json::json!(["summons"]));
    assert_eq!(app.backend.calls(), 2);

    let history = body_json(get(app.router, "/api/v1/jobs/case-42/history").await).await;
    let entries = history["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0]["requestedParameters"]["outputs"],
        serde_json::json!(["summons"])
    );
}

#[tokio::test]
async fn history_of_unknown_job_is_empty() {
    let app = common::build_test_app(StubBackend::succeeding());

    let response = get(app.router, "/api/v1/jobs/case-1/history").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], serde_json::json!([]));
}
