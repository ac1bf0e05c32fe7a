use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use scanguard_server::{
    config::Config, create_router, middleware::auth::issue_token, pipeline::SimulatedRoutine, AppState,
};

fn app() -> (AppState, Router) {
    let state = AppState::new(Config::default(), Arc::new(SimulatedRoutine::new(Duration::ZERO)));
    (state.clone(), create_router(state))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

/// Poll the job endpoint until it reports a terminal status.
async fn wait_for_job(app: &Router, job_id: &str) -> Value {
    for _ in 0..200 {
        let (status, job) = send(app, Method::GET, &format!("/api/v1/jobs/{job_id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        if job["status"] == "COMPLETED" || job["status"] == "FAILED" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never finished");
}

async fn submit(app: &Router, body: Value, token: Option<&str>) -> String {
    let (status, resp) = send(app, Method::POST, "/api/v1/jobs", Some(body), token).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{resp}");
    assert_eq!(resp["status"], "PENDING");
    resp["job_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_healthy() {
    let (_, app) = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn file_analysis_records_critical_threat() {
    let (_, app) = app();
    let job_id = submit(&app, json!({"kind": "FILE_ANALYSIS", "file_name": "invoice.exe"}), None).await;

    let job = wait_for_job(&app, &job_id).await;
    assert_eq!(job["status"], "COMPLETED");
    assert!(job["error"].is_null());
    assert!(job["completed_at"].is_string());

    let (status, threats) = send(&app, Method::GET, "/api/v1/threats?severity=CRITICAL", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let threats = threats.as_array().unwrap();
    assert_eq!(threats.len(), 1);
    assert_eq!(threats[0]["source_job_id"], job_id.as_str());
    assert_eq!(threats[0]["remediation_state"], "ACTIVE");
    assert_eq!(threats[0]["file_name"], "invoice.exe");
    assert_eq!(threats[0]["confidence"], 0.92);
}

#[tokio::test]
async fn custom_scan_without_target_is_rejected() {
    let (state, app) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/jobs",
        Some(json!({"kind": "CUSTOM_SCAN", "target_path": ""})),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    assert!(state.jobs.list(&Default::default()).is_empty());
}

#[tokio::test]
async fn failing_routine_surfaces_as_failed_job() {
    let (_, app) = app();
    let job_id = submit(&app, json!({"kind": "CUSTOM_SCAN", "target_path": "/mnt/__fail__"}), None).await;

    let job = wait_for_job(&app, &job_id).await;
    assert_eq!(job["status"], "FAILED");
    assert!(job["result"].is_null());
    assert!(job["error"].as_str().unwrap().contains("crashed"));
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (_, app) = app();
    let (status, body) = send(&app, Method::GET, &format!("/api/v1/jobs/{}", Uuid::new_v4()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn remediation_lifecycle_over_http() {
    let (_, app) = app();
    let job_id = submit(&app, json!({"kind": "FILE_ANALYSIS", "target_path": "/tmp/report.pdf.locked"}), None).await;
    wait_for_job(&app, &job_id).await;

    let (_, threats) = send(&app, Method::GET, "/api/v1/threats", None, None).await;
    let id = threats[0]["id"].as_str().unwrap().to_string();

    let (status, t) = send(&app, Method::POST, &format!("/api/v1/threats/{id}/quarantine"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t["remediation_state"], "QUARANTINED");

    let (status, body) = send(&app, Method::POST, &format!("/api/v1/threats/{id}/quarantine"), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transition");

    let (status, t) = send(&app, Method::POST, &format!("/api/v1/threats/{id}/restore"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t["remediation_state"], "ACTIVE");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/threats/{id}/false-positive"),
        Some(json!({"reason": ""})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, t) = send(
        &app,
        Method::POST,
        &format!("/api/v1/threats/{id}/false-positive"),
        Some(json!({"reason": "internal build artifact"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t["remediation_state"], "FALSE_POSITIVE_REPORTED");

    let (status, _) = send(&app, Method::POST, &format!("/api/v1/threats/{id}/restore"), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn bulk_quarantine_reports_partial_failure() {
    let (state, app) = app();
    for name in ["a.locked", "b.locked", "c.locked"] {
        let job_id = submit(&app, json!({"kind": "FILE_ANALYSIS", "file_name": name}), None).await;
        wait_for_job(&app, &job_id).await;
    }

    let ids: Vec<Uuid> = state
        .threats
        .list(&Default::default())
        .into_iter()
        .rev()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids.len(), 3);
    state.threats.report_false_positive(ids[1], "test fixture").unwrap();

    let (status, result) = send(
        &app,
        Method::POST,
        "/api/v1/threats/bulk",
        Some(json!({"action": "quarantine", "threat_ids": ids})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["succeeded"], json!([ids[0], ids[2]]));
    assert_eq!(result["failed"][0]["threat_id"], json!(ids[1]));
    assert_eq!(result["failed"][0]["kind"], "invalid_transition");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/threats/bulk",
        Some(json!({"action": "quarantine", "threat_ids": []})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "empty_selection");

    let (_, summary) = send(&app, Method::GET, "/api/v1/reports/summary", None, None).await;
    assert_eq!(summary["completed_jobs"], 3);
    assert_eq!(summary["remediation"]["quarantined"], 2);
    assert_eq!(summary["remediation"]["false_positive_reported"], 1);
    assert_eq!(summary["security_score"], 100.0);
}

#[tokio::test]
async fn alerts_follow_the_submitter() {
    let (state, app) = app();
    let user = Uuid::new_v4();
    let token = issue_token(&state.config.jwt_secret, user, "analyst", chrono::Duration::hours(1)).unwrap();

    let job_id = submit(&app, json!({"kind": "FILE_ANALYSIS", "file_name": "invoice.exe"}), Some(&token)).await;
    let job = wait_for_job(&app, &job_id).await;
    assert_eq!(job["submitted_by"], json!(user));

    let (status, _) = send(&app, Method::GET, "/api/v1/alerts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/v1/alerts", None, Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, list) = send(&app, Method::GET, "/api/v1/alerts", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["unread_count"], 1);
    let alert_id = list["alerts"][0]["id"].as_str().unwrap().to_string();

    let (status, alert) =
        send(&app, Method::POST, &format!("/api/v1/alerts/{alert_id}/read"), None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alert["is_read"], true);

    let (_, list) = send(&app, Method::GET, "/api/v1/alerts?unread_only=true", None, Some(&token)).await;
    assert_eq!(list["unread_count"], 0);
    assert_eq!(list["alerts"], json!([]));
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let (state, app) = app();
    let token = issue_token(&state.config.jwt_secret, Uuid::new_v4(), "analyst", chrono::Duration::hours(-2)).unwrap();

    let (status, body) = send(&app, Method::GET, "/api/v1/jobs", None, Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token has expired");
}

#[tokio::test]
async fn threats_filter_by_remediation_state() {
    let (_, app) = app();
    for name in ["first.locked", "second.locked"] {
        let job_id = submit(&app, json!({"kind": "FILE_ANALYSIS", "file_name": name}), None).await;
        wait_for_job(&app, &job_id).await;
    }
    let (_, threats) = send(&app, Method::GET, "/api/v1/threats", None, None).await;
    let id = threats[0]["id"].as_str().unwrap().to_string();
    send(&app, Method::POST, &format!("/api/v1/threats/{id}/quarantine"), None, None).await;

    let (status, quarantined) =
        send(&app, Method::GET, "/api/v1/threats?remediation_state=QUARANTINED", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quarantined.as_array().unwrap().len(), 1);
    assert_eq!(quarantined[0]["id"], id.as_str());

    let (_, active) =
        send(&app, Method::GET, "/api/v1/threats?remediation_state=ACTIVE", None, None).await;
    let active = active.as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_ne!(active[0]["id"], id.as_str());

    let (status, body) =
        send(&app, Method::GET, "/api/v1/threats?remediaton_state=ACTIVE", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn malformed_input_is_a_validation_error() {
    let (state, app) = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/jobs",
        Some(json!({"kind": "CUSTOM_SCAN", "target_path": 42})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    assert_eq!(body["status"], 400);
    assert!(state.jobs.list(&Default::default()).is_empty());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/jobs",
        Some(json!({"kind": "DEEP_SCAN"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/threats/bulk",
        Some(json!({"action": "delete", "threat_ids": [Uuid::new_v4()]})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, body) = send(&app, Method::GET, "/api/v1/threats?severity=SEVERE", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, body) = send(&app, Method::GET, "/api/v1/jobs/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn threat_stats_are_scoped_to_the_caller() {
    let (state, app) = app();
    let alice = Uuid::new_v4();
    let token = issue_token(&state.config.jwt_secret, alice, "analyst", chrono::Duration::hours(1)).unwrap();

    let mine = submit(&app, json!({"kind": "FILE_ANALYSIS", "file_name": "mine.locked"}), Some(&token)).await;
    wait_for_job(&app, &mine).await;
    let theirs = submit(&app, json!({"kind": "FILE_ANALYSIS", "file_name": "theirs.locked"}), None).await;
    wait_for_job(&app, &theirs).await;

    let (status, stats) = send(&app, Method::GET, "/api/v1/threats/stats", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);

    let (_, stats) = send(&app, Method::GET, "/api/v1/threats/stats", None, None).await;
    assert_eq!(stats["total"], 2);
}
