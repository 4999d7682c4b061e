use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::permits::router::{issue_handler, status_handler, submit_handler};
use crate::permits::{
    status_for, InMemoryEventLog, ManualClock, PermitPolicy, PermitService, PermitServiceError,
    RepositoryError,
};

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn submit_route_returns_created_view() {
    let harness = harness();
    let router = router_for(harness.service.clone());

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/permits/applications",
            serde_json::to_value(submission()).expect("submission json"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["application_id"], 1);
    assert_eq!(payload["status"], "submitted");
    assert_eq!(payload["review_summary"], "pending review");
}

#[tokio::test]
async fn submit_handler_maps_duplicates_to_conflict() {
    let harness = harness();
    harness.service.submit(submission()).expect("submit");

    let response = submit_handler(State(harness.service.clone()), axum::Json(submission())).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["code"], "ERR-APPLICATION-EXISTS");
}

#[tokio::test]
async fn status_handler_returns_not_found_for_unknown_ids() {
    let harness = harness();

    let response = status_handler(State(harness.service.clone()), Path(99)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn issue_handler_returns_internal_error_on_repository_failure() {
    let service = Arc::new(PermitService::new(
        Arc::new(UnavailableRepository),
        Arc::new(InMemoryEventLog::default()),
        Arc::new(authorization()),
        Arc::new(ManualClock::new(start())),
        PermitPolicy::default(),
    ));

    let response = issue_handler(State(service), Path(1)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn payment_route_rejects_strangers() {
    let harness = harness();
    let application = harness.service.submit(submission()).expect("submit");
    let router = router_for(harness.service.clone());

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/permits/applications/{}/payment", application.id),
            json!({ "payer": "someone-else", "amount": 1000 }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn lifecycle_over_http_ends_with_valid_permit() {
    let harness = harness();
    let router = router_for(harness.service.clone());
    let base = "/api/v1/permits/applications";
    let scheduled_at = start() + Duration::days(7);

    let steps = [
        (
            base.to_string(),
            serde_json::to_value(submission()).expect("json"),
            StatusCode::CREATED,
        ),
        (
            format!("{base}/1/payment"),
            json!({ "payer": APPLICANT, "amount": 1000 }),
            StatusCode::OK,
        ),
        (format!("{base}/1/review/start"), json!({}), StatusCode::OK),
        (
            format!("{base}/1/review"),
            json!({ "reviewer": REVIEWER, "decision": "approved", "notes": "clean" }),
            StatusCode::OK,
        ),
        (
            format!("{base}/1/inspections"),
            json!({
                "caller": INSPECTOR,
                "inspection_type": "fire-safety",
                "scheduled_at": scheduled_at,
            }),
            StatusCode::CREATED,
        ),
        (
            format!("{base}/1/inspections/complete"),
            json!({
                "caller": INSPECTOR,
                "inspection_type": "fire-safety",
                "outcome": "passed",
            }),
            StatusCode::OK,
        ),
        (format!("{base}/1/issue"), json!({}), StatusCode::OK),
    ];

    for (uri, body, expected) in steps {
        let response = router
            .clone()
            .oneshot(json_request("POST", &uri, body))
            .await
            .expect("route executes");
        assert_eq!(response.status(), expected, "POST {uri}");
    }

    let response = router
        .clone()
        .oneshot(get_request(&format!("{base}/1/validity")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["valid"], true);
    assert_eq!(payload["reason"], "valid");

    let response = router
        .oneshot(get_request(&format!("{base}?status=issued")))
        .await
        .expect("route executes");
    let payload = read_json_body(response).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(1));
    assert_eq!(payload[0]["status"], "issued");
}

#[tokio::test]
async fn review_route_maps_second_decision_to_conflict() {
    let harness = harness();
    let id = approved_application(&harness);
    let router = router_for(harness.service.clone());

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/permits/applications/{id}/review"),
            json!({ "reviewer": REVIEWER, "decision": "rejected" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["code"], "ERR-ALREADY-REVIEWED");
}

#[tokio::test]
async fn schedule_route_rejects_past_times() {
    let harness = harness();
    let application = harness.service.submit(submission()).expect("submit");
    let router = router_for(harness.service.clone());

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/permits/applications/{}/inspections", application.id),
            json!({
                "caller": INSPECTOR,
                "inspection_type": "fire-safety",
                "scheduled_at": start() - Duration::hours(1),
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn validity_route_accepts_explicit_instant() {
    let harness = harness();
    let issued = issued_application(&harness);
    let after = issued.expires_at.expect("expiry") + Duration::seconds(1);
    let router = router_for(harness.service.clone());

    let uri = format!(
        "/api/v1/permits/applications/{}/validity?at={}",
        issued.id,
        after.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );
    let response = router
        .oneshot(get_request(&uri))
        .await
        .expect("route executes");

    let payload = read_json_body(response).await;
    assert_eq!(payload["valid"], false);
    assert_eq!(payload["reason"], "expired");
    assert!(payload.get("detail").is_none());
    assert!(payload["expired_at"].is_string());
}

#[test]
fn storage_failures_map_to_internal_error() {
    let err = PermitServiceError::from(RepositoryError::Unavailable("down".to_string()));
    assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
}
