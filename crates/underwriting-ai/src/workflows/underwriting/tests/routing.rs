use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::underwriting::reconciliation::ReconciliationConfig;
use crate::workflows::underwriting::triage::DisabledTriageDispatcher;
use crate::workflows::underwriting::{
    MockPredictionSource, PropertyCatalog, UnderwritingGameService,
};

fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn properties_route_lists_catalog() {
    let (service, _, _) = build_service();
    let router = game_router_with_service(service);

    let response = router.oneshot(get("/api/properties")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let properties = body.as_array().expect("array payload");
    assert_eq!(properties.len(), 6);
    assert_eq!(properties[0]["letter"], "A");
    assert_eq!(properties[3]["property_county"], "Riverside County");
}

#[tokio::test]
async fn submit_route_creates_submission() {
    let (service, _, _) = build_service();
    let router = game_router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/submissions",
            json!({
                "underwriterName": "Riley",
                "prioritizedIds": [1, 2],
                "discardedIds": [6],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["underwriter_name"], "Riley");
    assert_eq!(body["prioritized_ids"], json!([1, 2]));
    assert_eq!(body["processed"], false);
}

#[tokio::test]
async fn submit_route_rejects_overlapping_ids() {
    let (service, _, _) = build_service();
    let router = game_router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/submissions",
            json!({
                "underwriter_name": "Riley",
                "prioritized_ids": [1, 2],
                "discarded_ids": [2],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(
        body["error"],
        "property IDs cannot be both prioritized and discarded: B"
    );
}

#[tokio::test]
async fn submit_handler_returns_internal_error_on_repository_failure() {
    let service = Arc::new(UnderwritingGameService::new(
        PropertyCatalog::standard(),
        Arc::new(UnavailableRepository),
        Arc::new(MockPredictionSource::standard()),
        Arc::new(DisabledTriageDispatcher),
        ReconciliationConfig::default(),
    ));

    let request = serde_json::from_value(json!({
        "underwriter_name": "Riley",
        "prioritized_ids": [1],
        "discarded_ids": [2],
    }))
    .unwrap();

    let response = crate::workflows::underwriting::router::submit_handler::<
        UnavailableRepository,
        MockPredictionSource,
        DisabledTriageDispatcher,
    >(State(service), axum::Json(request))
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn latest_route_returns_null_when_empty() {
    let (service, _, _) = build_service();
    let router = game_router_with_service(service);

    let response = router
        .oneshot(get("/api/submissions/latest"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await, Value::Null);
}

#[tokio::test]
async fn missing_submission_returns_not_found() {
    let (service, _, _) = build_service();
    let router = game_router_with_service(service);

    let response = router
        .clone()
        .oneshot(get("/api/submissions/999999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/process",
            json!({ "submissionId": 999999 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn results_route_requires_processing_then_returns_score() {
    let (service, _, _) = build_service();
    let record = service
        .submit(
            crate::workflows::underwriting::SubmissionDraft::new(
                "Riley",
                vec![crate::workflows::underwriting::PropertyId(1)],
                vec![crate::workflows::underwriting::PropertyId(6)],
            )
            .unwrap(),
        )
        .unwrap();
    let id = record.id.0;
    let router = game_router_with_service(service);

    let response = router
        .clone()
        .oneshot(get(&format!("/api/results/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/process",
            json!({ "submission_id": id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(get(&format!("/api/results/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    // A prioritized on High, F discarded on Low: 2 of 6 points.
    assert_eq!(body["reconciliation"]["score"]["percentage"], 33);
    assert_eq!(body["reconciliation"]["rows"][0]["status"], "match");
    assert_eq!(
        body["reconciliation"]["rows"][0]["category"],
        json!({ "kind": "propensity", "value": "high" })
    );
}

#[tokio::test]
async fn leaderboard_route_returns_ranked_entries() {
    let (service, _, _) = build_service();
    let record = service
        .submit(
            crate::workflows::underwriting::SubmissionDraft::new(
                "Riley",
                vec![crate::workflows::underwriting::PropertyId(1)],
                vec![crate::workflows::underwriting::PropertyId(6)],
            )
            .unwrap(),
        )
        .unwrap();
    service.process(record.id).unwrap();
    let router = game_router_with_service(service);

    let response = router.oneshot(get("/api/leaderboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body[0]["rank"], 1);
    assert_eq!(body[0]["underwriter_name"], "Riley");
}

#[tokio::test]
async fn triage_route_filters_and_validates_tier() {
    let (service, _, _) = build_service();
    let router = game_router_with_service(service);

    let response = router
        .clone()
        .oneshot(get("/api/triage?propensity=low"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body[0]["tier"], "low");
    assert_eq!(body[0]["entries"][0]["property"]["letter"], "F");
    assert_eq!(body[0]["entries"][0]["propensity_pct"], 4);

    let response = router
        .oneshot(get("/api/triage?propensity=extreme"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_emails_route_reports_tier_counts() {
    let (service, _, outbox) = build_service();
    let router = game_router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/triage/send-emails")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "sent");
    assert_eq!(body["tiers"], json!({ "High": 3, "Mid": 2, "Low": 1 }));
    assert_eq!(outbox.sent().unwrap().len(), 3);
}
