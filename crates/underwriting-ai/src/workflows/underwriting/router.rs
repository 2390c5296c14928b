use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{PropertyId, Tier};
use super::repository::{RepositoryError, SubmissionId, SubmissionRepository};
use super::selection::SubmissionDraft;
use super::service::{GameServiceError, UnderwritingGameService};
use super::sources::PredictionSource;
use super::triage::TriageDispatcher;

type SharedService<R, S, D> = Arc<UnderwritingGameService<R, S, D>>;

/// Router builder exposing the game endpoints.
pub fn game_router<R, S, D>(service: SharedService<R, S, D>) -> Router
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    Router::new()
        .route("/api/properties", get(properties_handler::<R, S, D>))
        .route("/api/submissions", post(submit_handler::<R, S, D>))
        .route(
            "/api/submissions/latest",
            get(latest_submission_handler::<R, S, D>),
        )
        .route(
            "/api/submissions/:submission_id",
            get(submission_handler::<R, S, D>),
        )
        .route("/api/process", post(process_handler::<R, S, D>))
        .route("/api/results/:submission_id", get(results_handler::<R, S, D>))
        .route("/api/leaderboard", get(leaderboard_handler::<R, S, D>))
        .route("/api/triage", get(triage_handler::<R, S, D>))
        .route(
            "/api/triage/send-emails",
            post(send_triage_handler::<R, S, D>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionRequest {
    #[serde(alias = "underwriterName")]
    underwriter_name: String,
    #[serde(default, alias = "prioritizedIds")]
    prioritized_ids: Vec<u32>,
    #[serde(default, alias = "discardedIds")]
    discarded_ids: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProcessRequest {
    #[serde(alias = "submissionId")]
    submission_id: u64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TriageQuery {
    propensity: Option<String>,
}

pub(crate) async fn properties_handler<R, S, D>(
    State(service): State<SharedService<R, S, D>>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    (StatusCode::OK, axum::Json(service.catalog().properties())).into_response()
}

pub(crate) async fn submit_handler<R, S, D>(
    State(service): State<SharedService<R, S, D>>,
    axum::Json(request): axum::Json<SubmissionRequest>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    let draft = match SubmissionDraft::new(
        &request.underwriter_name,
        request.prioritized_ids.into_iter().map(PropertyId).collect(),
        request.discarded_ids.into_iter().map(PropertyId).collect(),
    ) {
        Ok(draft) => draft,
        Err(error) => return error_response(GameServiceError::Selection(error)),
    };

    match service.submit(draft) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.summary())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn latest_submission_handler<R, S, D>(
    State(service): State<SharedService<R, S, D>>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    match service.latest() {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submission_handler<R, S, D>(
    State(service): State<SharedService<R, S, D>>,
    Path(submission_id): Path<u64>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    match service.get(SubmissionId(submission_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.summary())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn process_handler<R, S, D>(
    State(service): State<SharedService<R, S, D>>,
    axum::Json(request): axum::Json<ProcessRequest>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    match service.process(SubmissionId(request.submission_id)) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn results_handler<R, S, D>(
    State(service): State<SharedService<R, S, D>>,
    Path(submission_id): Path<u64>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    match service.results(SubmissionId(submission_id)) {
        Ok(results) => (StatusCode::OK, axum::Json(results)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn leaderboard_handler<R, S, D>(
    State(service): State<SharedService<R, S, D>>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    match service.leaderboard() {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn triage_handler<R, S, D>(
    State(service): State<SharedService<R, S, D>>,
    Query(query): Query<TriageQuery>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    let tier = match query.propensity.as_deref() {
        None => None,
        Some(raw) => match Tier::parse(raw) {
            Some(tier) => Some(tier),
            None => {
                let payload = json!({
                    "error": format!("unknown propensity tier '{raw}'"),
                });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        },
    };

    match service.triage(tier) {
        Ok(groups) => (StatusCode::OK, axum::Json(groups)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn send_triage_handler<R, S, D>(
    State(service): State<SharedService<R, S, D>>,
) -> Response
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    match service.dispatch_triage(Utc::now().date_naive()) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: GameServiceError) -> Response {
    let status = match &error {
        GameServiceError::Selection(_) | GameServiceError::UnknownProperty(_) => {
            StatusCode::BAD_REQUEST
        }
        GameServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        GameServiceError::Repository(RepositoryError::Conflict)
        | GameServiceError::NotProcessed(_) => StatusCode::CONFLICT,
        GameServiceError::Validation(_) | GameServiceError::Reconciliation(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        GameServiceError::Repository(RepositoryError::Unavailable(_))
        | GameServiceError::Predictions(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
