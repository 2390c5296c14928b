use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use underwriting_ai::error::AppError;
use underwriting_ai::workflows::underwriting::{
    adapt_records, game_router, PredictionExport, PredictionSource, Reconciliation,
    SubmissionRepository, TriageDispatcher, UnderwritingGameService, UserSelection,
};

/// Ad-hoc reconciliation of a selection set against a supplied prediction export.
#[derive(Debug, Deserialize)]
pub(crate) struct ReconcileRequest {
    #[serde(default)]
    pub(crate) selections: UserSelection,
    pub(crate) predictions: PredictionExport,
}

pub(crate) fn with_game_routes<R, S, D>(service: Arc<UnderwritingGameService<R, S, D>>) -> axum::Router
where
    R: SubmissionRepository + 'static,
    S: PredictionSource + 'static,
    D: TriageDispatcher + 'static,
{
    game_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/reconcile", axum::routing::post(reconcile_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn reconcile_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ReconcileRequest>,
) -> Result<Json<Reconciliation>, AppError> {
    let ReconcileRequest {
        selections,
        predictions,
    } = payload;

    let predictions = adapt_records(predictions.into_records())?;
    let reconciliation = state.engine.reconcile(&selections, &predictions)?;
    Ok(Json(reconciliation))
}
