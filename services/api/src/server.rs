use crate::cli::ServeArgs;
use crate::infra::{
    load_catalog, prediction_source, AppState, ConfiguredDispatcher, InMemorySubmissionRepository,
};
use crate::routes::with_game_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use underwriting_ai::config::AppConfig;
use underwriting_ai::error::AppError;
use underwriting_ai::telemetry;
use underwriting_ai::workflows::underwriting::{ReconciliationEngine, UnderwritingGameService};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engine: Arc::new(ReconciliationEngine::new(config.game.reconciliation)),
    };

    let catalog = load_catalog(&config.game);
    config.game.ensure_covers_catalog(catalog.len())?;
    let game_service = Arc::new(
        UnderwritingGameService::new(
            catalog,
            Arc::new(InMemorySubmissionRepository::default()),
            Arc::new(prediction_source(&config.game)),
            Arc::new(ConfiguredDispatcher::from_mode(config.game.triage_dispatch)),
            config.game.reconciliation,
        )
        .with_triage_base_url(config.game.triage_base_url.clone()),
    );

    let app = with_game_routes(game_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        rule = ?config.game.reconciliation.discard_high_rule,
        "underwriting game service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
