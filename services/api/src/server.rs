use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState};
use crate::routes::with_timetable_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use room_planner::config::AppConfig;
use room_planner::error::AppError;
use room_planner::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let timetable_service = build_service(&config).await?;

    let app = with_timetable_routes(timetable_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        database = %config.database.url,
        unknown_days = ?config.scheduling.unknown_days,
        "room planner ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
