use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryPhotoStore, InMemoryReportRepository, LoggingReportNotifier};
use crate::routes::with_report_routes;
use aceras_check::config::AppConfig;
use aceras_check::error::AppError;
use aceras_check::telemetry;
use aceras_check::workflows::reports::ReportService;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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

    let report_service = Arc::new(ReportService::new(
        Arc::new(InMemoryReportRepository::default()),
        Arc::new(InMemoryPhotoStore::default()),
        Arc::new(LoggingReportNotifier::default()),
        config.reports.clone(),
    ));

    let app = with_report_routes(report_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        photo_max_bytes = config.reports.photo_max_bytes,
        "aceras check api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
