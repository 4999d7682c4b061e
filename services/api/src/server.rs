use crate::cli::ServeArgs;
use crate::infra::{permit_service, AppState};
use crate::routes::with_permit_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use business_permits::config::AppConfig;
use business_permits::error::AppError;
use business_permits::telemetry;
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

    let service = permit_service(&config);
    info!(
        default_minimum_fee = %service.policy().default_minimum_fee(),
        validity_days = service.policy().validity_period().num_days(),
        required_inspections = service.policy().required_inspections().len(),
        reviewers = config.authorization.reviewers.len(),
        inspectors = config.authorization.inspectors.len(),
        "permit policy loaded"
    );

    let app = with_permit_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "business permit service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
