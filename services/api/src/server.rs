use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryDashboardBoard, TracingNotifier};
use crate::routes::with_registration_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use sunday_registration::config::AppConfig;
use sunday_registration::error::AppError;
use sunday_registration::telemetry;
use sunday_registration::workflows::registration::{CsvRegistrationStore, RegistrationService};
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(data_dir) = args.data_dir.take() {
        config.registration.data_dir = data_dir;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(CsvRegistrationStore::open(&config.registration.data_dir)?);
    let notifier = Arc::new(TracingNotifier::default());
    let dashboards = Arc::new(InMemoryDashboardBoard::default());
    let registration_service = Arc::new(RegistrationService::new(
        store,
        notifier,
        dashboards,
        config.registration.settings(),
    ));

    let app = with_registration_routes(registration_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        data_dir = %config.registration.data_dir.display(),
        cutoff_hour = config.registration.cutoff_hour,
        timezone = %config.registration.timezone,
        "sunday registration service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
