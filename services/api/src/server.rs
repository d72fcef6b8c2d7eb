use crate::cli::ServeArgs;
use crate::infra::{
    expiration_scanner, AppState, ConfiguredDispatcher, InMemoryAuthProvider, InMemoryBlobStore,
    InMemoryRequirementStore, InMemoryUserRepository,
};
use crate::routes::app_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use compliance_tracker::accounts::AccountService;
use compliance_tracker::config::AppConfig;
use compliance_tracker::error::AppError;
use compliance_tracker::requirements::RequirementService;
use compliance_tracker::telemetry;
use std::sync::atomic::Ordering;
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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let blobs = InMemoryBlobStore::new(config.storage.public_base_url.clone());
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        blobs: blobs.clone(),
    };

    let dispatcher = ConfiguredDispatcher::from_config(config.notifications.email.as_ref());
    let sends_email = dispatcher.sends_email();
    let requirement_service = Arc::new(RequirementService::new(
        Arc::new(InMemoryRequirementStore::default()),
        Arc::new(blobs),
        expiration_scanner(&config.notifications, dispatcher),
    ));
    let account_service = Arc::new(AccountService::new(
        Arc::new(InMemoryAuthProvider::default()),
        Arc::new(InMemoryUserRepository::default()),
    ));

    let app = app_routes(requirement_service, account_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        window_days = config.notifications.window_days,
        notify_once = config.notifications.notify_once,
        sends_email,
        "compliance tracker ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
