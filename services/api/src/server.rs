use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hall_ticket::config::AppConfig;
use hall_ticket::error::AppError;
use hall_ticket::telemetry;
use hall_ticket::workflows::ingestion::IngestionService;
use hall_ticket::workflows::issuance::{ArtifactRenderer, HallTicketService, SmtpMailer};
use hall_ticket::workflows::registry::InMemoryRegistry;
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
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let upload_dir = config.storage.upload_dir.clone();
    tokio::fs::create_dir_all(&upload_dir).await?;

    let registry = Arc::new(InMemoryRegistry::default());
    let mailer = Arc::new(SmtpMailer::from_config(&config.mail)?);
    let renderer = ArtifactRenderer::new(Some(config.storage.header_image.clone()));
    let ingestion = Arc::new(IngestionService::new(registry.clone(), upload_dir.clone()));
    let issuance = Arc::new(HallTicketService::new(
        registry,
        mailer,
        renderer,
        upload_dir.clone(),
    ));

    let app = with_application_routes(ingestion, issuance)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        upload_dir = %upload_dir.display(),
        smtp_host = %config.mail.smtp_host,
        "hall ticket service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
