use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use hall_ticket::workflows::ingestion::{ingestion_router, IngestionService};
use hall_ticket::workflows::issuance::{issuance_router, HallTicketService, Mailer};
use hall_ticket::workflows::registry::RegistryRepository;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_application_routes<R, M>(
    ingestion: Arc<IngestionService<R>>,
    issuance: Arc<HallTicketService<R, M>>,
) -> axum::Router
where
    R: RegistryRepository + 'static,
    M: Mailer + ?Sized + 'static,
{
    ingestion_router(ingestion)
        .merge(issuance_router(issuance))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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
