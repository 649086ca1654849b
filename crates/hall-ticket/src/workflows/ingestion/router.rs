use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;
use tracing::error;

use super::service::IngestionService;
use super::IngestionError;
use crate::workflows::registry::RegistryRepository;

/// Largest accepted upload body.
pub const UPLOAD_LIMIT_BYTES: usize = 25 * 1024 * 1024;

/// Router builder exposing the bulk upload and wipe endpoints.
pub fn ingestion_router<R>(service: Arc<IngestionService<R>>) -> Router
where
    R: RegistryRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/uploads",
            post(upload_handler::<R>).delete(wipe_handler::<R>),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .with_state(service)
}

#[derive(Default)]
struct UploadForm {
    file_name: Option<String>,
    bytes: Vec<u8>,
    upload_type: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, String> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|err| err.to_string())? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                form.file_name = field.file_name().map(str::to_string);
                form.bytes = field.bytes().await.map_err(|err| err.to_string())?.to_vec();
            }
            Some("uploadType") => {
                form.upload_type = Some(field.text().await.map_err(|err| err.to_string())?);
            }
            _ => {}
        }
    }
    Ok(form)
}

pub(crate) async fn upload_handler<R>(
    State(service): State<Arc<IngestionService<R>>>,
    multipart: Multipart,
) -> Response
where
    R: RegistryRepository + 'static,
{
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(detail) => {
            let payload = json!({ "message": "Invalid or missing file", "error": detail });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    let Some(file_name) = form.file_name else {
        return validation_response(&IngestionError::MissingFile);
    };
    let upload_type = form.upload_type.unwrap_or_default();

    match service
        .ingest_upload(&file_name, &upload_type, &form.bytes)
        .await
    {
        Ok(summary) => {
            let payload = json!({
                "message": "File processed successfully",
                "summary": summary,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) if err.is_validation() => validation_response(&err),
        Err(err) => {
            error!(error = %err, file = %file_name, "upload processing failed");
            let payload = json!({ "message": "Error processing file" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn validation_response(err: &IngestionError) -> Response {
    let message = match err {
        IngestionError::UnknownUploadKind(_) => "Invalid upload type",
        _ => "Invalid or missing file",
    };
    let payload = json!({ "message": message, "error": err.to_string() });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

pub(crate) async fn wipe_handler<R>(State(service): State<Arc<IngestionService<R>>>) -> Response
where
    R: RegistryRepository + 'static,
{
    match service.wipe().await {
        Ok(summary) => {
            let payload = json!({
                "message": "All uploaded data deleted successfully",
                "deleted": summary,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => {
            error!(error = %err, "bulk wipe failed");
            let payload = json!({ "message": "Failed to delete data" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
