use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::delivery::Mailer;
use super::service::HallTicketService;
use super::IssuanceError;
use crate::workflows::registry::{RegistryRepository, StudentId};

/// Router builder exposing hall ticket issuance and the subject lookup.
pub fn issuance_router<R, M>(service: Arc<HallTicketService<R, M>>) -> Router
where
    R: RegistryRepository + 'static,
    M: Mailer + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/hall-tickets", post(issue_handler::<R, M>))
        .route(
            "/api/v1/students/:student_id/subjects",
            get(subjects_handler::<R, M>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IssueRequest {
    #[serde(default)]
    pub(crate) student_id: Option<String>,
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
}

fn parse_student_id(raw: &str) -> Result<StudentId, Response> {
    raw.parse().map_err(|_| bad_request("Invalid student ID"))
}

pub(crate) async fn issue_handler<R, M>(
    State(service): State<Arc<HallTicketService<R, M>>>,
    payload: Option<Json<IssueRequest>>,
) -> Response
where
    R: RegistryRepository + 'static,
    M: Mailer + ?Sized + 'static,
{
    let raw = payload
        .and_then(|Json(request)| request.student_id)
        .filter(|id| !id.trim().is_empty());
    let Some(raw) = raw else {
        return bad_request("Student ID is required");
    };
    let student_id = match parse_student_id(&raw) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match service.issue(&student_id).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Hall Ticket sent successfully" })),
        )
            .into_response(),
        Err(err) => issuance_failure(err),
    }
}

pub(crate) async fn subjects_handler<R, M>(
    State(service): State<Arc<HallTicketService<R, M>>>,
    Path(student_id): Path<String>,
) -> Response
where
    R: RegistryRepository + 'static,
    M: Mailer + ?Sized + 'static,
{
    let student_id = match parse_student_id(&student_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match service.subject_overview(&student_id) {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(err) => issuance_failure(err),
    }
}

fn issuance_failure(err: IssuanceError) -> Response {
    let (status, message) = match &err {
        IssuanceError::StudentNotFound(_) | IssuanceError::UnknownRegistration(_) => {
            (StatusCode::NOT_FOUND, "Student not found")
        }
        IssuanceError::NoSubjects(_) => (StatusCode::NOT_FOUND, "No subjects found for this student"),
        IssuanceError::Delivery(_) => {
            error!(error = %err, "hall ticket delivery failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error sending Hall Ticket")
        }
        IssuanceError::Repository(_) | IssuanceError::Render(_) => {
            error!(error = %err, "hall ticket generation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error generating Hall Ticket")
        }
    };
    (status, Json(json!({ "message": message }))).into_response()
}
