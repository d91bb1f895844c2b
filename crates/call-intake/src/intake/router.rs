use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;

use super::service::{ExportError, IntakeService, SubmitError};
use super::stream::document_body;
use crate::document::PDF_CONTENT_TYPE;

/// Router exposing the webhook and the re-render endpoint.
pub fn intake_router(service: Arc<IntakeService>) -> Router {
    Router::new()
        .route(
            "/submit",
            post(submit_handler).fallback(|| async { method_not_allowed("POST") }),
        )
        .route(
            "/export",
            get(export_handler).fallback(|| async { method_not_allowed("GET") }),
        )
        .with_state(service)
}

fn method_not_allowed(allow: &'static str) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, allow)],
        "Method Not Allowed",
    )
        .into_response()
}

fn submit_response(status: StatusCode, message: &'static str) -> Response {
    (status, [(header::CACHE_CONTROL, "no-cache")], message).into_response()
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<IntakeService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    match service.submit(content_type, &body).await {
        Ok(receipt) => {
            tracing::info!(request_id = %receipt.request_id, "submission accepted");
            submit_response(StatusCode::OK, "Submitted.")
        }
        Err(err @ (SubmitError::UnsupportedContentType(_) | SubmitError::Decode(_))) => {
            tracing::warn!(error = %err, "invalid form submission");
            submit_response(StatusCode::BAD_REQUEST, "Invalid form submission!")
        }
        Err(err @ SubmitError::Invalid { .. }) => {
            tracing::warn!(error = %err, "invalid parameters provided");
            submit_response(StatusCode::BAD_REQUEST, "Invalid parameters provided!")
        }
        Err(err @ SubmitError::Serialize { .. }) => {
            tracing::error!(error = %err, "could not process request");
            submit_response(StatusCode::INTERNAL_SERVER_ERROR, "Could not process request.")
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportQuery {
    #[serde(rename = "requestId")]
    request_id: Option<String>,
}

pub(crate) async fn export_handler(
    State(service): State<Arc<IntakeService>>,
    Query(query): Query<ExportQuery>,
) -> Response {
    match service.archived(query.request_id.as_deref()).await {
        Ok((request_id, submission)) => {
            let disposition = format!("attachment; filename=\"{}\"", request_id.document_name());
            let body = document_body(request_id, submission, Utc::now());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response()
        }
        Err(err @ ExportError::InvalidRequestId(_)) => {
            tracing::debug!(error = %err, "export rejected");
            (StatusCode::BAD_REQUEST, "Invalid request id!").into_response()
        }
        Err(err @ ExportError::NotFound(_)) => {
            tracing::debug!(error = %err, "export rejected");
            (StatusCode::NOT_FOUND, "Submission not found.").into_response()
        }
        Err(err @ ExportError::Store { .. }) => {
            tracing::error!(error = %err, "export failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not load submission.").into_response()
        }
    }
}
