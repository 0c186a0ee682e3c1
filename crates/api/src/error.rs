use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

use easel_core::error::CoreError;
use easel_fal::FalError;
use easel_history::HistoryError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors of the workspace crates and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce the
/// `{ "error": ..., "details"?: ... }` JSON bodies every failure path
/// shares.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `easel-core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An upstream client error from `easel-fal`.
    #[error(transparent)]
    Upstream(#[from] FalError),

    /// A persistence error from `easel-history`.
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Input validation failures, reported as a list of messages.
    #[error("Validation failed")]
    Validation(Vec<String>),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::Core(core) => core_response(core),
            AppError::Upstream(upstream) => upstream_response(upstream),
            AppError::History(history) => history_response(history),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(Value::Array(
                    errors.into_iter().map(Value::String).collect(),
                )),
            ),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            AppError::Internal(message) => {
                tracing::error!(error = %message, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({ "error": message });
        if let Some(details) = details {
            body["details"] = details;
        }
        (status, axum::Json(body)).into_response()
    }
}

fn core_response(error: CoreError) -> (StatusCode, String, Option<Value>) {
    match error {
        CoreError::Validation(message) => (StatusCode::BAD_REQUEST, message, None),
        CoreError::UnknownModel {
            requested,
            known,
            suggestions,
        } => (
            StatusCode::BAD_REQUEST,
            format!("Model not found: {requested}"),
            Some(json!({ "knownModels": known, "suggestions": suggestions })),
        ),
        CoreError::InvalidResponse { reason, raw } => {
            tracing::error!(%reason, "upstream response failed validation");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid upstream response: {reason}"),
                Some(raw),
            )
        }
        CoreError::Internal(message) => {
            tracing::error!(error = %message, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
                None,
            )
        }
    }
}

fn upstream_response(error: FalError) -> (StatusCode, String, Option<Value>) {
    match error {
        FalError::MissingCredentials => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "FAL_KEY is not configured".to_string(),
            None,
        ),
        FalError::Api { status, body } => api_failure_response(status, body),
        FalError::Request(error) => {
            tracing::error!(%error, "upstream request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upstream request failed".to_string(),
                None,
            )
        }
        FalError::BatchFailed(message) => (StatusCode::INTERNAL_SERVER_ERROR, message, None),
    }
}

/// Map an upstream HTTP failure onto our surface.
///
/// Auth failures fold into 404 so the response never reveals whether a
/// model exists upstream; parameter rejections (422) keep their status
/// and carry the upstream detail body verbatim.
fn api_failure_response(status: u16, body: String) -> (StatusCode, String, Option<Value>) {
    let details = match serde_json::from_str::<Value>(&body) {
        Ok(parsed) => Some(parsed),
        Err(_) if body.trim().is_empty() => None,
        Err(_) => Some(Value::String(body)),
    };
    match status {
        401 | 403 | 404 => (
            StatusCode::NOT_FOUND,
            "Model endpoint not found or unauthorized".to_string(),
            details,
        ),
        422 => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Upstream rejected the request parameters".to_string(),
            details,
        ),
        other => {
            tracing::error!(status = other, "upstream call failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Upstream request failed with status {other}"),
                details,
            )
        }
    }
}

fn history_response(error: HistoryError) -> (StatusCode, String, Option<Value>) {
    match error {
        HistoryError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            format!("History item not found: {id}"),
            None,
        ),
        HistoryError::InvalidImport(message) => (StatusCode::BAD_REQUEST, message, None),
        HistoryError::Io(error) => {
            tracing::error!(%error, "history storage error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
                None,
            )
        }
        HistoryError::Serde(error) => {
            tracing::error!(%error, "history encoding error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
                None,
            )
        }
    }
}
