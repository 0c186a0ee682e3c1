//! `POST /upload` -- stage files on upstream storage.

use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use easel_fal::PendingUpload;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Accepts one or more `file` parts. A single file keeps the flat
/// `{url, metadata}` response; several files are uploaded concurrently
/// and get the batch outcome with per-file failures. Only a batch where
/// every upload failed is an error.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut pending = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|error| {
        AppError::BadRequest(format!("Malformed multipart request: {error}"))
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload.bin".to_string());
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|error| AppError::BadRequest(format!("Failed to read upload: {error}")))?;
        pending.push(PendingUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    if pending.is_empty() {
        return Err(AppError::BadRequest(
            "No 'file' field in upload request".to_string(),
        ));
    }

    tracing::info!(files = pending.len(), "uploading to storage");
    if pending.len() == 1 {
        let file = pending.remove(0);
        let uploaded = state
            .fal
            .upload(&file.file_name, &file.content_type, file.bytes)
            .await?;
        Ok(Json(uploaded).into_response())
    } else {
        let outcome = state.fal.upload_batch(pending).await?;
        Ok(Json(outcome).into_response())
    }
}
