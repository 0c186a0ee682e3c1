//! History inspection, pruning, and transfer endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

use easel_history::{HistoryItem, ImportReport};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// `GET /history` -- all entries, newest first.
pub async fn list_history(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<HistoryItem>>>> {
    Ok(Json(DataResponse {
        data: state.history.list().await,
    }))
}

/// `DELETE /history/{id}`
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.history.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /history`
pub async fn clear_history(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.history.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /history/export` -- the bare interchange array, suitable for
/// feeding back into import unchanged.
pub async fn export_history(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<HistoryItem>>> {
    Ok(Json(state.history.export().await))
}

/// `POST /history/import` -- merge an exported array into the store.
pub async fn import_history(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> AppResult<Json<DataResponse<ImportReport>>> {
    let report = state.history.import(raw).await?;
    tracing::info!(
        imported = report.imported,
        discarded = report.discarded,
        duplicates = report.duplicates,
        "history import merged"
    );
    Ok(Json(DataResponse { data: report }))
}
