pub mod health;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the root route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate              run a model (POST)
/// /upload                stage files on storage (POST, multipart)
///
/// /models                catalog list (GET, ?category= filter)
/// /models/{*id}          one descriptor (GET; ids contain slashes)
/// /schema                derived form schema (GET, ?model=)
///
/// /history               list (GET), clear (DELETE)
/// /history/export        interchange array (GET)
/// /history/import        merge an exported array (POST)
/// /history/{id}          remove one entry (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(handlers::generate::generate))
        .route("/upload", post(handlers::upload::upload))
        .route("/models", get(handlers::models::list_models))
        .route("/models/{*id}", get(handlers::models::get_model))
        .route("/schema", get(handlers::models::form_schema))
        .route(
            "/history",
            get(handlers::history::list_history).delete(handlers::history::clear_history),
        )
        .route("/history/export", get(handlers::history::export_history))
        .route("/history/import", post(handlers::history::import_history))
        .route("/history/{id}", delete(handlers::history::delete_item))
}
