//! Catalog and form-schema endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use easel_core::category::ModelCategory;
use easel_core::descriptor::ModelDescriptor;
use easel_core::form::{build_form_schema, default_form_state, FormSchema, FormState};
use easel_core::shaping::resolve_model_id;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub category: Option<String>,
}

/// `GET /models` -- the full catalog, optionally filtered by category.
pub async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> AppResult<Json<DataResponse<Vec<ModelDescriptor>>>> {
    let models = match query.category.as_deref() {
        Some(raw) => {
            let category = ModelCategory::parse(raw).map_err(AppError::BadRequest)?;
            state.registry.list_by_category(category)
        }
        None => state.registry.list(),
    };
    Ok(Json(DataResponse {
        data: models.into_iter().cloned().collect(),
    }))
}

/// `GET /models/{*id}` -- one descriptor. The wildcard is needed because
/// canonical ids contain slashes; aliases and URL forms resolve too.
pub async fn get_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<ModelDescriptor>>> {
    let model_id = resolve_model_id(&state.registry, &id)?;
    let descriptor = state.registry.get(&model_id).cloned().ok_or_else(|| {
        AppError::Internal(format!("resolved id '{model_id}' missing from registry"))
    })?;
    Ok(Json(DataResponse { data: descriptor }))
}

#[derive(Debug, Deserialize)]
pub struct SchemaQuery {
    pub model: Option<String>,
}

/// Generated form layout plus the initial values to render it with.
#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub schema: FormSchema,
    pub defaults: FormState,
}

/// `GET /schema?model=` -- the derived form schema for one model.
pub async fn form_schema(
    State(state): State<AppState>,
    Query(query): Query<SchemaQuery>,
) -> AppResult<Json<DataResponse<SchemaResponse>>> {
    let raw = query
        .model
        .ok_or_else(|| AppError::BadRequest("Missing 'model' query parameter".to_string()))?;
    let model_id = resolve_model_id(&state.registry, &raw)?;
    let descriptor = state.registry.get(&model_id).ok_or_else(|| {
        AppError::Internal(format!("resolved id '{model_id}' missing from registry"))
    })?;
    Ok(Json(DataResponse {
        data: SchemaResponse {
            schema: build_form_schema(descriptor),
            defaults: default_form_state(descriptor),
        },
    }))
}
