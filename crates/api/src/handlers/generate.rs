//! `POST /generate` -- the whole generation flow in one handler:
//! resolve, validate, shape, dispatch, check the response, record
//! history, and echo the result back with request metadata.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use easel_core::category::ModelCategory;
use easel_core::response::{normalize_response, validate_response};
use easel_core::shaping::{flatten_envelope, resolve_model_id, shape_request, ModelFamily};
use easel_core::types::Timestamp;
use easel_fal::dispatch;
use easel_history::{HistoryItem, ItemMetadata, NormalizedResult};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Wire shape of a successful generation: the normalized upstream body
/// plus request metadata.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub data: Value,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    /// Canonical model id the request resolved to.
    pub model: String,
    pub model_name: String,
    pub category: ModelCategory,
    pub provider: String,
    /// Wall-clock milliseconds spent up to the validated upstream response.
    pub processing_time: u64,
    pub timestamp: Timestamp,
}

pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<Json<GenerateResponse>> {
    let started = std::time::Instant::now();

    let Value::Object(body) = body else {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };
    let model_ref = body
        .get("model")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'model' field".to_string()))?
        .to_string();

    let model_id = resolve_model_id(&state.registry, &model_ref)?;
    let descriptor = state
        .registry
        .get(&model_id)
        .cloned()
        .ok_or_else(|| {
            AppError::Internal(format!("resolved id '{model_id}' missing from registry"))
        })?;

    // Validate the caller's own fields, before defaults are merged in.
    // Flattening also drops the `model` key and any `input` envelope.
    let params = flatten_envelope(&body);
    let report = state.registry.validate(&model_id, &params);
    if !report.valid {
        return Err(AppError::Validation(report.errors));
    }

    let shaped = shape_request(&state.registry, &model_id, &params)?;
    tracing::info!(
        model = %shaped.model_id,
        fields = shaped.payload.len(),
        "dispatching generation"
    );

    let family = ModelFamily::of(&shaped.model_id);
    let raw = dispatch(&state.fal, family, &shaped.model_id, &shaped.payload).await?;
    let normalized = normalize_response(raw);
    validate_response(descriptor.category, &normalized)?;

    let processing_time = started.elapsed().as_millis() as u64;
    let timestamp = Utc::now();

    let item = HistoryItem {
        id: Uuid::new_v4().to_string(),
        timestamp,
        model_id: shaped.model_id.clone(),
        model_name: descriptor.name.to_string(),
        category: descriptor.category,
        provider: descriptor.provider.to_string(),
        prompt: display_prompt(&shaped.payload),
        input_params: shaped.payload.clone(),
        result: NormalizedResult::from_upstream(descriptor.category, &normalized),
        metadata: Some(ItemMetadata {
            processing_time_ms: processing_time,
            version: 1,
        }),
    };
    // A full or failing history store must never fail a generation that
    // already succeeded upstream.
    if let Err(error) = state.history.add(item).await {
        tracing::error!(%error, "failed to record history entry");
    }

    Ok(Json(GenerateResponse {
        data: normalized,
        metadata: GenerationMetadata {
            model: shaped.model_id,
            model_name: descriptor.name.to_string(),
            category: descriptor.category,
            provider: descriptor.provider.to_string(),
            processing_time,
            timestamp,
        },
    }))
}

/// Best-effort display string for history listings.
fn display_prompt(payload: &serde_json::Map<String, Value>) -> String {
    ["prompt", "text"]
        .iter()
        .find_map(|key| payload.get(*key))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}
