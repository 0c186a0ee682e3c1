//! Upstream response normalization and per-category validation.
//!
//! Upstream models are inconsistent about singular vs plural result
//! fields; normalization settles on the plural array form. Validation
//! then checks that the field a category promises is actually there and
//! non-empty -- an upstream 200 with no usable result is still a failure,
//! reported with the raw body attached for diagnostics.

use serde_json::Value;

use crate::category::ModelCategory;
use crate::error::CoreError;

/// Rewrite singular `image`/`video` results into their plural array
/// forms. Pure; responses already in plural form pass through
/// unchanged, so applying it twice is a no-op.
pub fn normalize_response(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        promote_singular(map, "image", "images");
        promote_singular(map, "video", "videos");
    }
    value
}

fn promote_singular(map: &mut serde_json::Map<String, Value>, singular: &str, plural: &str) {
    if map.contains_key(plural) {
        return;
    }
    if let Some(item) = map.remove(singular) {
        if !item.is_null() {
            map.insert(plural.to_string(), Value::Array(vec![item]));
        }
    }
}

/// Check that a successful upstream response actually carries the
/// result its category promises.
pub fn validate_response(category: ModelCategory, value: &Value) -> Result<(), CoreError> {
    match category {
        ModelCategory::ImageGeneration | ModelCategory::ImageEditing => {
            require_non_empty_array(value, "images")
        }
        ModelCategory::VideoGeneration => require_video(value),
        ModelCategory::TextToSpeech | ModelCategory::AudioGeneration => {
            require_any_present(value, &["audio", "audio_file", "audio_url"])
        }
        ModelCategory::SpeechToText => require_transcription(value),
        ModelCategory::Training => require_any_present(value, &["diffusers_lora_file"]),
    }
}

fn invalid(reason: String, raw: &Value) -> CoreError {
    CoreError::InvalidResponse {
        reason,
        raw: raw.clone(),
    }
}

/// Missing field and empty array are distinct failures.
fn require_non_empty_array(value: &Value, field: &str) -> Result<(), CoreError> {
    match value.get(field) {
        None | Some(Value::Null) => Err(invalid(
            format!("upstream response has no '{field}' field"),
            value,
        )),
        Some(Value::Array(items)) if items.is_empty() => Err(invalid(
            format!("upstream response '{field}' array is empty"),
            value,
        )),
        Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(invalid(
            format!("upstream response '{field}' is not an array"),
            value,
        )),
    }
}

/// Accept either the singular `video` object (pre-normalization) or a
/// non-empty `videos` array.
fn require_video(value: &Value) -> Result<(), CoreError> {
    match (value.get("video"), value.get("videos")) {
        (Some(video), _) if !video.is_null() => Ok(()),
        (_, Some(Value::Array(items))) if !items.is_empty() => Ok(()),
        (_, Some(Value::Array(_))) => Err(invalid(
            "upstream response 'videos' array is empty".to_string(),
            value,
        )),
        (_, _) => Err(invalid(
            "upstream response has no 'video' or 'videos' field".to_string(),
            value,
        )),
    }
}

fn require_transcription(value: &Value) -> Result<(), CoreError> {
    let present = ["text", "transcription"].iter().any(|field| {
        match value.get(*field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    });
    if present {
        Ok(())
    } else {
        Err(invalid(
            "upstream response has no 'text' or 'transcription' field".to_string(),
            value,
        ))
    }
}

fn require_any_present(value: &Value, fields: &[&str]) -> Result<(), CoreError> {
    let present = fields
        .iter()
        .any(|field| matches!(value.get(*field), Some(v) if !v.is_null()));
    if present {
        Ok(())
    } else {
        Err(invalid(
            format!("upstream response has none of {}", fields.join(", ")),
            value,
        ))
    }
}

/* --------------------------------------------------------------------------
   Tests
   -------------------------------------------------------------------------- */
