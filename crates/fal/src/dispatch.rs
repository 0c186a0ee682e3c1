//! Per-family dispatch, including the Stable Video fallback ladder.
//!
//! Stable Video Diffusion deployments disagree about which optional
//! parameters they accept; a full payload that one deployment takes is
//! a 4xx on another. The empirically derived ladder retries with
//! progressively smaller parameter sets, and when every rung fails the
//! caller gets the original error, not the least informative one.

use serde_json::Value;

use easel_core::shaping::family::ModelFamily;

use crate::client::FalClient;
use crate::error::FalError;

/// Execute a shaped request upstream, applying family retry behavior.
pub async fn dispatch(
    client: &FalClient,
    family: ModelFamily,
    model_id: &str,
    payload: &serde_json::Map<String, Value>,
) -> Result<Value, FalError> {
    match family {
        ModelFamily::StableVideo => dispatch_stable_video(client, model_id, payload).await,
        ModelFamily::Veo3
        | ModelFamily::NanoBananaEdit
        | ModelFamily::SeedreamEdit
        | ModelFamily::Flux
        | ModelFamily::Generic => client.run(model_id, payload).await,
    }
}

async fn dispatch_stable_video(
    client: &FalClient,
    model_id: &str,
    payload: &serde_json::Map<String, Value>,
) -> Result<Value, FalError> {
    let first_error = match client.run(model_id, payload).await {
        Ok(value) => return Ok(value),
        Err(error) => error,
    };
    // No credentials means every rung fails identically; don't bother.
    if matches!(first_error, FalError::MissingCredentials) {
        return Err(first_error);
    }
    tracing::warn!(
        model = model_id,
        error = %first_error,
        "stable-video dispatch failed, walking fallback ladder"
    );

    for (attempt, reduced) in fallback_attempts(payload) {
        tracing::warn!(model = model_id, attempt, "retrying with reduced parameter set");
        match client.run(model_id, &reduced).await {
            Ok(value) => {
                tracing::info!(model = model_id, attempt, "fallback attempt succeeded");
                return Ok(value);
            }
            Err(error) => {
                tracing::warn!(model = model_id, attempt, error = %error, "fallback attempt failed");
            }
        }
    }
    Err(first_error)
}

/// The ladder rungs, biggest first: the conservative fixed set, the
/// same set with `frame_rate` in place of `fps`, then the image alone.
fn fallback_attempts(
    payload: &serde_json::Map<String, Value>,
) -> Vec<(&'static str, serde_json::Map<String, Value>)> {
    let conservative = subset(payload, &["image_url", "fps", "num_frames"]);

    let mut frame_rate = subset(payload, &["image_url", "num_frames"]);
    if let Some(fps) = payload.get("fps") {
        frame_rate.insert("frame_rate".to_string(), fps.clone());
    }

    let image_only = subset(payload, &["image_url"]);

    vec![
        ("conservative", conservative),
        ("frame-rate", frame_rate),
        ("image-only", image_only),
    ]
}

fn subset(
    payload: &serde_json::Map<String, Value>,
    keys: &[&str],
) -> serde_json::Map<String, Value> {
    keys.iter()
        .filter_map(|key| {
            payload
                .get(*key)
                .map(|value| (key.to_string(), value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> serde_json::Map<String, Value> {
        [
            ("image_url", json!("https://e/a.png")),
            ("fps", json!(25)),
            ("num_frames", json!(25)),
            ("motion_bucket_id", json!(127)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn ladder_has_three_rungs_in_order() {
        let attempts = fallback_attempts(&payload());
        let names: Vec<_> = attempts.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["conservative", "frame-rate", "image-only"]);
    }

    #[test]
    fn conservative_rung_keeps_the_fixed_set() {
        let attempts = fallback_attempts(&payload());
        let (_, conservative) = &attempts[0];
        assert_eq!(conservative.len(), 3);
        assert_eq!(conservative["fps"], json!(25));
        assert!(!conservative.contains_key("motion_bucket_id"));
    }

    #[test]
    fn frame_rate_rung_renames_fps() {
        let attempts = fallback_attempts(&payload());
        let (_, frame_rate) = &attempts[1];
        assert_eq!(frame_rate["frame_rate"], json!(25));
        assert!(!frame_rate.contains_key("fps"));
    }

    #[test]
    fn image_only_rung_is_minimal() {
        let attempts = fallback_attempts(&payload());
        let (_, image_only) = &attempts[2];
        assert_eq!(image_only.len(), 1);
        assert_eq!(image_only["image_url"], json!("https://e/a.png"));
    }

    #[test]
    fn absent_fields_are_not_invented() {
        let sparse: serde_json::Map<String, Value> =
            [("image_url".to_string(), json!("https://e/a.png"))]
                .into_iter()
                .collect();
        let attempts = fallback_attempts(&sparse);
        let (_, frame_rate) = &attempts[1];
        assert!(!frame_rate.contains_key("frame_rate"));
    }
}
