//! The request shaper: form values in, upstream payload out.

use serde_json::{json, Value};

use crate::category::ModelCategory;
use crate::descriptor::{ModelDescriptor, SizingMode};
use crate::error::CoreError;
use crate::registry::{defaults_for, ModelRegistry};
use crate::shaping::alias::resolve_model_id;
use crate::shaping::casing::camel_to_snake;
use crate::shaping::family::{ModelFamily, NamingConvention};

/// Width/height ratio above which enum sizing picks the wide token.
const LANDSCAPE_RATIO: f64 = 1.5;
/// Width/height ratio below which enum sizing picks the tall token.
const PORTRAIT_RATIO: f64 = 0.7;

/// Placeholder prompt injected when a prompt-bearing category arrives
/// without one. Input validation runs on the caller's raw values, so
/// this only covers internally constructed payloads.
const FALLBACK_PROMPT: &str = "A detailed, high quality scene";

/// A canonical model id and the payload ready to send upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedRequest {
    pub model_id: String,
    pub payload: serde_json::Map<String, Value>,
}

/// Shape form values into the payload a model's endpoint expects.
///
/// The only failure is an unresolvable model id. Everything after that
/// degrades gracefully: fields with no upstream mapping are dropped and
/// whatever remains is the upstream API's to accept or reject.
/// Deterministic: identical inputs serialize to identical payloads.
pub fn shape_request(
    registry: &ModelRegistry,
    raw_model_id: &str,
    values: &serde_json::Map<String, Value>,
) -> Result<ShapedRequest, CoreError> {
    let flat = flatten_envelope(values);
    let model_id = resolve_model_id(registry, raw_model_id)?;
    let descriptor = registry.get(&model_id).ok_or_else(|| {
        CoreError::Internal(format!("resolved id '{model_id}' missing from registry"))
    })?;
    let family = ModelFamily::of(&model_id);

    // Registry defaults first, caller values on top.
    let mut merged = defaults_for(descriptor);
    for (key, value) in &flat {
        let key = match family.naming() {
            NamingConvention::PassThrough => key.clone(),
            NamingConvention::Convert => camel_to_snake(key),
        };
        merged.insert(key, value.clone());
    }
    apply_required_fallbacks(descriptor.category, &mut merged);

    let payload = match family {
        ModelFamily::Veo3 => shape_veo3(merged),
        ModelFamily::NanoBananaEdit => shape_nano_banana(merged),
        ModelFamily::SeedreamEdit => shape_seedream(merged),
        ModelFamily::Flux => shape_flux(descriptor, merged),
        ModelFamily::StableVideo => {
            retain_keys(merged, category_whitelist(ModelCategory::VideoGeneration))
        }
        ModelFamily::Generic => retain_keys(merged, category_whitelist(descriptor.category)),
    };

    Ok(ShapedRequest { model_id, payload })
}

/// Flatten one `{"input": {...}}` envelope, inner fields winning over
/// duplicated outer ones. A stray `model` field is the route's concern,
/// never a generation parameter, and is dropped here.
pub fn flatten_envelope(values: &serde_json::Map<String, Value>) -> serde_json::Map<String, Value> {
    let mut flat = serde_json::Map::new();
    for (key, value) in values {
        if key == "input" || key == "model" {
            continue;
        }
        flat.insert(key.clone(), value.clone());
    }
    if let Some(Value::Object(inner)) = values.get("input") {
        for (key, value) in inner {
            flat.insert(key.clone(), value.clone());
        }
    }
    flat
}

/* --------------------------------------------------------------------------
   Family branches
   -------------------------------------------------------------------------- */

/// Veo 3 payloads arrive in final upstream form; only three optional
/// fields need defaulting and nothing is whitelisted away.
fn shape_veo3(mut payload: serde_json::Map<String, Value>) -> serde_json::Map<String, Value> {
    ensure_string(&mut payload, "aspect_ratio", "16:9");
    ensure_string(&mut payload, "duration", "8s");
    payload
        .entry("generate_audio")
        .or_insert(Value::Bool(true));
    payload
}

const NANO_BANANA_FIELDS: &[&str] = &[
    "prompt",
    "image_urls",
    "num_images",
    "output_format",
    "sync_mode",
];

fn shape_nano_banana(
    mut payload: serde_json::Map<String, Value>,
) -> serde_json::Map<String, Value> {
    fold_image_urls(&mut payload);
    retain_keys(payload, NANO_BANANA_FIELDS)
}

const SEEDREAM_FIELDS: &[&str] = &[
    "prompt",
    "image_urls",
    "num_images",
    "output_format",
    "sync_mode",
    "seed",
    "enable_safety_checker",
];

/// Seedream edits take either an enumerated `image_size` token or a
/// `{width, height}` object; an explicit token wins over derivation.
fn shape_seedream(mut payload: serde_json::Map<String, Value>) -> serde_json::Map<String, Value> {
    fold_image_urls(&mut payload);
    let image_size = match payload.remove("image_size") {
        Some(Value::String(token)) if !token.trim().is_empty() => Some(Value::String(token)),
        Some(object @ Value::Object(_)) => Some(object),
        _ => {
            let width = payload.get("width").and_then(Value::as_u64);
            let height = payload.get("height").and_then(Value::as_u64);
            match (width, height) {
                (Some(w), Some(h)) => Some(json!({ "width": w, "height": h })),
                (None, _) | (_, None) => None,
            }
        }
    };
    let mut shaped = retain_keys(payload, SEEDREAM_FIELDS);
    if let Some(image_size) = image_size {
        shaped.insert("image_size".to_string(), image_size);
    }
    shaped
}

const FLUX_NUMERIC_FIELDS: &[&str] = &[
    "prompt",
    "negative_prompt",
    "width",
    "height",
    "num_images",
    "num_inference_steps",
    "guidance_scale",
    "seed",
    "output_format",
    "enable_safety_checker",
    "sync_mode",
];

const FLUX_ENUM_FIELDS: &[&str] = &[
    "prompt",
    "negative_prompt",
    "num_images",
    "num_inference_steps",
    "guidance_scale",
    "seed",
    "output_format",
    "enable_safety_checker",
    "sync_mode",
    "safety_tolerance",
];

/// FLUX models keep a field whitelist; enum-sizing variants trade the
/// numeric dimensions for a derived `image_size` token.
fn shape_flux(
    descriptor: &ModelDescriptor,
    payload: serde_json::Map<String, Value>,
) -> serde_json::Map<String, Value> {
    match descriptor.output.sizing {
        SizingMode::Numeric => retain_keys(payload, FLUX_NUMERIC_FIELDS),
        SizingMode::Enum => {
            let token = image_size_token(&payload);
            let mut shaped = retain_keys(payload, FLUX_ENUM_FIELDS);
            shaped.insert("image_size".to_string(), Value::String(token));
            shaped
        }
        SizingMode::Fixed => retain_keys(payload, FLUX_ENUM_FIELDS),
    }
}

/// Derive the enum size token from an aspect-ratio string or the
/// width/height ratio. Anything that is not clearly wide or tall is
/// square.
fn image_size_token(payload: &serde_json::Map<String, Value>) -> String {
    let ratio = payload
        .get("aspect_ratio")
        .and_then(Value::as_str)
        .and_then(parse_aspect_ratio)
        .or_else(|| {
            let width = payload.get("width").and_then(Value::as_f64)?;
            let height = payload.get("height").and_then(Value::as_f64)?;
            (height > 0.0).then_some(width / height)
        });
    let token = match ratio {
        Some(r) if r > LANDSCAPE_RATIO => "landscape_16_9",
        Some(r) if r < PORTRAIT_RATIO => "portrait_16_9",
        Some(_) | None => "square",
    };
    token.to_string()
}

/// Parse `"16:9"` into the ratio 16/9.
fn parse_aspect_ratio(raw: &str) -> Option<f64> {
    let (w, h) = raw.split_once(':')?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    (h > 0.0).then_some(w / h)
}

/* --------------------------------------------------------------------------
   Category whitelists and helpers
   -------------------------------------------------------------------------- */

/// Fields forwarded upstream for models with no bespoke family branch.
/// Everything else is dropped so UI-only fields never leak upstream.
fn category_whitelist(category: ModelCategory) -> &'static [&'static str] {
    match category {
        ModelCategory::ImageGeneration => &[
            "prompt",
            "negative_prompt",
            "width",
            "height",
            "image_size",
            "num_images",
            "num_inference_steps",
            "guidance_scale",
            "seed",
            "output_format",
            "enable_safety_checker",
            "sync_mode",
        ],
        ModelCategory::VideoGeneration => &[
            "prompt",
            "negative_prompt",
            "image_url",
            "duration",
            "fps",
            "num_frames",
            "seed",
            "aspect_ratio",
            "resolution",
        ],
        ModelCategory::TextToSpeech => &["text", "voice", "speed"],
        ModelCategory::SpeechToText => &["audio_url", "task", "language", "chunk_level"],
        ModelCategory::AudioGeneration => &["prompt", "seconds_total", "steps", "seed"],
        ModelCategory::ImageEditing => &[
            "prompt",
            "image_url",
            "image_urls",
            "num_images",
            "output_format",
            "sync_mode",
            "seed",
        ],
        ModelCategory::Training => &[
            "images_data_url",
            "steps",
            "trigger_word",
            "create_masks",
            "learning_rate",
        ],
    }
}

/// Placeholder literals for fields a category cannot send without.
fn apply_required_fallbacks(category: ModelCategory, payload: &mut serde_json::Map<String, Value>) {
    match category {
        ModelCategory::ImageGeneration | ModelCategory::AudioGeneration => {
            ensure_string(payload, "prompt", FALLBACK_PROMPT);
        }
        ModelCategory::VideoGeneration
        | ModelCategory::TextToSpeech
        | ModelCategory::SpeechToText
        | ModelCategory::ImageEditing
        | ModelCategory::Training => {}
    }
}

/// Fold a singular `image_url` into the `image_urls` array the editing
/// families expect. An existing non-empty array wins.
fn fold_image_urls(payload: &mut serde_json::Map<String, Value>) {
    let singular = payload.remove("image_url");
    let mut urls: Vec<Value> = match payload.get("image_urls").cloned() {
        Some(Value::Array(items)) => items,
        Some(Value::String(s)) if !s.trim().is_empty() => vec![Value::String(s)],
        Some(_) | None => Vec::new(),
    };
    if urls.is_empty() {
        if let Some(Value::String(s)) = singular {
            if !s.trim().is_empty() {
                urls.push(Value::String(s));
            }
        }
    }
    if urls.is_empty() {
        payload.remove("image_urls");
    } else {
        payload.insert("image_urls".to_string(), Value::Array(urls));
    }
}

/// Keep only whitelisted, non-blank fields.
fn retain_keys(
    payload: serde_json::Map<String, Value>,
    keys: &[&str],
) -> serde_json::Map<String, Value> {
    payload
        .into_iter()
        .filter(|(key, value)| keys.contains(&key.as_str()) && !value_is_blank(value))
        .collect()
}

fn ensure_string(payload: &mut serde_json::Map<String, Value>, key: &str, value: &str) {
    let blank = match payload.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    };
    if blank {
        payload.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn value_is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/* --------------------------------------------------------------------------
   Tests
   -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn values(pairs: &[(&str, Value)]) -> serde_json::Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn shape(model: &str, pairs: &[(&str, Value)]) -> ShapedRequest {
        let registry = ModelRegistry::new();
        shape_request(&registry, model, &values(pairs)).unwrap()
    }

    // -- envelope and determinism --

    #[test]
    fn input_envelope_is_flattened() {
        let shaped = shape(
            "fal-ai/flux/dev",
            &[
                ("prompt", json!("outer")),
                ("input", json!({ "prompt": "inner", "seed": 7 })),
            ],
        );
        assert_eq!(shaped.payload["prompt"], json!("inner"));
        assert_eq!(shaped.payload["seed"], json!(7));
    }

    #[test]
    fn shaping_is_deterministic() {
        let registry = ModelRegistry::new();
        let input = values(&[
            ("prompt", json!("a red bicycle")),
            ("numInferenceSteps", json!(30)),
        ]);
        let a = shape_request(&registry, "fal-ai/flux/dev", &input).unwrap();
        let b = shape_request(&registry, "fal-ai/flux/dev", &input).unwrap();
        assert_eq!(
            serde_json::to_string(&a.payload).unwrap(),
            serde_json::to_string(&b.payload).unwrap()
        );
    }

    #[test]
    fn unknown_model_is_the_only_failure() {
        let registry = ModelRegistry::new();
        let err = shape_request(&registry, "fal-ai/not-a-model", &values(&[])).unwrap_err();
        assert_matches!(err, CoreError::UnknownModel { .. });
    }

    // -- merge and casing --

    #[test]
    fn flux_dev_gets_dimension_defaults() {
        let shaped = shape("fal-ai/flux/dev", &[("prompt", json!("a red bicycle"))]);
        assert_eq!(shaped.model_id, "fal-ai/flux/dev");
        assert_eq!(shaped.payload["prompt"], json!("a red bicycle"));
        assert_eq!(shaped.payload["width"], json!(1024));
        assert_eq!(shaped.payload["height"], json!(1024));
        assert_eq!(shaped.payload["num_inference_steps"], json!(28));
    }

    #[test]
    fn camel_case_input_is_converted_and_wins() {
        let shaped = shape(
            "fal-ai/flux/dev",
            &[("prompt", json!("x")), ("numInferenceSteps", json!(50))],
        );
        assert_eq!(shaped.payload["num_inference_steps"], json!(50));
        assert!(!shaped.payload.contains_key("numInferenceSteps"));
    }

    #[test]
    fn ui_only_fields_are_dropped() {
        let shaped = shape(
            "fal-ai/flux/dev",
            &[("prompt", json!("x")), ("previewQuality", json!("high"))],
        );
        assert!(!shaped.payload.contains_key("preview_quality"));
    }

    #[test]
    fn missing_prompt_gets_placeholder() {
        let shaped = shape("fal-ai/flux/dev", &[]);
        assert_eq!(shaped.payload["prompt"], json!(FALLBACK_PROMPT));
    }

    // -- flux enum sizing --

    #[test]
    fn enum_sizing_derives_token_from_aspect_ratio() {
        let shaped = shape(
            "fal-ai/flux-pro/v1.1-ultra",
            &[("prompt", json!("x")), ("aspectRatio", json!("16:9"))],
        );
        assert_eq!(shaped.payload["image_size"], json!("landscape_16_9"));
        assert!(!shaped.payload.contains_key("width"));
        assert!(!shaped.payload.contains_key("aspect_ratio"));
    }

    #[test]
    fn enum_sizing_derives_token_from_dimensions() {
        let cases = [
            (2048, 1024, "landscape_16_9"),
            (1024, 2048, "portrait_16_9"),
            (1024, 1024, "square"),
            // 4:3 is neither clearly wide nor tall.
            (1365, 1024, "square"),
        ];
        for (width, height, expected) in cases {
            let shaped = shape(
                "fal-ai/flux-pro/v1.1-ultra",
                &[
                    ("prompt", json!("x")),
                    ("width", json!(width)),
                    ("height", json!(height)),
                ],
            );
            assert_eq!(
                shaped.payload["image_size"],
                json!(expected),
                "{width}x{height}"
            );
        }
    }

    #[test]
    fn numeric_sizing_keeps_dimensions() {
        let shaped = shape(
            "fal-ai/flux/dev",
            &[
                ("prompt", json!("x")),
                ("width", json!(1536)),
                ("height", json!(1024)),
            ],
        );
        assert_eq!(shaped.payload["width"], json!(1536));
        assert!(!shaped.payload.contains_key("image_size"));
    }

    // -- veo3 passthrough --

    #[test]
    fn veo3_fields_pass_through_with_defaults() {
        let shaped = shape("fal-ai/veo3", &[("prompt", json!("waves at sunset"))]);
        assert_eq!(shaped.payload["aspect_ratio"], json!("16:9"));
        assert_eq!(shaped.payload["duration"], json!("8s"));
        assert_eq!(shaped.payload["generate_audio"], json!(true));
    }

    #[test]
    fn veo3_names_are_not_case_converted() {
        let shaped = shape(
            "fal-ai/veo3",
            &[("prompt", json!("x")), ("imageUrl", json!("https://e/a.png"))],
        );
        // Pass-through naming: the key arrives exactly as supplied.
        assert!(shaped.payload.contains_key("imageUrl"));
        assert!(!shaped.payload.contains_key("image_url"));
    }

    #[test]
    fn veo3_explicit_values_are_kept() {
        let shaped = shape(
            "fal-ai/veo3",
            &[
                ("prompt", json!("x")),
                ("duration", json!("4s")),
                ("generate_audio", json!(false)),
            ],
        );
        assert_eq!(shaped.payload["duration"], json!("4s"));
        assert_eq!(shaped.payload["generate_audio"], json!(false));
    }

    // -- editing families --

    #[test]
    fn nano_banana_folds_singular_image_url() {
        let shaped = shape(
            "fal-ai/nano-banana/edit",
            &[
                ("prompt", json!("make it snow")),
                ("imageUrl", json!("https://e/a.png")),
            ],
        );
        assert_eq!(shaped.payload["image_urls"], json!(["https://e/a.png"]));
        assert!(!shaped.payload.contains_key("image_url"));
    }

    #[test]
    fn nano_banana_existing_array_wins() {
        let shaped = shape(
            "fal-ai/nano-banana/edit",
            &[
                ("prompt", json!("x")),
                ("image_url", json!("https://e/one.png")),
                ("image_urls", json!(["https://e/a.png", "https://e/b.png"])),
            ],
        );
        assert_eq!(
            shaped.payload["image_urls"],
            json!(["https://e/a.png", "https://e/b.png"])
        );
    }

    #[test]
    fn seedream_prefers_explicit_size_token() {
        let shaped = shape(
            "fal-ai/bytedance/seedream/v4/edit",
            &[
                ("prompt", json!("x")),
                ("image_urls", json!(["https://e/a.png"])),
                ("imageSize", json!("square_hd")),
                ("width", json!(2048)),
                ("height", json!(1024)),
            ],
        );
        assert_eq!(shaped.payload["image_size"], json!("square_hd"));
    }

    #[test]
    fn seedream_derives_size_object_from_dimensions() {
        let shaped = shape(
            "fal-ai/bytedance/seedream/v4/edit",
            &[
                ("prompt", json!("x")),
                ("image_urls", json!(["https://e/a.png"])),
                ("width", json!(2048)),
                ("height", json!(1024)),
            ],
        );
        assert_eq!(
            shaped.payload["image_size"],
            json!({ "width": 2048, "height": 1024 })
        );
        assert!(!shaped.payload.contains_key("width"));
    }

    // -- generic whitelists --

    #[test]
    fn stable_video_keeps_video_fields_only() {
        let shaped = shape(
            "fal-ai/stable-video",
            &[
                ("imageUrl", json!("https://e/a.png")),
                ("fps", json!(12)),
                ("uiTheme", json!("dark")),
            ],
        );
        assert_eq!(shaped.payload["image_url"], json!("https://e/a.png"));
        assert_eq!(shaped.payload["fps"], json!(12));
        assert_eq!(shaped.payload["num_frames"], json!(25));
        assert!(!shaped.payload.contains_key("ui_theme"));
    }

    #[test]
    fn tts_whitelist_applies() {
        let shaped = shape(
            "fal-ai/kokoro",
            &[("text", json!("hello there")), ("panel", json!("left"))],
        );
        assert_eq!(shaped.payload["text"], json!("hello there"));
        assert_eq!(shaped.payload["voice"], json!("af_heart"));
        assert!(!shaped.payload.contains_key("panel"));
    }

    #[test]
    fn blank_values_are_dropped() {
        let shaped = shape(
            "fal-ai/kokoro",
            &[("text", json!("hi")), ("voice", json!("   "))],
        );
        assert!(!shaped.payload.contains_key("voice"));
    }
}
