//! Static model catalog and its lookup/validation surface.
//!
//! The registry is an explicitly constructed object, not a module-level
//! singleton: callers build one with [`ModelRegistry::new`], hold it
//! behind an `Arc`, and pass it by reference. It records when the
//! catalog was loaded so callers can refresh a stale instance via
//! [`ModelRegistry::reload`].
//!
//! Input validation here is the system's single error taxonomy for bad
//! requests: a [`ValidationReport`] carries human-readable strings and
//! is returned, never thrown.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::category::ModelCategory;
use crate::descriptor::{
    Capabilities, CustomParam, ModelDescriptor, OutputSpec, ParamKind, SizingMode,
};
use crate::types::Timestamp;

/// How long a loaded catalog is considered fresh.
const DEFAULT_CATALOG_MAX_AGE_SECS: i64 = 3600;

/// Default output dimensions applied to image generation requests.
pub const DEFAULT_IMAGE_WIDTH: u32 = 1024;
/// Default output dimensions applied to image generation requests.
pub const DEFAULT_IMAGE_HEIGHT: u32 = 1024;

/* --------------------------------------------------------------------------
   Registry
   -------------------------------------------------------------------------- */

/// Lookup table of model descriptors plus the short-alias map.
pub struct ModelRegistry {
    models: IndexMap<&'static str, ModelDescriptor>,
    aliases: HashMap<&'static str, &'static str>,
    loaded_at: Timestamp,
    max_age: chrono::Duration,
}

impl ModelRegistry {
    /// Build the registry from the static catalog.
    pub fn new() -> Self {
        let mut models = IndexMap::new();
        for descriptor in catalog() {
            let previous = models.insert(descriptor.id, descriptor);
            debug_assert!(previous.is_none(), "duplicate model id in catalog");
        }
        Self {
            models,
            aliases: alias_table(),
            loaded_at: chrono::Utc::now(),
            max_age: chrono::Duration::seconds(DEFAULT_CATALOG_MAX_AGE_SECS),
        }
    }

    /// When the catalog was last (re)loaded.
    pub fn loaded_at(&self) -> Timestamp {
        self.loaded_at
    }

    /// Whether the catalog has outlived its freshness window.
    pub fn is_stale(&self) -> bool {
        chrono::Utc::now() - self.loaded_at > self.max_age
    }

    /// Rebuild the catalog and refresh the load timestamp.
    pub fn reload(&mut self) {
        *self = Self::new();
        tracing::debug!(models = self.models.len(), "model catalog reloaded");
    }

    /// Look up a descriptor by canonical id.
    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.get(id)
    }

    /// Whether a canonical id is registered.
    pub fn exists(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    /// All descriptors in catalog order.
    pub fn list(&self) -> Vec<&ModelDescriptor> {
        self.models.values().collect()
    }

    /// Descriptors for one category, in catalog order.
    pub fn list_by_category(&self, category: ModelCategory) -> Vec<&ModelDescriptor> {
        self.models
            .values()
            .filter(|m| m.category == category)
            .collect()
    }

    /// All canonical model ids, in catalog order.
    pub fn known_ids(&self) -> Vec<String> {
        self.models.keys().map(|id| id.to_string()).collect()
    }

    /// Resolve a registered short alias to its canonical id.
    pub fn alias_target(&self, alias: &str) -> Option<&'static str> {
        self.aliases.get(alias).copied()
    }

    /// Default parameters for a model, in upstream (snake_case) naming.
    ///
    /// Models carrying a custom parameter schema take their defaults from
    /// that schema; everything else uses the category default table.
    pub fn default_params(&self, id: &str) -> Option<serde_json::Map<String, Value>> {
        self.get(id).map(defaults_for)
    }

    /// Validate request input against a model's category rules.
    ///
    /// Checks accept both UI (`imageUrl`) and upstream (`image_url`)
    /// spellings of a field. Unknown ids yield a single-error report
    /// rather than a panic -- callers that need suggestions resolve the
    /// id through the shaper first.
    pub fn validate(&self, id: &str, input: &serde_json::Map<String, Value>) -> ValidationReport {
        let Some(descriptor) = self.get(id) else {
            return ValidationReport::invalid(vec![format!("Model '{id}' not found")]);
        };

        let mut errors = Vec::new();
        match descriptor.category {
            ModelCategory::ImageGeneration => {
                if !has_text(input, &["prompt"]) {
                    errors.push("Prompt is required for image generation".to_string());
                }
                check_resolution(descriptor, input, &mut errors);
                check_batch(descriptor, input, &mut errors);
            }
            ModelCategory::VideoGeneration => {
                validate_video_inputs(descriptor, input, &mut errors);
            }
            ModelCategory::TextToSpeech => {
                if !has_text(input, &["text"]) {
                    errors.push("Text is required for speech synthesis".to_string());
                }
            }
            ModelCategory::SpeechToText => {
                if !has_text(input, &["audio_url", "audioUrl"]) {
                    errors.push("Audio URL is required for transcription".to_string());
                }
            }
            ModelCategory::AudioGeneration => {
                if !has_text(input, &["prompt"]) {
                    errors.push("Prompt is required for audio generation".to_string());
                }
            }
            ModelCategory::ImageEditing => {
                if !has_text(input, &["prompt"]) {
                    errors.push("Prompt is required for image editing".to_string());
                }
                if !has_image_reference(input) {
                    errors.push(
                        "At least one image reference is required for image editing".to_string(),
                    );
                }
            }
            ModelCategory::Training => {
                if !has_text(input, &["images_data_url", "imagesDataUrl"]) {
                    errors.push(
                        "Training images archive (images_data_url) is required".to_string(),
                    );
                }
            }
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of validating request input against category rules.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn invalid(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/* --------------------------------------------------------------------------
   Category validation helpers
   -------------------------------------------------------------------------- */

/// Video models require exactly the input kinds they declare: text-only
/// models need a prompt, image-only models need an image URL, and models
/// accepting both need any one of the two.
fn validate_video_inputs(
    descriptor: &ModelDescriptor,
    input: &serde_json::Map<String, Value>,
    errors: &mut Vec<String>,
) {
    let has_prompt = has_text(input, &["prompt"]);
    let has_image = has_text(input, &["image_url", "imageUrl"]);

    match (
        descriptor.capabilities.text_prompt,
        descriptor.capabilities.image_prompt,
    ) {
        (true, false) => {
            if !has_prompt {
                errors.push("Prompt is required for video generation".to_string());
            }
        }
        (false, true) => {
            if !has_image {
                errors.push("Image URL is required for image-to-video generation".to_string());
            }
        }
        // Models declaring both (or, defensively, neither) accept any one.
        _ => {
            if !has_prompt && !has_image {
                errors.push(
                    "Either a prompt or an image URL is required for video generation".to_string(),
                );
            }
        }
    }
}

/// Reject requested dimensions beyond the descriptor's maximum resolution.
fn check_resolution(
    descriptor: &ModelDescriptor,
    input: &serde_json::Map<String, Value>,
    errors: &mut Vec<String>,
) {
    let width = number_field(input, &["width"]);
    let height = number_field(input, &["height"]);
    if let (Some(w), Some(h)) = (width, height) {
        let max_w = descriptor.output.max_width as u64;
        let max_h = descriptor.output.max_height as u64;
        if w > max_w || h > max_h {
            errors.push(format!(
                "Requested resolution {w}x{h} exceeds maximum {max_w}x{max_h} for {}",
                descriptor.name
            ));
        }
    }
}

/// Reject batch sizes beyond the descriptor's limit.
fn check_batch(
    descriptor: &ModelDescriptor,
    input: &serde_json::Map<String, Value>,
    errors: &mut Vec<String>,
) {
    if let Some(n) = number_field(input, &["num_images", "numImages"]) {
        let max = descriptor.output.batch_size as u64;
        if n > max {
            errors.push(format!(
                "num_images {n} exceeds the batch limit of {max} for {}",
                descriptor.name
            ));
        }
    }
}

/// First non-empty string among the given spellings.
fn has_text(input: &serde_json::Map<String, Value>, names: &[&str]) -> bool {
    names.iter().any(|name| {
        matches!(input.get(*name), Some(Value::String(s)) if !s.trim().is_empty())
    })
}

/// Whether any image reference (single URL or non-empty array) is present.
fn has_image_reference(input: &serde_json::Map<String, Value>) -> bool {
    if has_text(input, &["image_url", "imageUrl"]) {
        return true;
    }
    ["image_urls", "imageUrls"].iter().any(|name| {
        matches!(input.get(*name), Some(Value::Array(items)) if !items.is_empty())
    })
}

/// First numeric value among the given spellings, truncated to u64.
fn number_field(input: &serde_json::Map<String, Value>, names: &[&str]) -> Option<u64> {
    names
        .iter()
        .find_map(|name| input.get(*name))
        .and_then(Value::as_u64)
}

/* --------------------------------------------------------------------------
   Category defaults
   -------------------------------------------------------------------------- */

/// Defaults for one descriptor: custom schema defaults when present,
/// otherwise the category table. Shared with the form schema builder.
pub(crate) fn defaults_for(descriptor: &ModelDescriptor) -> serde_json::Map<String, Value> {
    if let Some(schema) = &descriptor.custom_params {
        let mut map = serde_json::Map::new();
        for (name, param) in schema {
            if let Some(default) = &param.default {
                map.insert(name.to_string(), default.clone());
            }
        }
        return map;
    }
    category_defaults(descriptor.category)
}

/// Default parameters per category, in upstream naming.
fn category_defaults(category: ModelCategory) -> serde_json::Map<String, Value> {
    let pairs: &[(&str, Value)] = match category {
        ModelCategory::ImageGeneration => &[
            ("width", Value::from(DEFAULT_IMAGE_WIDTH)),
            ("height", Value::from(DEFAULT_IMAGE_HEIGHT)),
            ("num_images", Value::from(1)),
            ("num_inference_steps", Value::from(28)),
            ("guidance_scale", Value::from(3.5)),
        ],
        ModelCategory::VideoGeneration => &[
            ("fps", Value::from(25)),
            ("num_frames", Value::from(25)),
        ],
        ModelCategory::TextToSpeech => &[
            ("voice", Value::from("af_heart")),
            ("speed", Value::from(1.0)),
        ],
        ModelCategory::SpeechToText => &[
            ("task", Value::from("transcribe")),
            ("chunk_level", Value::from("segment")),
        ],
        ModelCategory::AudioGeneration => &[
            ("seconds_total", Value::from(30)),
            ("steps", Value::from(100)),
        ],
        ModelCategory::ImageEditing => &[
            ("num_images", Value::from(1)),
            ("output_format", Value::from("jpeg")),
        ],
        ModelCategory::Training => &[
            ("steps", Value::from(1000)),
            ("create_masks", Value::from(true)),
        ],
    };
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/* --------------------------------------------------------------------------
   Catalog
   -------------------------------------------------------------------------- */

/// Short aliases accepted in place of canonical ids.
fn alias_table() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("flux", "fal-ai/flux/dev"),
        ("flux-dev", "fal-ai/flux/dev"),
        ("flux-schnell", "fal-ai/flux/schnell"),
        ("flux-pro", "fal-ai/flux-pro/v1.1-ultra"),
        ("veo3", "fal-ai/veo3"),
        ("stable-video", "fal-ai/stable-video"),
        ("ltx-video", "fal-ai/ltx-video"),
        ("kokoro", "fal-ai/kokoro"),
        ("whisper", "fal-ai/whisper"),
        ("stable-audio", "fal-ai/stable-audio"),
        ("nano-banana", "fal-ai/nano-banana/edit"),
        ("seedream-edit", "fal-ai/bytedance/seedream/v4/edit"),
        ("flux-lora", "fal-ai/flux-lora-fast-training"),
    ])
}

/// The static model catalog.
///
/// Ids must be unique; [`ModelRegistry::new`] asserts this in debug
/// builds and the invariant is covered by a test.
fn catalog() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor {
            id: "fal-ai/flux/dev",
            name: "FLUX.1 [dev]",
            provider: "fal-ai",
            category: ModelCategory::ImageGeneration,
            capabilities: Capabilities {
                text_prompt: true,
                dimensions: true,
                ..Capabilities::default()
            },
            output: OutputSpec {
                formats: &["jpeg", "png"],
                max_width: 2048,
                max_height: 2048,
                batch_size: 4,
                sizing: SizingMode::Numeric,
            },
            custom_params: None,
        },
        ModelDescriptor {
            id: "fal-ai/flux/schnell",
            name: "FLUX.1 [schnell]",
            provider: "fal-ai",
            category: ModelCategory::ImageGeneration,
            capabilities: Capabilities {
                text_prompt: true,
                dimensions: true,
                ..Capabilities::default()
            },
            output: OutputSpec {
                formats: &["jpeg", "png"],
                max_width: 2048,
                max_height: 2048,
                batch_size: 4,
                sizing: SizingMode::Numeric,
            },
            custom_params: None,
        },
        ModelDescriptor {
            id: "fal-ai/flux-pro/v1.1-ultra",
            name: "FLUX 1.1 [pro] ultra",
            provider: "fal-ai",
            category: ModelCategory::ImageGeneration,
            capabilities: Capabilities {
                text_prompt: true,
                aspect_ratios: &["21:9", "16:9", "4:3", "1:1", "3:4", "9:16", "9:21"],
                ..Capabilities::default()
            },
            output: OutputSpec {
                formats: &["jpeg", "png"],
                max_width: 4096,
                max_height: 4096,
                batch_size: 1,
                sizing: SizingMode::Enum,
            },
            custom_params: None,
        },
        ModelDescriptor {
            id: "fal-ai/stable-diffusion-v35-large",
            name: "Stable Diffusion 3.5 Large",
            provider: "fal-ai",
            category: ModelCategory::ImageGeneration,
            capabilities: Capabilities {
                text_prompt: true,
                negative_prompt: true,
                dimensions: true,
                ..Capabilities::default()
            },
            output: OutputSpec {
                formats: &["jpeg", "png"],
                max_width: 1536,
                max_height: 1536,
                batch_size: 4,
                sizing: SizingMode::Numeric,
            },
            custom_params: None,
        },
        ModelDescriptor {
            id: "fal-ai/veo3",
            name: "Veo 3",
            provider: "fal-ai",
            category: ModelCategory::VideoGeneration,
            capabilities: Capabilities {
                text_prompt: true,
                image_prompt: true,
                negative_prompt: true,
                aspect_ratios: &["16:9", "9:16", "1:1"],
                durations: &["4s", "6s", "8s"],
                ..Capabilities::default()
            },
            output: OutputSpec {
                formats: &["mp4"],
                max_width: 1920,
                max_height: 1080,
                batch_size: 1,
                sizing: SizingMode::Fixed,
            },
            custom_params: Some(veo3_params()),
        },
        ModelDescriptor {
            id: "fal-ai/stable-video",
            name: "Stable Video Diffusion",
            provider: "fal-ai",
            category: ModelCategory::VideoGeneration,
            capabilities: Capabilities {
                image_prompt: true,
                fps_options: &[6, 12, 25],
                ..Capabilities::default()
            },
            output: OutputSpec {
                formats: &["mp4"],
                max_width: 1024,
                max_height: 576,
                batch_size: 1,
                sizing: SizingMode::Fixed,
            },
            custom_params: None,
        },
        ModelDescriptor {
            id: "fal-ai/ltx-video",
            name: "LTX Video",
            provider: "fal-ai",
            category: ModelCategory::VideoGeneration,
            capabilities: Capabilities {
                text_prompt: true,
                negative_prompt: true,
                ..Capabilities::default()
            },
            output: OutputSpec {
                formats: &["mp4"],
                max_width: 1216,
                max_height: 704,
                batch_size: 1,
                sizing: SizingMode::Fixed,
            },
            custom_params: None,
        },
        ModelDescriptor {
            id: "fal-ai/kokoro",
            name: "Kokoro TTS",
            provider: "fal-ai",
            category: ModelCategory::TextToSpeech,
            capabilities: Capabilities {
                text_prompt: true,
                ..Capabilities::default()
            },
            output: OutputSpec {
                formats: &["wav", "mp3"],
                max_width: 0,
                max_height: 0,
                batch_size: 1,
                sizing: SizingMode::Fixed,
            },
            custom_params: None,
        },
        ModelDescriptor {
            id: "fal-ai/whisper",
            name: "Whisper",
            provider: "fal-ai",
            category: ModelCategory::SpeechToText,
            capabilities: Capabilities::default(),
            output: OutputSpec {
                formats: &["json"],
                max_width: 0,
                max_height: 0,
                batch_size: 1,
                sizing: SizingMode::Fixed,
            },
            custom_params: None,
        },
        ModelDescriptor {
            id: "fal-ai/stable-audio",
            name: "Stable Audio",
            provider: "fal-ai",
            category: ModelCategory::AudioGeneration,
            capabilities: Capabilities {
                text_prompt: true,
                ..Capabilities::default()
            },
            output: OutputSpec {
                formats: &["wav"],
                max_width: 0,
                max_height: 0,
                batch_size: 1,
                sizing: SizingMode::Fixed,
            },
            custom_params: None,
        },
        ModelDescriptor {
            id: "fal-ai/nano-banana/edit",
            name: "Nano Banana Edit",
            provider: "fal-ai",
            category: ModelCategory::ImageEditing,
            capabilities: Capabilities {
                text_prompt: true,
                image_prompt: true,
                ..Capabilities::default()
            },
            output: OutputSpec {
                formats: &["jpeg", "png"],
                max_width: 2048,
                max_height: 2048,
                batch_size: 4,
                sizing: SizingMode::Fixed,
            },
            custom_params: None,
        },
        ModelDescriptor {
            id: "fal-ai/bytedance/seedream/v4/edit",
            name: "Seedream 4.0 Edit",
            provider: "fal-ai",
            category: ModelCategory::ImageEditing,
            capabilities: Capabilities {
                text_prompt: true,
                image_prompt: true,
                dimensions: true,
                ..Capabilities::default()
            },
            output: OutputSpec {
                formats: &["jpeg", "png"],
                max_width: 4096,
                max_height: 4096,
                batch_size: 6,
                sizing: SizingMode::Enum,
            },
            custom_params: None,
        },
        ModelDescriptor {
            id: "fal-ai/flux-lora-fast-training",
            name: "FLUX LoRA Fast Training",
            provider: "fal-ai",
            category: ModelCategory::Training,
            capabilities: Capabilities::default(),
            output: OutputSpec {
                formats: &["safetensors"],
                max_width: 0,
                max_height: 0,
                batch_size: 1,
                sizing: SizingMode::Fixed,
            },
            custom_params: None,
        },
    ]
}

/// Veo 3's model-specific parameter schema.
///
/// Field names are already in the upstream convention; the shaper's
/// pass-through naming rule for this family depends on that.
fn veo3_params() -> IndexMap<&'static str, CustomParam> {
    IndexMap::from([
        ("prompt", CustomParam::required(ParamKind::String)),
        ("image_url", CustomParam::optional(ParamKind::String)),
        (
            "aspect_ratio",
            CustomParam::options(&["16:9", "9:16", "1:1"], "16:9"),
        ),
        (
            "duration",
            CustomParam::options(&["4s", "6s", "8s"], "8s"),
        ),
        (
            "generate_audio",
            CustomParam::optional(ParamKind::Boolean).with_default(Value::Bool(true)),
        ),
        ("negative_prompt", CustomParam::optional(ParamKind::String)),
        ("seed", CustomParam::optional(ParamKind::Integer)),
    ])
}

/* --------------------------------------------------------------------------
   Tests
   -------------------------------------------------------------------------- */
