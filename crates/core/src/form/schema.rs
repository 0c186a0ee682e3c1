//! Deriving a form schema from a model descriptor.
//!
//! Schemas are ephemeral: recomputed whenever the selected model
//! changes, never stored. The layout is decided per category, except
//! for models carrying their own parameter schema, which is rendered
//! field-for-field in declaration order.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

use crate::category::ModelCategory;
use crate::descriptor::{CustomParam, ModelDescriptor, ParamKind, SizingMode};
use crate::registry::{defaults_for, DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH};
use crate::shaping::casing::camel_to_snake;
use crate::shaping::family::{ModelFamily, NamingConvention};

/// Current values of a form session, field id to value.
pub type FormState = IndexMap<String, Value>;

/// Validation hook type for rules a declarative bound cannot express.
pub type CustomFieldRule = fn(&Value) -> Result<(), String>;

/* --------------------------------------------------------------------------
   Schema types
   -------------------------------------------------------------------------- */

/// Ordered sections of fields for one model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub model_id: String,
    pub sections: Vec<FormSection>,
}

impl FormSchema {
    /// All fields across sections, in render order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldConfig> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// Look up a field by id.
    pub fn field(&self, id: &str) -> Option<&FieldConfig> {
        self.fields().find(|f| f.id == id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSection {
    pub title: String,
    pub fields: Vec<FieldConfig>,
}

/// One form field: widget type, requiredness, bounds, default.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub id: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub validation: FieldValidation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldConfig {
    pub fn new(id: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            field_type,
            required: false,
            validation: FieldValidation::default(),
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_validation(mut self, validation: FieldValidation) -> Self {
        self.validation = validation;
        self
    }
}

/// Widget type of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Slider,
    Select { options: Vec<String> },
    MultiSelect { options: Vec<String> },
    ImageFile,
    AudioFile,
    VideoFile,
    Boolean,
}

/// Declarative bounds plus an optional custom rule.
///
/// The custom hook is a plain function pointer so the struct stays
/// cheap to clone; it is never serialized.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<&'static str>,
    #[serde(skip)]
    pub custom: Option<CustomFieldRule>,
}

impl FieldValidation {
    fn length(max_len: usize) -> Self {
        Self {
            max_len: Some(max_len),
            ..Self::default()
        }
    }

    fn range(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..Self::default()
        }
    }
}

/* --------------------------------------------------------------------------
   Schema building
   -------------------------------------------------------------------------- */

/// Derive the form schema for a model. Pure and deterministic.
pub fn build_form_schema(descriptor: &ModelDescriptor) -> FormSchema {
    let sections = match &descriptor.custom_params {
        Some(params) => custom_sections(params),
        None => match descriptor.category {
            ModelCategory::ImageGeneration => image_generation_sections(descriptor),
            ModelCategory::VideoGeneration => video_generation_sections(descriptor),
            ModelCategory::TextToSpeech => text_to_speech_sections(),
            ModelCategory::SpeechToText => speech_to_text_sections(),
            ModelCategory::AudioGeneration => audio_generation_sections(),
            ModelCategory::ImageEditing => image_editing_sections(descriptor),
            ModelCategory::Training => training_sections(),
        },
    };
    FormSchema {
        model_id: descriptor.id.to_string(),
        sections,
    }
}

/// Initial form state for a model: registry defaults translated to the
/// form's field-id naming, falling back to per-field defaults.
pub fn default_form_state(descriptor: &ModelDescriptor) -> FormState {
    let defaults = defaults_for(descriptor);
    let pass_through = matches!(
        ModelFamily::of(descriptor.id).naming(),
        NamingConvention::PassThrough
    );
    let schema = build_form_schema(descriptor);

    let mut state = FormState::new();
    for field in schema.fields() {
        let upstream_name = if pass_through {
            field.id.clone()
        } else {
            camel_to_snake(&field.id)
        };
        let value = defaults
            .get(&upstream_name)
            .cloned()
            .or_else(|| field.default.clone());
        if let Some(value) = value {
            state.insert(field.id.clone(), value);
        }
    }
    state
}

/// Fields built straight from a model-specific parameter schema, one
/// section, declaration order preserved. Well-known names get richer
/// widgets than their primitive kind implies.
fn custom_sections(params: &IndexMap<&'static str, CustomParam>) -> Vec<FormSection> {
    let fields = params
        .iter()
        .map(|(name, param)| {
            let field_type = match param.kind {
                ParamKind::String if matches!(*name, "prompt" | "negative_prompt") => {
                    FieldType::Textarea
                }
                ParamKind::String if name.ends_with("image_url") => FieldType::ImageFile,
                ParamKind::String => FieldType::Text,
                ParamKind::Integer | ParamKind::Number => FieldType::Number,
                ParamKind::Boolean => FieldType::Boolean,
                ParamKind::Enum => FieldType::Select {
                    options: param.values.iter().map(|v| v.to_string()).collect(),
                },
            };
            let mut field = FieldConfig::new(name, &label_for(name), field_type);
            if param.required {
                field = field.required();
            }
            if let Some(default) = &param.default {
                field = field.with_default(default.clone());
            }
            field
        })
        .collect();
    vec![FormSection {
        title: "Parameters".to_string(),
        fields,
    }]
}

fn image_generation_sections(descriptor: &ModelDescriptor) -> Vec<FormSection> {
    let mut prompt_fields = vec![FieldConfig::new("prompt", "Prompt", FieldType::Textarea)
        .required()
        .with_validation(FieldValidation::length(2000))];
    if descriptor.capabilities.negative_prompt {
        prompt_fields.push(
            FieldConfig::new("negativePrompt", "Negative prompt", FieldType::Textarea)
                .with_validation(FieldValidation::length(2000)),
        );
    }

    let mut size_fields = Vec::new();
    if descriptor.capabilities.dimensions && descriptor.output.sizing == SizingMode::Numeric {
        size_fields.push(
            FieldConfig::new("width", "Width", FieldType::Slider)
                .with_default(json!(DEFAULT_IMAGE_WIDTH))
                .with_validation(FieldValidation::range(
                    256.0,
                    descriptor.output.max_width as f64,
                )),
        );
        size_fields.push(
            FieldConfig::new("height", "Height", FieldType::Slider)
                .with_default(json!(DEFAULT_IMAGE_HEIGHT))
                .with_validation(FieldValidation::range(
                    256.0,
                    descriptor.output.max_height as f64,
                )),
        );
    }
    if !descriptor.capabilities.aspect_ratios.is_empty() {
        size_fields.push(FieldConfig::new(
            "aspectRatio",
            "Aspect ratio",
            select_of(descriptor.capabilities.aspect_ratios),
        ));
    }

    let mut advanced = Vec::new();
    if descriptor.output.batch_size > 1 {
        advanced.push(
            FieldConfig::new("numImages", "Number of images", FieldType::Slider)
                .with_default(json!(1))
                .with_validation(FieldValidation::range(
                    1.0,
                    descriptor.output.batch_size as f64,
                )),
        );
    }
    advanced.push(
        FieldConfig::new("numInferenceSteps", "Inference steps", FieldType::Slider)
            .with_default(json!(28))
            .with_validation(FieldValidation::range(1.0, 50.0)),
    );
    advanced.push(
        FieldConfig::new("guidanceScale", "Guidance scale", FieldType::Slider)
            .with_default(json!(3.5))
            .with_validation(FieldValidation::range(0.0, 20.0)),
    );
    advanced.push(
        FieldConfig::new("seed", "Seed", FieldType::Number)
            .with_validation(FieldValidation { min: Some(0.0), ..FieldValidation::default() }),
    );

    let mut sections = vec![section("Prompt", prompt_fields)];
    if !size_fields.is_empty() {
        sections.push(section("Size", size_fields));
    }
    sections.push(section("Advanced", advanced));
    sections
}

fn video_generation_sections(descriptor: &ModelDescriptor) -> Vec<FormSection> {
    let mut input_fields = Vec::new();
    if descriptor.capabilities.text_prompt {
        let mut prompt = FieldConfig::new("prompt", "Prompt", FieldType::Textarea)
            .with_validation(FieldValidation::length(2000));
        if !descriptor.capabilities.image_prompt {
            prompt = prompt.required();
        }
        input_fields.push(prompt);
    }
    if descriptor.capabilities.image_prompt {
        let mut image = FieldConfig::new("imageUrl", "Source image", FieldType::ImageFile);
        if !descriptor.capabilities.text_prompt {
            image = image.required();
        }
        input_fields.push(image);
    }
    if descriptor.capabilities.negative_prompt {
        input_fields.push(
            FieldConfig::new("negativePrompt", "Negative prompt", FieldType::Textarea)
                .with_validation(FieldValidation::length(2000)),
        );
    }

    let mut playback = Vec::new();
    if !descriptor.capabilities.durations.is_empty() {
        playback.push(FieldConfig::new(
            "duration",
            "Duration",
            select_of(descriptor.capabilities.durations),
        ));
    }
    if let (Some(min), Some(max)) = (
        descriptor.capabilities.fps_options.iter().min(),
        descriptor.capabilities.fps_options.iter().max(),
    ) {
        playback.push(
            FieldConfig::new("fps", "Frames per second", FieldType::Number)
                .with_default(json!(max))
                .with_validation(FieldValidation::range(*min as f64, *max as f64)),
        );
    }
    if !descriptor.capabilities.aspect_ratios.is_empty() {
        playback.push(FieldConfig::new(
            "aspectRatio",
            "Aspect ratio",
            select_of(descriptor.capabilities.aspect_ratios),
        ));
    }

    let advanced = vec![FieldConfig::new("seed", "Seed", FieldType::Number)
        .with_validation(FieldValidation { min: Some(0.0), ..FieldValidation::default() })];

    let mut sections = vec![section("Input", input_fields)];
    if !playback.is_empty() {
        sections.push(section("Playback", playback));
    }
    sections.push(section("Advanced", advanced));
    sections
}

fn text_to_speech_sections() -> Vec<FormSection> {
    vec![
        section(
            "Text",
            vec![FieldConfig::new("text", "Text", FieldType::Textarea)
                .required()
                .with_validation(FieldValidation::length(5000))],
        ),
        section(
            "Voice",
            vec![
                FieldConfig::new(
                    "voice",
                    "Voice",
                    FieldType::Select {
                        options: ["af_heart", "af_bella", "af_nicole", "am_adam", "am_michael"]
                            .iter()
                            .map(|v| v.to_string())
                            .collect(),
                    },
                )
                .with_default(json!("af_heart")),
                FieldConfig::new("speed", "Speed", FieldType::Slider)
                    .with_default(json!(1.0))
                    .with_validation(FieldValidation::range(0.5, 2.0)),
            ],
        ),
    ]
}

fn speech_to_text_sections() -> Vec<FormSection> {
    vec![
        section(
            "Audio",
            vec![FieldConfig::new("audioUrl", "Audio file", FieldType::AudioFile).required()],
        ),
        section(
            "Options",
            vec![
                FieldConfig::new(
                    "task",
                    "Task",
                    FieldType::Select {
                        options: vec!["transcribe".to_string(), "translate".to_string()],
                    },
                )
                .with_default(json!("transcribe")),
                FieldConfig::new("language", "Language code", FieldType::Text).with_validation(
                    FieldValidation {
                        pattern: Some("^[a-z]{2,3}$"),
                        ..FieldValidation::default()
                    },
                ),
            ],
        ),
    ]
}

fn audio_generation_sections() -> Vec<FormSection> {
    vec![
        section(
            "Prompt",
            vec![FieldConfig::new("prompt", "Prompt", FieldType::Textarea)
                .required()
                .with_validation(FieldValidation::length(2000))],
        ),
        section(
            "Settings",
            vec![
                FieldConfig::new("secondsTotal", "Length (seconds)", FieldType::Slider)
                    .with_default(json!(30))
                    .with_validation(FieldValidation::range(1.0, 47.0)),
                FieldConfig::new("steps", "Steps", FieldType::Slider)
                    .with_default(json!(100))
                    .with_validation(FieldValidation::range(10.0, 200.0)),
            ],
        ),
    ]
}

fn image_editing_sections(descriptor: &ModelDescriptor) -> Vec<FormSection> {
    let edit_fields = vec![
        FieldConfig::new("prompt", "Edit instruction", FieldType::Textarea)
            .required()
            .with_validation(FieldValidation::length(2000)),
        FieldConfig::new("imageUrls", "Images", FieldType::ImageFile)
            .required()
            .with_validation(FieldValidation {
                custom: Some(non_empty_image_refs),
                ..FieldValidation::default()
            }),
    ];

    let mut output_fields = Vec::new();
    if descriptor.output.batch_size > 1 {
        output_fields.push(
            FieldConfig::new("numImages", "Number of images", FieldType::Slider)
                .with_default(json!(1))
                .with_validation(FieldValidation::range(
                    1.0,
                    descriptor.output.batch_size as f64,
                )),
        );
    }
    output_fields.push(
        FieldConfig::new(
            "outputFormat",
            "Output format",
            select_of(descriptor.output.formats),
        )
        .with_default(json!(descriptor.output.formats.first().copied().unwrap_or("jpeg"))),
    );

    vec![section("Edit", edit_fields), section("Output", output_fields)]
}

fn training_sections() -> Vec<FormSection> {
    vec![
        section(
            "Dataset",
            vec![
                FieldConfig::new("imagesDataUrl", "Training images URL", FieldType::Text)
                    .required()
                    .with_validation(FieldValidation {
                        pattern: Some("^(https?|data):"),
                        ..FieldValidation::default()
                    }),
                FieldConfig::new("triggerWord", "Trigger word", FieldType::Text)
                    .with_validation(FieldValidation::length(50)),
            ],
        ),
        section(
            "Parameters",
            vec![
                FieldConfig::new("steps", "Training steps", FieldType::Slider)
                    .with_default(json!(1000))
                    .with_validation(FieldValidation::range(100.0, 4000.0)),
                FieldConfig::new("createMasks", "Create masks", FieldType::Boolean)
                    .with_default(json!(true)),
            ],
        ),
    ]
}

fn section(title: &str, fields: Vec<FieldConfig>) -> FormSection {
    FormSection {
        title: title.to_string(),
        fields,
    }
}

fn select_of(options: &[&str]) -> FieldType {
    FieldType::Select {
        options: options.iter().map(|v| v.to_string()).collect(),
    }
}

/// `"negative_prompt"` reads as `"Negative prompt"`.
fn label_for(id: &str) -> String {
    let spaced = id.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}

fn non_empty_image_refs(value: &Value) -> Result<(), String> {
    let ok = match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => items
            .iter()
            .any(|v| matches!(v, Value::String(s) if !s.trim().is_empty())),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err("At least one image is required".to_string())
    }
}

/* --------------------------------------------------------------------------
   Tests
   -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelRegistry;

    // -- structural invariants --

    #[test]
    fn field_ids_are_unique_for_every_model() {
        let registry = ModelRegistry::new();
        for descriptor in registry.list() {
            let schema = build_form_schema(descriptor);
            let ids: Vec<_> = schema.fields().map(|f| f.id.clone()).collect();
            let mut deduped = ids.clone();
            deduped.sort();
            deduped.dedup();
            assert_eq!(ids.len(), deduped.len(), "duplicate field in {}", descriptor.id);
        }
    }

    #[test]
    fn schema_building_is_deterministic() {
        let registry = ModelRegistry::new();
        for descriptor in registry.list() {
            let a = serde_json::to_string(&build_form_schema(descriptor)).unwrap();
            let b = serde_json::to_string(&build_form_schema(descriptor)).unwrap();
            assert_eq!(a, b);
        }
    }

    // -- category layouts --

    #[test]
    fn flux_dev_has_bounded_dimension_sliders() {
        let registry = ModelRegistry::new();
        let schema = build_form_schema(registry.get("fal-ai/flux/dev").unwrap());
        let width = schema.field("width").unwrap();
        assert_eq!(width.field_type, FieldType::Slider);
        assert_eq!(width.validation.max, Some(2048.0));
        assert!(schema.field("aspectRatio").is_none());
    }

    #[test]
    fn flux_pro_uses_aspect_ratio_instead_of_dimensions() {
        let registry = ModelRegistry::new();
        let schema = build_form_schema(registry.get("fal-ai/flux-pro/v1.1-ultra").unwrap());
        assert!(schema.field("width").is_none());
        let ratio = schema.field("aspectRatio").unwrap();
        assert_matches::assert_matches!(
            &ratio.field_type,
            FieldType::Select { options } => assert!(options.contains(&"16:9".to_string()))
        );
    }

    #[test]
    fn stable_video_requires_image_not_prompt() {
        let registry = ModelRegistry::new();
        let schema = build_form_schema(registry.get("fal-ai/stable-video").unwrap());
        assert!(schema.field("prompt").is_none());
        let image = schema.field("imageUrl").unwrap();
        assert!(image.required);
        assert_eq!(image.field_type, FieldType::ImageFile);
    }

    #[test]
    fn editing_schema_demands_image_references() {
        let registry = ModelRegistry::new();
        let schema = build_form_schema(registry.get("fal-ai/nano-banana/edit").unwrap());
        let images = schema.field("imageUrls").unwrap();
        assert!(images.required);
        let rule = images.validation.custom.unwrap();
        assert!(rule(&serde_json::json!([])).is_err());
        assert!(rule(&serde_json::json!(["https://e/a.png"])).is_ok());
    }

    // -- custom parameter schemas --

    #[test]
    fn veo3_schema_follows_declaration_order() {
        let registry = ModelRegistry::new();
        let schema = build_form_schema(registry.get("fal-ai/veo3").unwrap());
        let ids: Vec<_> = schema.fields().map(|f| f.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "prompt",
                "image_url",
                "aspect_ratio",
                "duration",
                "generate_audio",
                "negative_prompt",
                "seed"
            ]
        );
        assert_eq!(
            schema.field("prompt").unwrap().field_type,
            FieldType::Textarea
        );
        assert_eq!(
            schema.field("image_url").unwrap().field_type,
            FieldType::ImageFile
        );
        assert_eq!(
            schema.field("generate_audio").unwrap().field_type,
            FieldType::Boolean
        );
    }

    // -- default state --

    #[test]
    fn default_state_uses_form_field_naming() {
        let registry = ModelRegistry::new();
        let state = default_form_state(registry.get("fal-ai/flux/dev").unwrap());
        assert_eq!(state.get("width"), Some(&json!(1024)));
        assert_eq!(state.get("numInferenceSteps"), Some(&json!(28)));
        assert!(!state.contains_key("num_inference_steps"));
    }

    #[test]
    fn pass_through_default_state_keeps_upstream_names() {
        let registry = ModelRegistry::new();
        let state = default_form_state(registry.get("fal-ai/veo3").unwrap());
        assert_eq!(state.get("aspect_ratio"), Some(&json!("16:9")));
        assert_eq!(state.get("generate_audio"), Some(&json!(true)));
    }
}
