//! Static model metadata.
//!
//! A [`ModelDescriptor`] is immutable once the registry is built. The
//! category decides which capability and output fields are meaningful;
//! models carrying a [`custom_params`](ModelDescriptor::custom_params)
//! schema get their form built from that schema instead of the category
//! default layout.

use indexmap::IndexMap;
use serde::Serialize;

use crate::category::ModelCategory;

/// Static descriptor for one hosted model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// Canonical id, unique across the registry (e.g. `fal-ai/flux/dev`).
    pub id: &'static str,
    /// Human-readable display name.
    pub name: &'static str,
    /// Hosting provider identifier.
    pub provider: &'static str,
    pub category: ModelCategory,
    pub capabilities: Capabilities,
    pub output: OutputSpec,
    /// Model-specific parameter schema. When present, form generation
    /// uses this ordered map instead of the category default layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_params: Option<IndexMap<&'static str, CustomParam>>,
}

/// Input capability flags and option lists.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Accepts a text prompt.
    pub text_prompt: bool,
    /// Accepts an image reference as the primary input.
    pub image_prompt: bool,
    /// Accepts a negative prompt.
    pub negative_prompt: bool,
    /// Accepts explicit numeric width/height.
    pub dimensions: bool,
    /// Selectable aspect ratios (empty when not applicable).
    pub aspect_ratios: &'static [&'static str],
    /// Selectable frame rates (video models).
    pub fps_options: &'static [u32],
    /// Selectable clip durations (video models), upstream tokens.
    pub durations: &'static [&'static str],
}

/// Output constraints and sizing convention.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    /// Output file formats the model can produce.
    pub formats: &'static [&'static str],
    /// Maximum output width in pixels.
    pub max_width: u32,
    /// Maximum output height in pixels.
    pub max_height: u32,
    /// Maximum number of outputs per request.
    pub batch_size: u32,
    /// How the model expects output size to be specified.
    pub sizing: SizingMode,
}

/// Whether a model takes numeric `width`/`height` or an enumerated
/// `image_size` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizingMode {
    /// Numeric `width` and `height` fields.
    Numeric,
    /// Enumerated size token (`square`, `landscape_16_9`, ...).
    Enum,
    /// Size is not a request parameter (audio, speech, training).
    Fixed,
}

/// One entry of a model-specific parameter schema.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomParam {
    pub kind: ParamKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Allowed values for [`ParamKind::Enum`] parameters.
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub values: &'static [&'static str],
}

/// Primitive type of a custom parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Enum,
}

impl CustomParam {
    /// A required parameter of the given kind with no default.
    pub fn required(kind: ParamKind) -> Self {
        Self {
            kind,
            required: true,
            default: None,
            values: &[],
        }
    }

    /// An optional parameter of the given kind with no default.
    pub fn optional(kind: ParamKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            values: &[],
        }
    }

    /// An optional enum parameter with the given options and default.
    pub fn options(values: &'static [&'static str], default: &str) -> Self {
        Self {
            kind: ParamKind::Enum,
            required: false,
            default: Some(serde_json::Value::String(default.to_string())),
            values,
        }
    }

    /// Attach a default value.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}
