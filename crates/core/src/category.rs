//! The closed set of model categories.
//!
//! Category determines which capability fields of a descriptor are
//! meaningful, which form layout is generated, which required-input
//! checks run, and which response field is expected back from the
//! upstream service. Every match over [`ModelCategory`] in this
//! workspace is exhaustive so that adding a category is a compile
//! error until each switch site handles it.

use serde::{Deserialize, Serialize};

/// Kind of generative model, mirroring the upstream catalog taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelCategory {
    ImageGeneration,
    VideoGeneration,
    TextToSpeech,
    SpeechToText,
    AudioGeneration,
    ImageEditing,
    Training,
}

/// All categories, in display order.
pub const ALL_CATEGORIES: &[ModelCategory] = &[
    ModelCategory::ImageGeneration,
    ModelCategory::VideoGeneration,
    ModelCategory::TextToSpeech,
    ModelCategory::SpeechToText,
    ModelCategory::AudioGeneration,
    ModelCategory::ImageEditing,
    ModelCategory::Training,
];

impl ModelCategory {
    /// Kebab-case identifier used on the wire and in persisted history.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelCategory::ImageGeneration => "image-generation",
            ModelCategory::VideoGeneration => "video-generation",
            ModelCategory::TextToSpeech => "text-to-speech",
            ModelCategory::SpeechToText => "speech-to-text",
            ModelCategory::AudioGeneration => "audio-generation",
            ModelCategory::ImageEditing => "image-editing",
            ModelCategory::Training => "training",
        }
    }

    /// Parse a kebab-case category identifier.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "image-generation" => Ok(ModelCategory::ImageGeneration),
            "video-generation" => Ok(ModelCategory::VideoGeneration),
            "text-to-speech" => Ok(ModelCategory::TextToSpeech),
            "speech-to-text" => Ok(ModelCategory::SpeechToText),
            "audio-generation" => Ok(ModelCategory::AudioGeneration),
            "image-editing" => Ok(ModelCategory::ImageEditing),
            "training" => Ok(ModelCategory::Training),
            _ => Err(format!(
                "Unknown category '{s}'. Must be one of: {}",
                ALL_CATEGORIES
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }

    /// Whether the expected upstream result field is an images array.
    pub fn produces_images(&self) -> bool {
        matches!(
            self,
            ModelCategory::ImageGeneration | ModelCategory::ImageEditing
        )
    }
}

impl std::fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
