//! The persisted record of one past generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use easel_core::category::ModelCategory;
use easel_core::types::Timestamp;

/// One history entry. Field names are camelCase on disk (`modelId`,
/// `modelName`, ...), matching the export/import interchange format.
///
/// Deserialization is strict about the identity fields (`id`,
/// `timestamp`, `modelId`, `modelName`, `category`, `prompt`); import
/// uses that strictness to filter out broken entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub timestamp: Timestamp,
    pub model_id: String,
    pub model_name: String,
    pub category: ModelCategory,
    #[serde(default = "default_provider")]
    pub provider: String,
    pub prompt: String,
    /// The shaped request parameters, kept so a generation can be
    /// repeated. Stripped first under byte pressure.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub input_params: serde_json::Map<String, Value>,
    #[serde(default)]
    pub result: NormalizedResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ItemMetadata>,
}

fn default_provider() -> String {
    "fal-ai".to_string()
}

/// Media produced by a generation, in the normalized plural shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<MediaRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<MediaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<MediaRef>,
    /// Transcription output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Training artifacts (LoRA weight files).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<MediaRef>,
}

/// A reference to one produced media object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Inline preview (data URL). The heaviest field an item carries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    pub processing_time_ms: u64,
    pub version: u32,
}

impl HistoryItem {
    /// Drop the heavy, reconstructible parts of an item: thumbnails and
    /// the stored request parameters. Returns whether anything changed.
    pub fn strip_heavy(&mut self) -> bool {
        let mut changed = false;
        for media in self
            .result
            .images
            .iter_mut()
            .chain(self.result.videos.iter_mut())
            .chain(self.result.files.iter_mut())
            .chain(self.result.audio.iter_mut())
        {
            if media.thumbnail.take().is_some() {
                changed = true;
            }
        }
        if !self.input_params.is_empty() {
            self.input_params.clear();
            changed = true;
        }
        changed
    }
}

impl NormalizedResult {
    /// Extract media references from a normalized upstream body,
    /// per category.
    pub fn from_upstream(category: ModelCategory, body: &Value) -> Self {
        let mut result = Self::default();
        match category {
            ModelCategory::ImageGeneration | ModelCategory::ImageEditing => {
                result.images = media_list(body.get("images"));
            }
            ModelCategory::VideoGeneration => {
                result.videos = media_list(body.get("videos"));
            }
            ModelCategory::TextToSpeech | ModelCategory::AudioGeneration => {
                result.audio = ["audio", "audio_file", "audio_url"]
                    .iter()
                    .find_map(|field| body.get(*field))
                    .and_then(media_ref_of);
            }
            ModelCategory::SpeechToText => {
                result.text = body
                    .get("text")
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            ModelCategory::Training => {
                result.files = body
                    .get("diffusers_lora_file")
                    .and_then(media_ref_of)
                    .into_iter()
                    .collect();
            }
        }
        result
    }
}

fn media_list(value: Option<&Value>) -> Vec<MediaRef> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(media_ref_of).collect(),
        Some(_) | None => Vec::new(),
    }
}

fn media_ref_of(value: &Value) -> Option<MediaRef> {
    match value {
        Value::String(url) => Some(MediaRef {
            url: url.clone(),
            ..MediaRef::default()
        }),
        Value::Object(map) => {
            let url = map.get("url").and_then(Value::as_str)?;
            Some(MediaRef {
                url: url.to_string(),
                content_type: map
                    .get("content_type")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                width: map.get("width").and_then(Value::as_u64).map(|w| w as u32),
                height: map.get("height").and_then(Value::as_u64).map(|h| h as u32),
                thumbnail: None,
            })
        }
        _ => None,
    }
}
