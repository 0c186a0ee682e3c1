//! Model families and their upstream naming conventions.
//!
//! A family groups model ids that share one upstream parameter
//! convention and therefore one shaping branch. Id prefixes are
//! consulted here and nowhere else.

use serde::Serialize;

/// Shaping branch a model id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFamily {
    /// Veo 3: fields arrive in final upstream form.
    Veo3,
    /// Nano Banana editing: image_urls array plus a small passthrough set.
    NanoBananaEdit,
    /// Seedream editing: image_urls array plus enum-or-derived image_size.
    SeedreamEdit,
    /// FLUX image generation: whitelist plus sizing-mode handling.
    Flux,
    /// Stable Video Diffusion: subject to the dispatch fallback ladder.
    StableVideo,
    /// Everything else: per-category field whitelist.
    Generic,
}

/// How field names are cased for the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingConvention {
    /// Field names are forwarded verbatim, no case conversion.
    PassThrough,
    /// Multi-word field names are rewritten to snake_case.
    Convert,
}

impl ModelFamily {
    /// Classify a canonical model id.
    pub fn of(model_id: &str) -> Self {
        if model_id.starts_with("fal-ai/veo3") {
            Self::Veo3
        } else if model_id.starts_with("fal-ai/nano-banana") {
            Self::NanoBananaEdit
        } else if model_id.contains("/seedream/") {
            Self::SeedreamEdit
        } else if model_id.starts_with("fal-ai/stable-video") {
            Self::StableVideo
        } else if model_id.starts_with("fal-ai/flux") && !model_id.ends_with("training") {
            Self::Flux
        } else {
            Self::Generic
        }
    }

    /// The naming convention this family's upstream expects.
    ///
    /// Veo 3 already takes snake_case field names from the form layer,
    /// so its values must not be case-converted a second time.
    pub fn naming(&self) -> NamingConvention {
        match self {
            Self::Veo3 => NamingConvention::PassThrough,
            Self::NanoBananaEdit
            | Self::SeedreamEdit
            | Self::Flux
            | Self::StableVideo
            | Self::Generic => NamingConvention::Convert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_catalog_ids() {
        assert_eq!(ModelFamily::of("fal-ai/veo3"), ModelFamily::Veo3);
        assert_eq!(
            ModelFamily::of("fal-ai/nano-banana/edit"),
            ModelFamily::NanoBananaEdit
        );
        assert_eq!(
            ModelFamily::of("fal-ai/bytedance/seedream/v4/edit"),
            ModelFamily::SeedreamEdit
        );
        assert_eq!(ModelFamily::of("fal-ai/flux/dev"), ModelFamily::Flux);
        assert_eq!(
            ModelFamily::of("fal-ai/flux-pro/v1.1-ultra"),
            ModelFamily::Flux
        );
        assert_eq!(
            ModelFamily::of("fal-ai/stable-video"),
            ModelFamily::StableVideo
        );
        assert_eq!(ModelFamily::of("fal-ai/ltx-video"), ModelFamily::Generic);
        assert_eq!(ModelFamily::of("fal-ai/kokoro"), ModelFamily::Generic);
    }

    #[test]
    fn lora_training_is_not_flux() {
        assert_eq!(
            ModelFamily::of("fal-ai/flux-lora-fast-training"),
            ModelFamily::Generic
        );
    }

    #[test]
    fn only_veo3_passes_names_through() {
        for family in [
            ModelFamily::NanoBananaEdit,
            ModelFamily::SeedreamEdit,
            ModelFamily::Flux,
            ModelFamily::StableVideo,
            ModelFamily::Generic,
        ] {
            assert_eq!(family.naming(), NamingConvention::Convert);
        }
        assert_eq!(ModelFamily::Veo3.naming(), NamingConvention::PassThrough);
    }
}
