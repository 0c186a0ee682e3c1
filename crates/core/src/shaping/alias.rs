//! Model id alias resolution.
//!
//! Accepts canonical ids, registered short aliases, discovery-page URLs
//! (`.../models/{id}` with an optional `/api` suffix) and direct run URLs
//! (`https://fal.run/{id}`). Resolution is idempotent: a canonical id
//! always resolves to itself.

use crate::error::CoreError;
use crate::registry::ModelRegistry;

/// Minimum needle length before substring suggestions are attempted.
const SUGGESTION_MIN_LEN: usize = 3;
/// Upper bound on the number of suggestions returned.
const SUGGESTION_LIMIT: usize = 5;

/// Resolve a raw model reference to a canonical registry id.
///
/// Unknown references produce [`CoreError::UnknownModel`] carrying the
/// full known-id list and best-effort suggestions. The suggestions are
/// a substring match against the reference's trailing path segment,
/// a hint for the caller's UI rather than an authoritative answer.
pub fn resolve_model_id(registry: &ModelRegistry, raw: &str) -> Result<String, CoreError> {
    let candidate = strip_url_forms(raw.trim());

    if registry.exists(candidate) {
        return Ok(candidate.to_string());
    }
    if let Some(target) = registry.alias_target(candidate) {
        return Ok(target.to_string());
    }
    if !candidate.starts_with("fal-ai/") {
        let prefixed = format!("fal-ai/{candidate}");
        if registry.exists(&prefixed) {
            return Ok(prefixed);
        }
    }

    let suggestions = suggestions_for(registry, candidate);
    tracing::debug!(reference = raw, ?suggestions, "unresolved model reference");
    Err(CoreError::UnknownModel {
        requested: raw.to_string(),
        known: registry.known_ids(),
        suggestions,
    })
}

/// Strip the URL wrappers a model reference may arrive in.
fn strip_url_forms(raw: &str) -> &str {
    let without_query = raw.split('?').next().unwrap_or(raw);
    let mut id = without_query;
    if let Some((_, rest)) = id.split_once("fal.run/") {
        id = rest;
    } else if let Some(pos) = id.find("/models/") {
        id = &id[pos + "/models/".len()..];
    }
    let id = id.strip_suffix("/api").unwrap_or(id);
    id.strip_suffix('/').unwrap_or(id)
}

/// Known ids containing the reference's trailing path segment.
fn suggestions_for(registry: &ModelRegistry, candidate: &str) -> Vec<String> {
    let needle = candidate
        .rsplit('/')
        .next()
        .unwrap_or(candidate)
        .to_ascii_lowercase();
    if needle.len() < SUGGESTION_MIN_LEN {
        return Vec::new();
    }
    registry
        .known_ids()
        .into_iter()
        .filter(|id| id.to_ascii_lowercase().contains(&needle))
        .take(SUGGESTION_LIMIT)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // -- resolution --

    #[test]
    fn canonical_id_passes_through() {
        let registry = ModelRegistry::new();
        let resolved = resolve_model_id(&registry, "fal-ai/flux/dev").unwrap();
        assert_eq!(resolved, "fal-ai/flux/dev");
    }

    #[test]
    fn resolution_is_idempotent() {
        let registry = ModelRegistry::new();
        let once = resolve_model_id(&registry, "flux").unwrap();
        let twice = resolve_model_id(&registry, &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn short_alias_resolves() {
        let registry = ModelRegistry::new();
        assert_eq!(
            resolve_model_id(&registry, "stable-video").unwrap(),
            "fal-ai/stable-video"
        );
    }

    #[test]
    fn discovery_url_resolves() {
        let registry = ModelRegistry::new();
        for url in [
            "https://fal.ai/models/fal-ai/veo3",
            "https://fal.ai/models/fal-ai/veo3/api",
            "https://fal.ai/models/fal-ai/veo3/api?tab=playground",
        ] {
            assert_eq!(resolve_model_id(&registry, url).unwrap(), "fal-ai/veo3");
        }
    }

    #[test]
    fn run_url_resolves() {
        let registry = ModelRegistry::new();
        assert_eq!(
            resolve_model_id(&registry, "https://fal.run/fal-ai/flux/schnell").unwrap(),
            "fal-ai/flux/schnell"
        );
    }

    #[test]
    fn missing_prefix_is_supplied() {
        let registry = ModelRegistry::new();
        assert_eq!(
            resolve_model_id(&registry, "flux/dev").unwrap(),
            "fal-ai/flux/dev"
        );
        assert_eq!(
            resolve_model_id(&registry, "stable-diffusion-v35-large").unwrap(),
            "fal-ai/stable-diffusion-v35-large"
        );
    }

    // -- failure shape --

    #[test]
    fn unknown_id_carries_known_list() {
        let registry = ModelRegistry::new();
        let err = resolve_model_id(&registry, "fal-ai/does-not-exist").unwrap_err();
        assert_matches!(err, CoreError::UnknownModel { known, .. } => {
            assert!(known.contains(&"fal-ai/flux/dev".to_string()));
        });
    }

    #[test]
    fn suggestions_match_trailing_segment() {
        let registry = ModelRegistry::new();
        let err = resolve_model_id(&registry, "some-vendor/whisper").unwrap_err();
        assert_matches!(err, CoreError::UnknownModel { suggestions, .. } => {
            assert!(suggestions.contains(&"fal-ai/whisper".to_string()));
        });
    }

    #[test]
    fn short_needles_yield_no_suggestions() {
        let registry = ModelRegistry::new();
        let err = resolve_model_id(&registry, "xy").unwrap_err();
        assert_matches!(err, CoreError::UnknownModel { suggestions, .. } => {
            assert!(suggestions.is_empty());
        });
    }
}
