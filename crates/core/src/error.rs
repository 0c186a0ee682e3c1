/// Domain-level error type shared across the workspace.
///
/// Input problems are always surfaced as human-readable strings; nothing
/// in this crate panics on bad user input.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An input failed a validation check.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A model id could not be resolved against the registry.
    ///
    /// Carries the full list of registered ids plus best-effort fuzzy
    /// suggestions so callers can render a "did you mean" hint.
    #[error("Model not found: {requested}")]
    UnknownModel {
        /// The id (or alias) as supplied by the caller.
        requested: String,
        /// All canonical model ids known to the registry.
        known: Vec<String>,
        /// Substring matches against the requested id's trailing segment.
        suggestions: Vec<String>,
    },

    /// The upstream call succeeded at the HTTP level but the body is
    /// missing the field the model's category promises.
    #[error("Invalid upstream response: {reason}")]
    InvalidResponse {
        reason: String,
        /// Raw response body, kept for diagnostics.
        raw: serde_json::Value,
    },

    /// An unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
