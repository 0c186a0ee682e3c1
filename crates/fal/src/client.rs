//! The raw upstream HTTP client.

use reqwest::header;
use serde_json::Value;

use crate::error::FalError;

/// Client for the fal.ai execution and storage endpoints.
///
/// Constructed once from configuration and shared behind an `Arc`; the
/// API key is optional at construction so the server can boot without
/// credentials, failing per call instead.
pub struct FalClient {
    pub(crate) http: reqwest::Client,
    pub(crate) run_base_url: String,
    pub(crate) rest_base_url: String,
    pub(crate) api_key: Option<String>,
}

impl FalClient {
    pub fn new(
        run_base_url: impl Into<String>,
        rest_base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            run_base_url: trim_base(run_base_url.into()),
            rest_base_url: trim_base(rest_base_url.into()),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// The configured key, or [`FalError::MissingCredentials`].
    pub(crate) fn key(&self) -> Result<&str, FalError> {
        self.api_key.as_deref().ok_or(FalError::MissingCredentials)
    }

    /// Whether a credential is configured at all.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Execute a model synchronously: `POST {run_base}/{model_id}`.
    pub async fn run(
        &self,
        model_id: &str,
        payload: &serde_json::Map<String, Value>,
    ) -> Result<Value, FalError> {
        let key = self.key()?;
        let url = format!("{}/{}", self.run_base_url, model_id);
        tracing::debug!(%url, fields = payload.len(), "running model upstream");

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, format!("Key {key}"))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FalError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
