//! Staging files in fal storage: initiate, PUT, and batch uploads.

use std::io::Cursor;

use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

use easel_core::types::Timestamp;

use crate::client::FalClient;
use crate::error::FalError;

/// A file staged in upstream storage.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub url: String,
    pub metadata: UploadMetadata,
}

/// What we know about an uploaded file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub uploaded_at: Timestamp,
    pub sha256: String,
    /// Pixel dimensions, present when the bytes decode as an image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// One file of a batch upload request.
pub struct PendingUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Per-file outcomes of a batch upload.
#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub files: Vec<UploadedFile>,
    pub failed: Vec<UploadFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Deserialize)]
struct InitiateUploadResponse {
    upload_url: String,
    file_url: String,
}

impl FalClient {
    /// Ask the storage API for a signed upload slot.
    async fn initiate_upload(
        &self,
        file_name: &str,
        content_type: &str,
    ) -> Result<InitiateUploadResponse, FalError> {
        let key = self.key()?;
        let url = format!("{}/storage/upload/initiate", self.rest_base_url);
        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, format!("Key {key}"))
            .json(&json!({ "file_name": file_name, "content_type": content_type }))
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

    /// Upload one file: initiate, then PUT the bytes to the signed slot.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, FalError> {
        let slot = self.initiate_upload(file_name, content_type).await?;

        let sha256 = sha256_hex(&bytes);
        let size = bytes.len() as u64;
        let dimensions = probe_dimensions(&bytes);

        let response = self
            .http
            .put(&slot.upload_url)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
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

        tracing::debug!(file = file_name, size, "file staged in upstream storage");
        Ok(UploadedFile {
            url: slot.file_url,
            metadata: UploadMetadata {
                filename: file_name.to_string(),
                size,
                content_type: content_type.to_string(),
                uploaded_at: chrono::Utc::now(),
                sha256,
                width: dimensions.map(|(w, _)| w),
                height: dimensions.map(|(_, h)| h),
            },
        })
    }

    /// Upload several files concurrently.
    ///
    /// Individual failures don't abort the batch; callers get per-file
    /// outcomes. Only a batch where every upload failed is an error,
    /// carrying the concatenated per-file messages.
    pub async fn upload_batch(&self, files: Vec<PendingUpload>) -> Result<BatchOutcome, FalError> {
        let tasks = files.into_iter().map(|file| async move {
            self.upload(&file.file_name, &file.content_type, file.bytes)
                .await
                .map_err(|error| UploadFailure {
                    filename: file.file_name,
                    error: error.to_string(),
                })
        });
        let results = futures::future::join_all(tasks).await;

        let mut uploaded = Vec::new();
        let mut failed = Vec::new();
        for result in results {
            match result {
                Ok(file) => uploaded.push(file),
                Err(failure) => failed.push(failure),
            }
        }

        if uploaded.is_empty() && !failed.is_empty() {
            let messages = failed
                .iter()
                .map(|f| format!("{}: {}", f.filename, f.error))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FalError::BatchFailed(messages));
        }
        Ok(BatchOutcome {
            files: uploaded,
            failed,
        })
    }
}

/// Lowercase hex SHA-256 of the payload.
fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Width and height when the bytes decode as a known image format.
fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
