//! HTTP client for the fal.ai hosted inference API.
//!
//! Covers the two upstream surfaces the gateway talks to: the
//! synchronous model execution endpoint (`https://fal.run/{model_id}`)
//! and the storage REST API used to stage uploaded files. Dispatching
//! adds the per-family retry behavior on top of the raw client.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod storage;

pub use client::FalClient;
pub use dispatch::dispatch;
pub use error::FalError;
pub use storage::{BatchOutcome, PendingUpload, UploadFailure, UploadMetadata, UploadedFile};
