//! Bounded, file-backed persistence of past generations.
//!
//! History is a JSON array, newest first, capped by item count and by
//! total encoded size. Going over budget triggers a deterministic
//! eviction ladder, and every eviction is reported -- data loss is
//! logged, never silent.

pub mod error;
pub mod item;
pub mod store;

pub use error::HistoryError;
pub use item::{HistoryItem, ItemMetadata, MediaRef, NormalizedResult};
pub use store::{EvictionReport, HistoryStore, ImportReport, StoreLimits};
