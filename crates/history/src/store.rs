//! The file-backed history store.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::HistoryError;
use crate::item::HistoryItem;

/// Default cap on stored items.
pub const DEFAULT_MAX_ITEMS: usize = 50;
/// Default cap on the encoded size of the whole store.
pub const DEFAULT_MAX_BYTES: usize = 4_000_000;

/// Caps applied after every mutation.
#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    pub max_items: usize,
    pub max_bytes: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// What an eviction pass did. Callers log any non-noop report so data
/// loss is always visible in the logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    /// Items removed entirely.
    pub dropped: usize,
    /// Items whose heavy fields were stripped.
    pub stripped: usize,
    /// Whether the store was fully cleared as a last resort.
    pub cleared: bool,
}

impl EvictionReport {
    pub fn is_noop(&self) -> bool {
        self.dropped == 0 && self.stripped == 0 && !self.cleared
    }
}

/// Outcome of an import.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub discarded: usize,
    pub duplicates: usize,
    pub eviction: EvictionReport,
}

/// Bounded JSON-array store, newest first, guarded by one async lock.
///
/// Every mutation persists atomically (write to a temp file, then
/// rename), so a crash mid-write can never corrupt the stored array.
pub struct HistoryStore {
    path: PathBuf,
    limits: StoreLimits,
    items: Mutex<Vec<HistoryItem>>,
}

impl HistoryStore {
    /// Open a store, loading whatever the file holds. A missing file is
    /// an empty store; unreadable entries are dropped with a warning
    /// rather than refusing to start.
    pub async fn open(
        path: impl Into<PathBuf>,
        limits: StoreLimits,
    ) -> Result<Self, HistoryError> {
        let path = path.into();
        let items = match tokio::fs::read(&path).await {
            Ok(bytes) => load_items(&bytes),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(error.into()),
        };
        Ok(Self {
            path,
            limits,
            items: Mutex::new(items),
        })
    }

    /// Prepend a new item and enforce the caps.
    pub async fn add(&self, item: HistoryItem) -> Result<EvictionReport, HistoryError> {
        let mut items = self.items.lock().await;
        items.insert(0, item);
        let report = enforce_limits(&mut items, &self.limits)?;
        self.persist(&items).await?;
        if !report.is_noop() {
            tracing::warn!(
                dropped = report.dropped,
                stripped = report.stripped,
                cleared = report.cleared,
                "history eviction applied"
            );
        }
        Ok(report)
    }

    /// All items, newest first.
    pub async fn list(&self) -> Vec<HistoryItem> {
        self.items.lock().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<HistoryItem> {
        self.items
            .lock()
            .await
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    pub async fn remove(&self, id: &str) -> Result<(), HistoryError> {
        let mut items = self.items.lock().await;
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Err(HistoryError::NotFound(id.to_string()));
        }
        self.persist(&items).await
    }

    pub async fn clear(&self) -> Result<(), HistoryError> {
        let mut items = self.items.lock().await;
        items.clear();
        self.persist(&items).await
    }

    /// The full array in interchange form, for export.
    pub async fn export(&self) -> Vec<HistoryItem> {
        self.list().await
    }

    /// Merge an exported JSON array back in.
    ///
    /// Entries missing the identity fields are discarded individually;
    /// the import only fails when nothing valid remains. Items already
    /// present (by id) are skipped.
    pub async fn import(&self, raw: Value) -> Result<ImportReport, HistoryError> {
        let Value::Array(entries) = raw else {
            return Err(HistoryError::InvalidImport(
                "expected a JSON array of history items".to_string(),
            ));
        };
        let total = entries.len();
        let valid: Vec<HistoryItem> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        if valid.is_empty() {
            return Err(HistoryError::InvalidImport(
                "no valid history items in import".to_string(),
            ));
        }
        let discarded = total - valid.len();

        let mut items = self.items.lock().await;
        let mut imported = 0;
        let mut duplicates = 0;
        for item in valid {
            if items.iter().any(|existing| existing.id == item.id) {
                duplicates += 1;
            } else {
                items.push(item);
                imported += 1;
            }
        }
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let eviction = enforce_limits(&mut items, &self.limits)?;
        self.persist(&items).await?;
        if discarded > 0 {
            tracing::warn!(discarded, "import discarded invalid history entries");
        }
        Ok(ImportReport {
            imported,
            discarded,
            duplicates,
            eviction,
        })
    }

    /// Atomic write: temp file in the same directory, then rename.
    async fn persist(&self, items: &[HistoryItem]) -> Result<(), HistoryError> {
        let bytes = serde_json::to_vec(items)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn load_items(bytes: &[u8]) -> Vec<HistoryItem> {
    let parsed: Vec<Value> = match serde_json::from_slice(bytes) {
        Ok(parsed) => parsed,
        Err(error) => {
            tracing::warn!(%error, "history file unreadable, starting empty");
            return Vec::new();
        }
    };
    let total = parsed.len();
    let items: Vec<HistoryItem> = parsed
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    if items.len() < total {
        tracing::warn!(
            discarded = total - items.len(),
            "dropped unreadable history entries on load"
        );
    }
    items
}

/// The eviction ladder, in order:
/// (a) drop items beyond the count cap;
/// (b) over the byte budget, strip heavy fields oldest-first;
/// (c) still over, drop oldest items until it fits;
/// (d) a single item alone over budget clears the store.
fn enforce_limits(
    items: &mut Vec<HistoryItem>,
    limits: &StoreLimits,
) -> Result<EvictionReport, HistoryError> {
    let mut report = EvictionReport::default();

    if items.len() > limits.max_items {
        report.dropped += items.len() - limits.max_items;
        items.truncate(limits.max_items);
    }

    let mut size = encoded_size(items)?;
    if size > limits.max_bytes {
        let mut index = items.len();
        while size > limits.max_bytes && index > 0 {
            index -= 1;
            if items[index].strip_heavy() {
                report.stripped += 1;
                size = encoded_size(items)?;
            }
        }
    }

    while size > limits.max_bytes && items.len() > 1 {
        items.pop();
        report.dropped += 1;
        size = encoded_size(items)?;
    }

    if size > limits.max_bytes && !items.is_empty() {
        items.clear();
        report.cleared = true;
    }

    Ok(report)
}

fn encoded_size(items: &[HistoryItem]) -> Result<usize, HistoryError> {
    Ok(serde_json::to_vec(items)?.len())
}

/* --------------------------------------------------------------------------
   Tests
   -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn item_with(id: &str, hour: u8, prompt: &str, thumbnail_len: usize) -> HistoryItem {
        let mut media = json!({ "url": "https://e/a.png" });
        if thumbnail_len > 0 {
            media["thumbnail"] = json!("t".repeat(thumbnail_len));
        }
        serde_json::from_value(json!({
            "id": id,
            "timestamp": format!("2025-01-15T{hour:02}:00:00Z"),
            "modelId": "fal-ai/flux/dev",
            "modelName": "FLUX.1 [dev]",
            "category": "image-generation",
            "prompt": prompt,
            "inputParams": { "prompt": prompt },
            "result": { "images": [media] }
        }))
        .unwrap()
    }

    fn item(id: &str, hour: u8) -> HistoryItem {
        item_with(id, hour, "a red bicycle", 0)
    }

    async fn store(dir: &tempfile::TempDir, limits: StoreLimits) -> HistoryStore {
        HistoryStore::open(dir.path().join("history.json"), limits)
            .await
            .unwrap()
    }

    // -- basics --

    #[tokio::test]
    async fn add_prepends_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, StoreLimits::default()).await;
        store.add(item("gen-1", 1)).await.unwrap();
        store.add(item("gen-2", 2)).await.unwrap();
        let items = store.list().await;
        assert_eq!(items[0].id, "gen-2");
        assert_eq!(items[1].id, "gen-1");
    }

    #[tokio::test]
    async fn get_remove_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, StoreLimits::default()).await;
        store.add(item("gen-1", 1)).await.unwrap();

        assert!(store.get("gen-1").await.is_some());
        assert!(store.get("gen-9").await.is_none());

        assert_matches!(
            store.remove("gen-9").await,
            Err(HistoryError::NotFound(id)) => assert_eq!(id, "gen-9")
        );
        store.remove("gen-1").await.unwrap();
        assert!(store.is_empty().await);

        store.add(item("gen-2", 2)).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.len().await, 0);
    }

    // -- persistence --

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        {
            let store = HistoryStore::open(&path, StoreLimits::default()).await.unwrap();
            store.add(item("gen-1", 1)).await.unwrap();
            store.add(item("gen-2", 2)).await.unwrap();
        }
        let reopened = HistoryStore::open(&path, StoreLimits::default()).await.unwrap();
        let items = reopened.list().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "gen-2");
    }

    #[tokio::test]
    async fn persist_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = HistoryStore::open(&path, StoreLimits::default()).await.unwrap();
        store.add(item("gen-1", 1)).await.unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        let store = HistoryStore::open(&path, StoreLimits::default()).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn unreadable_entries_are_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mixed = json!([
            serde_json::to_value(item("gen-1", 1)).unwrap(),
            { "id": "broken" },
            42
        ]);
        tokio::fs::write(&path, serde_json::to_vec(&mixed).unwrap())
            .await
            .unwrap();
        let store = HistoryStore::open(&path, StoreLimits::default()).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    // -- eviction ladder --

    #[tokio::test]
    async fn item_cap_evicts_the_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let limits = StoreLimits {
            max_items: 3,
            max_bytes: DEFAULT_MAX_BYTES,
        };
        let store = store(&dir, limits).await;
        for (i, id) in ["gen-1", "gen-2", "gen-3"].iter().enumerate() {
            let report = store.add(item(id, i as u8 + 1)).await.unwrap();
            assert!(report.is_noop());
        }
        let report = store.add(item("gen-4", 4)).await.unwrap();
        assert_eq!(report.dropped, 1);
        assert!(store.get("gen-1").await.is_none());
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn byte_budget_strips_heavy_fields_first() {
        let dir = tempfile::tempdir().unwrap();
        let limits = StoreLimits {
            max_items: 10,
            max_bytes: 3000,
        };
        let store = store(&dir, limits).await;
        store
            .add(item_with("gen-1", 1, "a red bicycle", 2000))
            .await
            .unwrap();
        let report = store
            .add(item_with("gen-2", 2, "a red bicycle", 2000))
            .await
            .unwrap();
        assert_eq!(report.stripped, 1);
        assert_eq!(report.dropped, 0);
        assert!(!report.cleared);
        // Both items survive; only the oldest lost its thumbnail.
        assert_eq!(store.len().await, 2);
        let oldest = store.get("gen-1").await.unwrap();
        let newest = store.get("gen-2").await.unwrap();
        assert!(oldest.result.images[0].thumbnail.is_none());
        assert!(newest.result.images[0].thumbnail.is_some());
    }

    #[tokio::test]
    async fn byte_budget_drops_oldest_when_stripping_is_not_enough() {
        let dir = tempfile::tempdir().unwrap();
        let limits = StoreLimits {
            max_items: 10,
            max_bytes: 2500,
        };
        let store = store(&dir, limits).await;
        let long_prompt = "p".repeat(1000);
        store.add(item_with("gen-1", 1, &long_prompt, 0)).await.unwrap();
        store.add(item_with("gen-2", 2, &long_prompt, 0)).await.unwrap();
        let report = store.add(item_with("gen-3", 3, &long_prompt, 0)).await.unwrap();
        assert!(report.dropped > 0);
        assert!(store.get("gen-3").await.is_some());
        assert!(store.get("gen-1").await.is_none());
    }

    #[tokio::test]
    async fn single_oversized_item_clears_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let limits = StoreLimits {
            max_items: 10,
            max_bytes: 500,
        };
        let store = store(&dir, limits).await;
        let report = store
            .add(item_with("gen-1", 1, &"p".repeat(2000), 0))
            .await
            .unwrap();
        assert!(report.cleared);
        assert!(store.is_empty().await);
    }

    // -- import / export --

    #[tokio::test]
    async fn import_filters_invalid_items() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, StoreLimits::default()).await;
        let payload = json!([
            serde_json::to_value(item("gen-1", 1)).unwrap(),
            { "id": "no-required-fields" },
            "not even an object"
        ]);
        let report = store.import(payload).await.unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.discarded, 2);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn import_with_nothing_valid_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, StoreLimits::default()).await;
        let err = store.import(json!([{ "id": "x" }])).await.unwrap_err();
        assert_matches!(err, HistoryError::InvalidImport(_));
        assert_matches!(
            store.import(json!({ "not": "an array" })).await.unwrap_err(),
            HistoryError::InvalidImport(_)
        );
    }

    #[tokio::test]
    async fn import_skips_duplicates_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, StoreLimits::default()).await;
        store.add(item("gen-2", 2)).await.unwrap();
        let payload = json!([
            serde_json::to_value(item("gen-1", 1)).unwrap(),
            serde_json::to_value(item("gen-2", 2)).unwrap(),
            serde_json::to_value(item("gen-3", 3)).unwrap(),
        ]);
        let report = store.import(payload).await.unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.duplicates, 1);
        let ids: Vec<_> = store.list().await.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, ["gen-3", "gen-2", "gen-1"]);
    }

    #[tokio::test]
    async fn export_round_trips_through_import() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, StoreLimits::default()).await;
        store.add(item("gen-1", 1)).await.unwrap();
        let exported = serde_json::to_value(store.export().await).unwrap();

        let other_dir = tempfile::tempdir().unwrap();
        let other = HistoryStore::open(other_dir.path().join("history.json"), StoreLimits::default())
            .await
            .unwrap();
        let report = other.import(exported).await.unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(other.get("gen-1").await.unwrap().prompt, "a red bicycle");
    }
}
