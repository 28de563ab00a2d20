//! The persisted aggregation store.
//!
//! One JSON object maps each source identifier to its bounded, ordered list
//! of records (index 0 is the most recently confirmed item). The store is
//! loaded once at start, merged into once per source, and written back once
//! at the end of the run.
//!
//! # Durability
//!
//! Loading never fails: a missing or malformed file yields an empty store
//! and a log line. Records are read one by one, so a single unreadable
//! record costs only itself, and an entry that is not a list at all is
//! written back untouched. Saving writes and syncs a sibling temp file and
//! renames it over the target, so readers see either the old file or the
//! new one.

use crate::merge::{self, MergeOutcome};
use crate::models::Record;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source identifier → bounded record collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationStore {
    collections: BTreeMap<String, Vec<Record>>,
    /// Entries that are not record lists, carried through as found.
    opaque: BTreeMap<String, Value>,
}

/// One top-level entry of the state file as written.
#[derive(Serialize)]
#[serde(untagged)]
enum Entry<'a> {
    Records(&'a [Record]),
    Raw(&'a Value),
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store from `path`, falling back to empty on any problem.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No persisted state; starting empty");
                return Self::new();
            }
            Err(e) => {
                warn!(error = %e, "Could not read persisted state; starting empty");
                return Self::new();
            }
        };

        let root = match serde_json::from_str::<Map<String, Value>>(&raw) {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, "Persisted state is malformed; starting empty");
                return Self::new();
            }
        };

        let mut store = Self::new();
        for (source, value) in root {
            let Value::Array(items) = value else {
                warn!(%source, "Persisted entry is not a record list; keeping it as is");
                store.opaque.insert(source, value);
                continue;
            };

            let found = items.len();
            let records: Vec<Record> = items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect();
            if records.len() < found {
                warn!(%source, dropped = found - records.len(), "Skipped unreadable records");
            }
            store.collections.insert(source, records);
        }

        info!(
            sources = store.collections.len(),
            records = store.total_records(),
            "Loaded persisted state"
        );
        store
    }

    /// Atomically replace the file at `path` with the current contents.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = self.to_pretty_json()?;

        let tmp = tmp_path(path);
        if let Err(e) = write_synced(&tmp, &json).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        info!(
            sources = self.collections.len(),
            records = self.total_records(),
            "Wrote persisted state"
        );
        Ok(())
    }

    /// Four-space indented JSON, keys sorted.
    fn to_pretty_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut entries: BTreeMap<&str, Entry<'_>> = self
            .opaque
            .iter()
            .map(|(source, value)| (source.as_str(), Entry::Raw(value)))
            .collect();
        for (source, records) in &self.collections {
            entries.insert(source, Entry::Records(records));
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        entries.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Records currently held for `source` (empty if unknown).
    pub fn collection(&self, source: &str) -> &[Record] {
        self.collections
            .get(source)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Merge a session result into `source`'s collection.
    ///
    /// The source key is always present afterwards, even if both the
    /// session and the previous collection were empty. An entry kept as is
    /// from the loaded file is only replaced once a session has records.
    pub fn merge_session(
        &mut self,
        source: &str,
        session: Vec<Record>,
        max_retained: usize,
    ) -> MergeOutcome {
        if session.is_empty() && self.opaque.contains_key(source) {
            return MergeOutcome::Unchanged;
        }
        self.opaque.remove(source);

        let existing = self.collections.remove(source).unwrap_or_default();
        let (merged, outcome) = merge::merge(existing, session, max_retained);
        self.collections.insert(source.to_string(), merged);
        outcome
    }

    pub fn total_records(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub fn insert(&mut self, source: impl Into<String>, records: Vec<Record>) {
        self.collections.insert(source.into(), records);
    }

    #[cfg(test)]
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("state.json"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(title: &str) -> Record {
        Record::new(title, format!("https://x.edu/{title}"), "", format!("about {title}"))
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AggregationStore::load(&dir.path().join("absent.json")).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, "this is { not json").await.unwrap();
        let store = AggregationStore::load(&path).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_non_object_root_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, r#"[{"title": "A"}]"#).await.unwrap();
        assert!(AggregationStore::load(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_null_fields_do_not_cost_other_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(
            &path,
            r#"{
                "ccny": [{"title": "A", "read_more_link": "https://x.edu/a", "image_reference": "",
                          "description": "about A", "date": "May 1"}],
                "hostos": [{"title": "H", "read_more_link": "https://x.edu/h", "image_reference": "",
                            "description": "about H", "date": null}]
            }"#,
        )
        .await
        .unwrap();

        let store = AggregationStore::load(&path).await;
        assert_eq!(store.len(), 2);
        assert_eq!(store.collection("ccny")[0].date, "May 1");
        assert_eq!(store.collection("hostos")[0].title, "H");
        assert_eq!(store.collection("hostos")[0].date, "");
    }

    #[tokio::test]
    async fn test_unreadable_record_only_drops_itself() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(
            &path,
            r#"{"bmcc": ["stray string", {"title": "Kept", "description": 7}, {"title": "Also kept"}]}"#,
        )
        .await
        .unwrap();

        let store = AggregationStore::load(&path).await;
        let titles: Vec<_> = store.collection("bmcc").iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Also kept"]);
    }

    #[tokio::test]
    async fn test_non_list_entry_is_written_back_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, r#"{"notes": {"owner": "web team"}, "ccny": []}"#)
            .await
            .unwrap();

        let mut store = AggregationStore::load(&path).await;
        assert_eq!(store.merge_session("notes", vec![], 20), MergeOutcome::Unchanged);
        store.save(&path).await.unwrap();

        let raw: Value = serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(raw["notes"]["owner"], "web team");
        assert_eq!(raw["ccny"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_contents_and_extra_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(
            &path,
            r#"{"qc": [{"title": "Grant", "read_more_link": "https://qc.edu/g", "month": "May"}]}"#,
        )
        .await
        .unwrap();

        let mut store = AggregationStore::load(&path).await;
        store.insert("ccny", vec![rec("A"), rec("B")]);
        store.save(&path).await.unwrap();

        let reloaded = AggregationStore::load(&path).await;
        assert_eq!(reloaded, store);
        assert_eq!(reloaded.collection("ccny").len(), 2);
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.contains("\"month\": \"May\""));
        assert!(raw.starts_with("{\n    \"ccny\""));
        assert!(!tmp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("state.json");
        let result = AggregationStore::new().save(&path).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn test_merge_session_always_creates_key() {
        let mut store = AggregationStore::new();
        let outcome = store.merge_session("bmcc", vec![], 20);
        assert_eq!(outcome, MergeOutcome::Unchanged);
        assert_eq!(store.sources().collect::<Vec<_>>(), vec!["bmcc"]);
        assert!(store.collection("bmcc").is_empty());
    }

    #[test]
    fn test_merge_session_uses_existing_collection() {
        let mut store = AggregationStore::new();
        store.insert("ccny", vec![rec("A"), rec("B")]);
        let outcome = store.merge_session("ccny", vec![rec("C"), rec("A")], 20);
        assert_eq!(outcome, MergeOutcome::Prepended { fresh: 1, len: 3 });
        let titles: Vec<_> = store.collection("ccny").iter().map(|r| r.title.clone()).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
        assert_eq!(store.total_records(), 3);
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::create_dir(&path).await.unwrap();

        let result = AggregationStore::new().save(&path).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_merge_session_trims_oversized_collection() {
        let mut store = AggregationStore::new();
        let history: Vec<Record> = (0..30).map(|i| rec(&format!("S{i}"))).collect();
        store.insert("sps", history);

        let outcome = store.merge_session("sps", vec![], 20);
        assert_eq!(outcome, MergeOutcome::Trimmed { len: 20 });
        assert_eq!(store.collection("sps").len(), 20);

        let outcome = store.merge_session("sps", vec![rec("S0")], 20);
        assert_eq!(outcome, MergeOutcome::Unchanged);
        assert_eq!(store.collection("sps").len(), 20);
        assert_eq!(store.collection("sps")[0].title, "S0");
    }

    #[test]
    fn test_tmp_path_is_sibling() {
        let p = Path::new("/var/data/colleges_data.json");
        assert_eq!(tmp_path(p), PathBuf::from("/var/data/colleges_data.json.tmp"));
    }
}
