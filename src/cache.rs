//! In-memory document record cache.
//!
//! One [`DocumentRecord`] per canonical path behind a `std::sync::RwLock`.
//! Records are stored as `Arc`s and never mutated in place, so a
//! [`DocumentCache::snapshot`] is a vector of pointer clones and readers
//! never observe a half-written record. No I/O happens here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::models::DocumentRecord;

type RecordMap = HashMap<PathBuf, Arc<DocumentRecord>>;

pub struct DocumentCache {
    records: RwLock<RecordMap>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    // A writer that panicked mid-insert cannot leave a partial record
    // behind, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, RecordMap> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RecordMap> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, path: &Path) -> Option<Arc<DocumentRecord>> {
        self.read().get(path).cloned()
    }

    /// Insert or replace the record keyed by `record.path`.
    pub fn put(&self, record: DocumentRecord) -> Arc<DocumentRecord> {
        let record = Arc::new(record);
        self.write().insert(record.path.clone(), Arc::clone(&record));
        record
    }

    /// Returns whether a record was present.
    pub fn remove(&self, path: &Path) -> bool {
        self.write().remove(path).is_some()
    }

    /// True when no record exists or its timestamp differs from `on_disk`
    /// in either direction.
    pub fn is_stale(&self, path: &Path, on_disk: DateTime<Utc>) -> bool {
        match self.read().get(path) {
            Some(record) => record.modified_time != on_disk,
            None => true,
        }
    }

    /// Point-in-time copy sorted by path.
    pub fn snapshot(&self) -> Vec<Arc<DocumentRecord>> {
        let mut records: Vec<Arc<DocumentRecord>> = self.read().values().cloned().collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }

    /// Sorted list of cached paths.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(path: &str, content: &str, modified: DateTime<Utc>) -> DocumentRecord {
        let path = PathBuf::from(path);
        DocumentRecord {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            path,
            file_type: "Text File".to_string(),
            language: "unknown".to_string(),
            size_bytes: content.len() as u64,
            modified_time: modified,
            content: content.to_string(),
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn put_replaces_never_duplicates() {
        let cache = DocumentCache::new();
        let t = Utc::now();
        cache.put(record("/d/a.txt", "one", t));
        cache.put(record("/d/a.txt", "two", t));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(Path::new("/d/a.txt")).unwrap().content, "two");
    }

    #[test]
    fn staleness_in_both_directions() {
        let cache = DocumentCache::new();
        let t = Utc::now();
        let path = Path::new("/d/a.txt");
        assert!(cache.is_stale(path, t));

        cache.put(record("/d/a.txt", "x", t));
        assert!(!cache.is_stale(path, t));
        assert!(cache.is_stale(path, t + Duration::seconds(1)));
        assert!(cache.is_stale(path, t - Duration::seconds(1)));
    }

    #[test]
    fn remove_reports_presence() {
        let cache = DocumentCache::new();
        cache.put(record("/d/a.txt", "x", Utc::now()));
        assert!(cache.remove(Path::new("/d/a.txt")));
        assert!(!cache.remove(Path::new("/d/a.txt")));
        assert!(cache.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_and_isolated() {
        let cache = DocumentCache::new();
        let t = Utc::now();
        cache.put(record("/d/b.txt", "b", t));
        cache.put(record("/d/a.txt", "a", t));

        let snap = cache.snapshot();
        cache.put(record("/d/a.txt", "changed", t));
        cache.remove(Path::new("/d/b.txt"));

        let paths: Vec<_> = snap.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/d/a.txt"), PathBuf::from("/d/b.txt")]);
        assert_eq!(snap[0].content, "a");
        assert_eq!(cache.paths(), vec![PathBuf::from("/d/a.txt")]);
    }

    #[test]
    fn clear_empties() {
        let cache = DocumentCache::new();
        cache.put(record("/d/a.txt", "x", Utc::now()));
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
