use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use crate::domain::summary::{now_ms, CacheEntry};
use crate::error::CacheError;

/// Url-keyed summaries persisted as one JSON file, valid for 24 hours.
///
/// The file is read once when the cache is opened; lookups only touch memory.
/// Expired entries read as a miss and stay on disk until their url is written
/// again. A corrupt file reads as empty. Failed writes are logged and the value
/// is still served from memory for the rest of the session.
pub struct SummaryCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl SummaryCache {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_file(&path).unwrap_or_else(|e| {
            debug!(error = %e, path = %path.display(), "summary cache unreadable, starting empty");
            HashMap::new()
        });
        Self { path, entries: Mutex::new(entries) }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn get(&self, url: &str) -> Option<String> {
        self.get_at(url, now_ms())
    }

    pub fn put(&self, url: &str, summary: &str) {
        self.put_at(url, summary, now_ms());
    }

    pub fn get_at(&self, url: &str, now: i64) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(url)?;
        entry.is_fresh(now).then(|| entry.summary.clone())
    }

    pub fn put_at(&self, url: &str, summary: &str, timestamp: i64) {
        let entry = CacheEntry { summary: summary.to_string(), timestamp };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), entry.clone());
        if let Err(e) = self.write_entry(url, entry) {
            warn!(error = %e, %url, "failed to persist summary");
        }
    }

    fn write_entry(&self, url: &str, entry: CacheEntry) -> Result<(), CacheError> {
        // Merge with what is on disk now; a corrupt file is replaced rather than
        // blocking new writes.
        let mut on_disk = read_file(&self.path).unwrap_or_default();
        on_disk.insert(url.to_string(), entry);
        let raw = serde_json::to_string(&on_disk)?;
        std::fs::write(&self.path, raw).map_err(CacheError::WriteFailed)
    }
}

fn read_file(path: &Path) -> Result<HashMap<String, CacheEntry>, CacheError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(CacheError::ReadFailed(e)),
    };
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    #[test]
    fn put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SummaryCache::open(dir.path().join("cache.json"));
        cache.put("https://example.com/a", "summary a");
        assert_eq!(cache.get("https://example.com/a").as_deref(), Some("summary a"));
        assert_eq!(cache.get("https://example.com/b"), None);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        SummaryCache::open(&path).put("u", "s");
        assert_eq!(SummaryCache::open(&path).get("u").as_deref(), Some("s"));
    }

    #[test]
    fn ttl_is_enforced_from_put_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let now = now_ms();
        let raw = json!({
            "old": { "summary": "expired", "timestamp": now - 25 * HOUR_MS },
            "recent": { "summary": "fresh", "timestamp": now - HOUR_MS },
        });
        std::fs::write(&path, raw.to_string()).unwrap();

        let cache = SummaryCache::open(&path);
        assert_eq!(cache.get("old"), None);
        assert_eq!(cache.get("recent").as_deref(), Some("fresh"));

        // Lazy eviction: the expired entry is still on disk.
        let on_disk: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(on_disk.get("old").is_some());
    }

    #[test]
    fn expired_session_entries_miss_too() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SummaryCache::open(dir.path().join("cache.json"));
        cache.put_at("u", "s", now_ms() - 25 * HOUR_MS);
        assert_eq!(cache.get("u"), None);
    }

    #[test]
    fn corrupt_file_is_a_miss_and_gets_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();

        let cache = SummaryCache::open(&path);
        assert_eq!(cache.get("u"), None);
        cache.put("u", "s");
        assert_eq!(SummaryCache::open(&path).get("u").as_deref(), Some("s"));
    }

    #[test]
    fn lookups_are_served_from_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        SummaryCache::open(&path).put("u", "s");

        let cache = SummaryCache::open(&path);
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(cache.get("u").as_deref(), Some("s"));
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cache.get("u").as_deref(), Some("s"));
    }

    #[test]
    fn writes_keep_entries_added_by_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let first = SummaryCache::open(&path);
        let second = SummaryCache::open(&path);
        first.put("a", "one");
        second.put("b", "two");

        let reopened = SummaryCache::open(&path);
        assert_eq!(reopened.get("a").as_deref(), Some("one"));
        assert_eq!(reopened.get("b").as_deref(), Some("two"));
    }

    #[test]
    fn write_failure_keeps_value_for_session() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SummaryCache::open(dir.path().join("missing-dir").join("cache.json"));
        cache.put("u", "s");
        assert_eq!(cache.get("u").as_deref(), Some("s"));
    }
}
