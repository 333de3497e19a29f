//! Persistent `filename → content hash` index.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use helpsync_shared::Result;

use crate::{load_json, save_json};

/// Fingerprint store backed by a JSON object on disk.
///
/// Keys are unique by construction. Entries are only added or overwritten;
/// nothing removes the entry of an article that disappeared upstream.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FingerprintStore {
    /// Load the store at `path`. A missing file is an empty store; a corrupt
    /// one is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries: BTreeMap<String, String> = load_json(&path)?.unwrap_or_default();
        debug!(path = %path.display(), entries = entries.len(), "loaded fingerprint store");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored hash for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Record `hash` for `key`, returning the previous hash.
    pub fn record(&mut self, key: impl Into<String>, hash: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), hash.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of all entries, ordered by key.
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Rewrite the whole store.
    pub fn save(&self) -> Result<()> {
        save_json(&self.path, &self.entries)?;
        info!(path = %self.path.display(), entries = self.entries.len(), "saved fingerprint store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;

    #[test]
    fn missing_file_is_empty_store() {
        let store = FingerprintStore::load(temp_dir("fp-missing").join("fingerprints.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn record_and_reload() {
        let dir = temp_dir("fp");
        let path = dir.join("fingerprints.json");

        let mut store = FingerprintStore::load(&path).unwrap();
        assert_eq!(store.record("b.md", "h2"), None);
        assert_eq!(store.record("a.md", "h1"), None);
        assert_eq!(store.record("b.md", "h2-new").as_deref(), Some("h2"));
        store.save().unwrap();

        let reloaded = FingerprintStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("a.md"), Some("h1"));
        assert_eq!(reloaded.get("b.md"), Some("h2-new"));
        assert_eq!(reloaded.get("c.md"), None);

        // Keys are written sorted, so unchanged stores produce identical bytes.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.find("a.md").unwrap() < raw.find("b.md").unwrap());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_is_error() {
        let dir = temp_dir("fp-corrupt");
        let path = dir.join("fingerprints.json");
        crate::write_atomic(&path, b"[1, 2").unwrap();

        assert!(FingerprintStore::load(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
