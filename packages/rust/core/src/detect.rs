//! Content-addressed change detection.
//!
//! A document's fingerprint is the lowercase hex SHA-256 of the UTF-8 bytes
//! of its normalized body. Classification only reads the fingerprint store;
//! the orchestrator records the new hash once the document is on disk.

use sha2::{Digest, Sha256};

use helpsync_storage::FingerprintStore;

/// How a document compares to the previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// No fingerprint stored for the key.
    Added,
    /// Fingerprint stored, but the hash differs.
    Updated,
    /// Stored fingerprint equals the computed hash.
    Unchanged,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: ChangeStatus,
    /// Hash to record once the document has been written.
    pub hash: String,
}

/// SHA-256 of `body` as lowercase hex.
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Classify the document stored under `key` against the fingerprint store.
pub fn classify(key: &str, body: &str, store: &FingerprintStore) -> Classification {
    let hash = content_hash(body);
    let status = match store.get(key) {
        Some(stored) if stored == hash => ChangeStatus::Unchanged,
        Some(_) => ChangeStatus::Updated,
        None => ChangeStatus::Added,
    };
    Classification { status, hash }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_store() -> FingerprintStore {
        let path = std::env::temp_dir()
            .join(format!("helpsync-detect-{}", uuid::Uuid::now_v7()))
            .join("fingerprints.json");
        FingerprintStore::load(path).unwrap()
    }

    #[test]
    fn hash_is_known_sha256() {
        assert_eq!(
            content_hash("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let body = "## Setup\n\nPlug in the player.";
        assert_eq!(content_hash(body), content_hash(body));
        assert_ne!(content_hash(body), content_hash("## Setup\n\nPlug in the player!"));
        assert_eq!(content_hash(body).len(), 64);
    }

    #[test]
    fn absent_key_is_added() {
        let store = empty_store();
        let c = classify("a.md", "body", &store);
        assert_eq!(c.status, ChangeStatus::Added);
        assert_eq!(c.hash, content_hash("body"));
    }

    #[test]
    fn same_hash_is_unchanged() {
        let mut store = empty_store();
        store.record("a.md", content_hash("body"));
        assert_eq!(classify("a.md", "body", &store).status, ChangeStatus::Unchanged);
    }

    #[test]
    fn different_hash_is_updated() {
        let mut store = empty_store();
        store.record("a.md", content_hash("old body"));
        let c = classify("a.md", "new body", &store);
        assert_eq!(c.status, ChangeStatus::Updated);
        assert_eq!(c.hash, content_hash("new body"));
    }

    #[test]
    fn classification_is_per_key() {
        let mut store = empty_store();
        store.record("a.md", content_hash("body"));
        assert_eq!(classify("b.md", "body", &store).status, ChangeStatus::Added);
    }

    #[test]
    fn classify_does_not_touch_store() {
        let store = empty_store();
        let _ = classify("a.md", "body", &store);
        assert!(store.is_empty());
    }
}
