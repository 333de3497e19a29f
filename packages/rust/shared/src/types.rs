//! Core domain types shared by every stage of a sync run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ArticleRef
// ---------------------------------------------------------------------------

/// Opaque catalog identifier.
///
/// The help-center API sends numeric ids; they are kept as their decimal
/// string so nothing downstream depends on the upstream representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ArticleId(pub String);

impl<'de> Deserialize<'de> for ArticleId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self(n.to_string()),
            Raw::Text(s) => Self(s),
        })
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One article listed by the catalog: the unit of work of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub id: ArticleId,
    pub title: String,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A normalized article, held only for one pipeline pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    /// Normalized Markdown body (never empty).
    pub body: String,
}

impl Document {
    /// Stable key of this document: the filename it is written under.
    pub fn filename(&self) -> String {
        document_filename(&self.title)
    }

    /// On-disk representation: `# <title>`, a blank line, then the body.
    pub fn render(&self) -> String {
        format!("# {}\n\n{}", self.title, self.body)
    }
}

/// Generate a filesystem-safe slug from a title.
///
/// Apostrophes are dropped so "What's new" becomes `whats-new`; every other
/// non-alphanumeric run collapses into a single `-`. Non-ASCII letters are
/// kept as-is (`café` stays `café`), so these filenames intentionally differ
/// from a transliterating slugger such as python-slugify (`what-s-new`,
/// `cafe`). Data directories written by other tools are not reused.
pub fn slugify(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}'))
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Filename (and fingerprint key) for a document with the given title.
pub fn document_filename(title: &str) -> String {
    format!("{}.md", slugify(title))
}

/// Filename for a document whose title slug is already taken in the same run.
pub fn disambiguated_filename(title: &str, id: &ArticleId) -> String {
    format!("{}-{}.md", slugify(title), slugify(&id.0))
}

// ---------------------------------------------------------------------------
// Upload records
// ---------------------------------------------------------------------------

/// A file accepted by the indexing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkedUpload {
    /// Identifier assigned by the remote service.
    pub file_id: String,
    pub filename: String,
    /// Number of line-aligned chunks, for reporting only.
    pub chunks: usize,
    /// Content length in characters.
    pub size: usize,
}

/// Outcome of one upload batch, also written to `upload_summary.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub total_files: usize,
    pub total_chunks: usize,
    pub failed: usize,
    pub files: Vec<ChunkedUpload>,
}

impl UploadSummary {
    /// Return a new summary with `upload` appended.
    pub fn with_upload(mut self, upload: ChunkedUpload) -> Self {
        self.total_files += 1;
        self.total_chunks += upload.chunks;
        self.files.push(upload);
        self
    }

    /// Return a new summary with one more failed file.
    pub fn with_failure(mut self) -> Self {
        self.failed += 1;
        self
    }

    /// Average chunks per uploaded file (0.0 when nothing was uploaded).
    pub fn average_chunks(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            self.total_chunks as f64 / self.total_files as f64
        }
    }
}

// ---------------------------------------------------------------------------
// SyncStats
// ---------------------------------------------------------------------------

/// Aggregated counters for one run.
///
/// Values are never mutated in place by the pipeline: each stage produces a
/// delta and [`SyncStats::merge`] combines them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub added: usize,
    pub updated: usize,
    /// Documents whose fingerprint matched (unchanged).
    pub skipped: usize,
    pub failed: usize,
    /// Filenames written this run: the upload candidate set.
    #[serde(default)]
    pub written: Vec<String>,
    #[serde(default)]
    pub uploaded: usize,
    #[serde(default)]
    pub upload_failed: usize,
    #[serde(default)]
    pub total_chunks: usize,
}

impl SyncStats {
    /// Combine two stat values.
    pub fn merge(mut self, other: SyncStats) -> Self {
        self.added += other.added;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.written.extend(other.written);
        self.uploaded += other.uploaded;
        self.upload_failed += other.upload_failed;
        self.total_chunks += other.total_chunks;
        self
    }

    /// Fold the result of an upload batch into these stats.
    pub fn with_uploads(self, summary: &UploadSummary) -> Self {
        self.merge(SyncStats {
            uploaded: summary.total_files,
            upload_failed: summary.failed,
            total_chunks: summary.total_chunks,
            ..SyncStats::default()
        })
    }

    /// Number of articles accounted for by the scrape stages.
    pub fn total(&self) -> usize {
        self.added + self.updated + self.skipped + self.failed
    }
}

// ---------------------------------------------------------------------------
// JobLogEntry
// ---------------------------------------------------------------------------

/// One line of the bounded execution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLogEntry {
    /// Time-sortable run identifier.
    #[serde(default = "Uuid::nil")]
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub stats: SyncStats,
}

impl JobLogEntry {
    /// Create an entry stamped with the current time and a fresh run id.
    pub fn now(stats: SyncStats) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            timestamp: Utc::now(),
            stats,
        }
    }
}
