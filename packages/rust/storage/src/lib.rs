//! On-disk state for helpsync.
//!
//! - [`DocumentStore`]: one Markdown file per document in the data directory
//! - [`FingerprintStore`]: `filename → content hash` JSON object
//! - [`JobLog`]: bounded JSON array of past runs
//!
//! The JSON stores are loaded whole at run start and rewritten whole at run
//! end. Every rewrite goes through [`write_atomic`] (temp file + rename), so
//! a crash mid-write leaves the previous version intact.

mod documents;
mod fingerprints;
mod job_log;

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use helpsync_shared::{HelpSyncError, Result, UploadSummary};

pub use documents::DocumentStore;
pub use fingerprints::FingerprintStore;
pub use job_log::JobLog;

const FINGERPRINTS_FILE: &str = "fingerprints.json";
const JOB_LOG_FILE: &str = "job_log.json";
const UPLOAD_SUMMARY_FILE: &str = "upload_summary.json";

/// Paths of the state files inside the state directory.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub fingerprints: PathBuf,
    pub job_log: PathBuf,
    pub upload_summary: PathBuf,
}

impl StatePaths {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            fingerprints: state_dir.join(FINGERPRINTS_FILE),
            job_log: state_dir.join(JOB_LOG_FILE),
            upload_summary: state_dir.join(UPLOAD_SUMMARY_FILE),
        }
    }
}

/// Write `content` to `path` atomically: write a sibling temp file, then rename.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| HelpSyncError::io(parent, e))?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| HelpSyncError::validation(format!("not a file path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, content).map_err(|e| HelpSyncError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| HelpSyncError::io(path, e))?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub(crate) fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| HelpSyncError::Storage(format!("failed to encode {}: {e}", path.display())))?;
    write_atomic(path, json.as_bytes())
}

/// Read a JSON file, returning `None` when it does not exist.
pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(HelpSyncError::io(path, e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| HelpSyncError::Storage(format!("corrupt {}: {e}", path.display())))
}

/// Persist the summary of the last upload batch.
pub fn save_upload_summary(path: &Path, summary: &UploadSummary) -> Result<()> {
    save_json(path, summary)?;
    tracing::debug!(path = %path.display(), files = summary.total_files, "saved upload summary");
    Ok(())
}
