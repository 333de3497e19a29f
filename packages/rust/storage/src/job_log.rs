//! Bounded execution history.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::debug;

use helpsync_shared::{JobLogEntry, Result};

use crate::{load_json, save_json};

/// FIFO ring of the most recent runs, oldest first.
#[derive(Debug, Clone)]
pub struct JobLog {
    path: PathBuf,
    capacity: usize,
    entries: VecDeque<JobLogEntry>,
}

impl JobLog {
    /// Load the log at `path`, keeping at most `capacity` newest entries.
    pub fn load(path: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let path = path.into();
        let capacity = capacity.max(1);
        let entries: Vec<JobLogEntry> = load_json(&path)?.unwrap_or_default();

        let mut log = Self {
            path,
            capacity,
            entries: entries.into(),
        };
        log.evict();
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry`, evicting the oldest entries past capacity.
    pub fn append(&mut self, entry: JobLogEntry) {
        self.entries.push_back(entry);
        self.evict();
    }

    /// Entries in chronological order.
    pub fn entries(&self) -> impl Iterator<Item = &JobLogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the whole log.
    pub fn save(&self) -> Result<()> {
        save_json(&self.path, &self.entries)?;
        debug!(path = %self.path.display(), entries = self.entries.len(), "saved job log");
        Ok(())
    }

    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;
    use helpsync_shared::SyncStats;

    fn entry(added: usize) -> JobLogEntry {
        JobLogEntry::now(SyncStats {
            added,
            ..SyncStats::default()
        })
    }

    #[test]
    fn keeps_thirty_most_recent_after_31_runs() {
        let dir = temp_dir("joblog");
        let path = dir.join("job_log.json");

        for run in 0..31 {
            let mut log = JobLog::load(&path, 30).unwrap();
            log.append(entry(run));
            log.save().unwrap();
        }

        let log = JobLog::load(&path, 30).unwrap();
        assert_eq!(log.len(), 30);
        let added: Vec<_> = log.entries().map(|e| e.stats.added).collect();
        assert_eq!(added, (1..31).collect::<Vec<_>>());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_trims_oversized_log() {
        let dir = temp_dir("joblog-trim");
        let path = dir.join("job_log.json");

        let mut log = JobLog::load(&path, 10).unwrap();
        for run in 0..10 {
            log.append(entry(run));
        }
        log.save().unwrap();

        let smaller = JobLog::load(&path, 3).unwrap();
        let added: Vec<_> = smaller.entries().map(|e| e.stats.added).collect();
        assert_eq!(added, vec![7, 8, 9]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_log_is_empty() {
        let log = JobLog::load(temp_dir("joblog-missing").join("job_log.json"), 30).unwrap();
        assert!(log.is_empty());
    }
}
