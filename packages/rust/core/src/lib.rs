//! Sync orchestration for helpsync.
//!
//! This crate ties the source client, normalizer, stores and uploader
//! together into one run: list → fetch → normalize → classify → write →
//! upload → log.

pub mod detect;
pub mod pipeline;

pub use detect::{ChangeStatus, Classification, classify, content_hash};
pub use pipeline::{
    FailureReason, ItemOutcome, JobState, ProgressReporter, RunMode, RunReport, SilentProgress,
    SyncJob, UploadSelection, WriteKind, files_client, run_sync, upload_directory,
};
