//! Shared types, error model, and configuration for helpsync.
//!
//! This crate is the foundation depended on by all other helpsync crates.
//! It provides:
//! - [`HelpSyncError`]: the unified error type
//! - Domain types ([`ArticleRef`], [`Document`], [`SyncStats`], [`JobLogEntry`])
//! - Configuration ([`AppConfig`], config loading, credential checks)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, SourceConfig, StorageConfig, UploadConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key, validate_api_key,
};
pub use error::{HelpSyncError, Result};
pub use types::{
    ArticleId, ArticleRef, ChunkedUpload, Document, JobLogEntry, SyncStats, UploadSummary,
    disambiguated_filename, document_filename, slugify,
};
