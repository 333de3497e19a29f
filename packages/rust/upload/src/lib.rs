//! Pushing documents to the indexing service.
//!
//! This crate provides:
//! - [`chunk_content`]: line-aligned chunking used for size reporting
//! - [`FilesClient`]: whole-file uploads to an OpenAI-compatible files API

mod chunk;
mod client;

pub use chunk::chunk_content;
pub use client::FilesClient;
