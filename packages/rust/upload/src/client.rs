//! Files API client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use helpsync_shared::{ChunkedUpload, HelpSyncError, Result, UploadConfig, UploadSummary};

use crate::chunk::chunk_content;

/// User-Agent string for upload requests.
const USER_AGENT: &str = concat!("helpsync/", env!("CARGO_PKG_VERSION"));

/// File object returned by `POST /files`.
#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
}

/// Uploads whole documents to an OpenAI-compatible `/files` endpoint.
pub struct FilesClient {
    client: Client,
    files_url: String,
    api_key: String,
    purpose: String,
    max_chunk_size: usize,
    upload_delay: Duration,
}

impl FilesClient {
    /// Create a client from the `[upload]` config section and a resolved key.
    pub fn new(config: &UploadConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HelpSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            files_url: format!("{}/files", config.api_base_url.trim_end_matches('/')),
            api_key,
            purpose: config.purpose.clone(),
            max_chunk_size: config.max_chunk_size.max(1),
            upload_delay: Duration::from_millis(config.upload_delay_ms),
        })
    }

    /// Pause callers should take between consecutive uploads.
    pub fn upload_delay(&self) -> Duration {
        self.upload_delay
    }

    /// Upload one file. Returns `None` on any I/O, transport, or API error.
    ///
    /// The chunk count is computed locally for reporting; the file is always
    /// sent whole.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn upload(&self, path: &Path) -> Option<ChunkedUpload> {
        match self.try_upload(path).await {
            Ok(upload) => {
                info!(
                    file_id = %upload.file_id,
                    chunks = upload.chunks,
                    size = upload.size,
                    "uploaded"
                );
                Some(upload)
            }
            Err(e) => {
                warn!(error = %e, "upload failed");
                None
            }
        }
    }

    /// Upload `paths` one after another, pausing between files.
    ///
    /// A failed file is counted and the batch continues.
    #[instrument(skip_all, fields(files = paths.len()))]
    pub async fn upload_all(&self, paths: &[PathBuf]) -> UploadSummary {
        let mut summary = UploadSummary::default();

        for (i, path) in paths.iter().enumerate() {
            if i > 0 && !self.upload_delay.is_zero() {
                tokio::time::sleep(self.upload_delay).await;
            }
            summary = match self.upload(path).await {
                Some(upload) => summary.with_upload(upload),
                None => summary.with_failure(),
            };
        }

        info!(
            uploaded = summary.total_files,
            failed = summary.failed,
            chunks = summary.total_chunks,
            "upload batch complete"
        );
        summary
    }

    async fn try_upload(&self, path: &Path) -> Result<ChunkedUpload> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| HelpSyncError::validation(format!("not a file: {}", path.display())))?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| HelpSyncError::io(path, e))?;

        let (chunks, size) = {
            let content = String::from_utf8_lossy(&bytes);
            (
                chunk_content(&content, self.max_chunk_size).len(),
                content.chars().count(),
            )
        };
        debug!(chunks, size, "split into chunks");

        let part = Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str("text/markdown")
            .map_err(|e| HelpSyncError::Upload(format!("{filename}: {e}")))?;
        let form = Form::new()
            .text("purpose", self.purpose.clone())
            .part("file", part);

        let response = self
            .client
            .post(&self.files_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| HelpSyncError::Network(format!("{}: {e}", self.files_url)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HelpSyncError::Upload(format!(
                "{filename}: HTTP {status}: {body}"
            )));
        }

        let file: FileObject = response
            .json()
            .await
            .map_err(|e| HelpSyncError::parse(format!("{filename}: invalid file object: {e}")))?;

        Ok(ChunkedUpload {
            file_id: file.id,
            filename,
            chunks,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> UploadConfig {
        UploadConfig {
            api_base_url: format!("{}/v1/", server.uri()),
            max_chunk_size: 10,
            upload_delay_ms: 0,
            ..UploadConfig::default()
        }
    }

    fn write_temp(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("helpsync-upload-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join(name);
        std::fs::write(&file, content).unwrap();
        (dir, file)
    }

    #[tokio::test]
    async fn upload_sends_whole_file_and_counts_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/files"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_string_contains("assistants"))
            .and(body_string_contains("second line here"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": "file-123", "object": "file" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (dir, file) = write_temp("guide.md", "# Guide\n\nfirst line\nsecond line here");
        let client = FilesClient::new(&test_config(&server), "test-key".into()).unwrap();

        let upload = client.upload(&file).await.expect("upload succeeds");
        assert_eq!(upload.file_id, "file-123");
        assert_eq!(upload.filename, "guide.md");
        assert_eq!(upload.chunks, 3);
        assert_eq!(upload.size, 36);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn upload_api_error_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/files"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let (dir, file) = write_temp("a.md", "# A\n\nbody");
        let client = FilesClient::new(&test_config(&server), "bad".into()).unwrap();
        assert!(client.upload(&file).await.is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn upload_missing_file_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "x" })))
            .expect(0)
            .mount(&server)
            .await;

        let client = FilesClient::new(&test_config(&server), "k".into()).unwrap();
        let missing = std::env::temp_dir().join("helpsync-definitely-missing.md");
        assert!(client.upload(&missing).await.is_none());
    }

    #[tokio::test]
    async fn upload_all_counts_failures_and_continues() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/files"))
            .and(body_string_contains("broken body"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "file-ok" })))
            .mount(&server)
            .await;

        let (dir, first) = write_temp("first.md", "# First\n\nok");
        let second = dir.join("second.md");
        std::fs::write(&second, "# Second\n\nbroken body").unwrap();
        let third = dir.join("third.md");
        std::fs::write(&third, "# Third\n\nalso ok").unwrap();

        let client = FilesClient::new(&test_config(&server), "k".into()).unwrap();
        let summary = client.upload_all(&[first, second, third]).await;

        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.files.len(), 2);
        assert_eq!(summary.files[1].filename, "third.md");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn upload_malformed_response_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let (dir, file) = write_temp("b.md", "# B");
        let client = FilesClient::new(&test_config(&server), "k".into()).unwrap();
        assert!(client.upload(&file).await.is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
