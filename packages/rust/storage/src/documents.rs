//! Document files in the data directory.

use std::path::{Path, PathBuf};

use tracing::debug;

use helpsync_shared::{Document, HelpSyncError, Result};

use crate::write_atomic;

/// Directory of `<slug>.md` files, one per document.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a document with `filename` is stored at.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Write `doc` under its filename. Returns the written path.
    pub fn write(&self, doc: &Document) -> Result<PathBuf> {
        self.write_as(&doc.filename(), doc)
    }

    /// Write `doc` under an explicit `filename`. Returns the written path.
    pub fn write_as(&self, filename: &str, doc: &Document) -> Result<PathBuf> {
        let path = self.path_for(filename);
        write_atomic(&path, doc.render().as_bytes())?;
        debug!(path = %path.display(), "saved document");
        Ok(path)
    }

    /// All `*.md` files in the data directory, sorted by name.
    ///
    /// A missing directory yields an empty list.
    pub fn list_markdown_files(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HelpSyncError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| HelpSyncError::io(&self.dir, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;

    #[test]
    fn write_uses_slug_and_header() {
        let dir = temp_dir("docs");
        let store = DocumentStore::new(&dir);
        let doc = Document {
            title: "How to Pair a Screen".into(),
            body: "Open the app.".into(),
        };

        let path = store.write(&doc).unwrap();
        assert_eq!(path, dir.join("how-to-pair-a-screen.md"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# How to Pair a Screen\n\nOpen the app."
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_as_uses_explicit_filename() {
        let dir = temp_dir("docs-as");
        let store = DocumentStore::new(&dir);
        let doc = Document {
            title: "FAQ".into(),
            body: "Second FAQ.".into(),
        };

        let path = store.write_as("faq-2.md", &doc).unwrap();
        assert_eq!(path, dir.join("faq-2.md"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# FAQ\n\nSecond FAQ.");
        assert!(!dir.join("faq.md").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn list_only_markdown_sorted() {
        let dir = temp_dir("list");
        let store = DocumentStore::new(&dir);
        for title in ["Zeta", "Alpha"] {
            store
                .write(&Document {
                    title: title.into(),
                    body: "x".into(),
                })
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let files = store.list_markdown_files().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alpha.md", "zeta.md"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let store = DocumentStore::new(temp_dir("absent"));
        assert!(store.list_markdown_files().unwrap().is_empty());
    }
}
