//! Local document parsing.
//!
//! Plain text and markdown only. PDF text extraction is not available and
//! is reported as an unsupported type like any other extension.

use std::collections::BTreeMap;
use std::path::Path;

use opentwin_core::{ExtractError, ExtractedDocument, SourceType};
use tracing::{info, warn};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file(&self, path: &Path) -> Result<ExtractedDocument, ExtractError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ExtractError::FileNotFound(path.to_path_buf()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ExtractError::UnsupportedFileType(format!(".{ext}")));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExtractError::ReadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(ExtractedDocument {
            title,
            source: path.display().to_string(),
            content,
            source_type: SourceType::File,
            metadata: BTreeMap::from([("extension".to_string(), ext)]),
        })
    }

    /// Parse several files, logging and skipping the ones that fail.
    pub async fn parse_many(&self, paths: &[&Path]) -> Vec<ExtractedDocument> {
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            info!("Parsing: {}", path.display());
            match self.parse_file(path).await {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping file"),
            }
        }
        documents
    }
}
