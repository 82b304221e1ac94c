// Document loading for the local knowledge base
// Plain text and Markdown are indexed; other files are skipped.

use crate::types::AppResult;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

#[derive(Debug, Clone)]
pub struct Document {
    pub source: String,
    pub text: String,
}

pub struct DocumentProcessor;

impl DocumentProcessor {
    /// Load every supported file directly under `dir`, sorted by file name.
    pub async fn load_directory(dir: &Path) -> AppResult<Vec<Document>> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && Self::is_supported(&path) {
                paths.push(path);
            } else {
                debug!(path = %path.display(), "Skipping unsupported entry");
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            documents.push(Self::process_document(&path).await?);
        }

        info!(dir = %dir.display(), count = documents.len(), "Loaded documents");
        Ok(documents)
    }

    pub async fn process_document(path: &Path) -> AppResult<Document> {
        let text = fs::read_to_string(path).await?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Document { source, text })
    }

    fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    }
}
