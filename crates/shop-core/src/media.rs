//! # Media Export
//!
//! File-backed media store serving item attachments from a media root.

use crate::error::{ShopError, ShopResult};
use crate::item::MediaFile;
use crate::services::MediaService;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};

/// An exported file ready to be sent to the client
#[derive(Debug, Clone)]
pub struct MediaExport {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Serves files relative to a root directory
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored path below the root; absolute paths and `..` are refused
    fn resolve(&self, relative: &str) -> ShopResult<PathBuf> {
        let relative = Path::new(relative.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ShopError::InvalidRequest(format!(
                "Media path escapes root: {}",
                relative.display()
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaService for LocalMediaStore {
    #[instrument(skip(self, file), fields(file_id = file.id))]
    async fn export(&self, file: &MediaFile) -> ShopResult<MediaExport> {
        let path = self.resolve(&file.path)?;
        debug!("Exporting media file from {}", path.display());

        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ShopError::FileNotFound { file_id: file.id },
            _ => ShopError::Storage(format!("Failed to read {}: {}", path.display(), e)),
        })?;

        let filename = Path::new(&file.path)
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .unwrap_or_else(|| file.name.clone());

        Ok(MediaExport {
            filename,
            mime: file.mime.clone(),
            bytes,
        })
    }
}
