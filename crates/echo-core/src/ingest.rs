//! Recording ingestion — moves a transient capture into its entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::error::StoreError;
use crate::ids::EntryId;
use crate::repository::EntryRepository;
use crate::types::RECORDING_FILENAME;

/// Resolve a caller-supplied recording path against the upload directory.
///
/// Relative paths are taken relative to `upload_dir`. Symlinks and `..` are
/// resolved first, so the result is a regular file strictly inside
/// `upload_dir` or an error. Nothing is moved here.
pub async fn staged_source(upload_dir: &Path, candidate: &Path) -> Result<PathBuf, StoreError> {
    let root = tokio::fs::canonicalize(upload_dir)
        .await
        .map_err(|e| StoreError::Io {
            op: "resolve",
            path: upload_dir.to_path_buf(),
            source: e,
        })?;
    let full = root.join(candidate);
    let real = tokio::fs::canonicalize(&full)
        .await
        .map_err(|e| StoreError::Io {
            op: "resolve",
            path: full.clone(),
            source: e,
        })?;

    if real == root || !real.starts_with(&root) {
        warn!("Blocked recording outside {}: {}", root.display(), full.display());
        return Err(StoreError::RejectedSource {
            path: full,
            reason: "outside the upload directory",
        });
    }
    let is_file = tokio::fs::metadata(&real)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(StoreError::RejectedSource {
            path: full,
            reason: "not a regular file",
        });
    }
    Ok(real)
}

pub struct RecordingIngestor {
    repo: Arc<dyn EntryRepository>,
}

impl RecordingIngestor {
    pub fn new(repo: Arc<dyn EntryRepository>) -> Self {
        Self { repo }
    }

    /// Canonical location of an entry's recording.
    pub fn destination(&self, id: EntryId) -> PathBuf {
        self.repo.binary_path(id, RECORDING_FILENAME)
    }

    /// Move `source` to the entry's recording slot. The entry must already
    /// exist; the source is gone afterwards.
    pub async fn ingest(&self, source: &Path, id: EntryId) -> Result<PathBuf, StoreError> {
        self.repo.move_binary(source, id, RECORDING_FILENAME).await
    }
}
