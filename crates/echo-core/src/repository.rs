//! Entry repository — one directory per entry, one file per field.
//!
//! Every operation is best-effort with no rollback. A crash between writes
//! can leave an entry with some fields missing; readers treat that as a
//! normal state, not corruption.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::ids::EntryId;
use crate::types::EntryField;

/// Durable per-entry field storage. The filesystem backing is one
/// implementation; anything keyed by `EntryId` can stand in for it.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Create the entry if absent. Existing fields are left untouched.
    async fn create_entry(&self, id: EntryId) -> bool;

    async fn entry_exists(&self, id: EntryId) -> bool;

    /// Overwrite one field. Fails (returns false) if the entry does not exist.
    async fn write_field(&self, id: EntryId, field: EntryField, value: &str) -> bool;

    /// The field's value, or `None` when it is absent or unreadable.
    async fn read_field(&self, id: EntryId, field: EntryField) -> Option<String>;

    /// Raw names of every stored entry, unordered and unparsed.
    async fn list_entry_ids(&self) -> Vec<String>;

    /// Remove the entry. Deleting a missing entry is a successful no-op.
    async fn delete_entry(&self, id: EntryId) -> bool;

    /// Remove every entry.
    async fn clear_all(&self) -> bool;

    /// Relocate `source` into the entry under `dest_name`.
    async fn move_binary(
        &self,
        source: &Path,
        id: EntryId,
        dest_name: &str,
    ) -> Result<PathBuf, StoreError>;

    /// Conventional location of a blob inside the entry, whether or not it exists.
    fn binary_path(&self, id: EntryId, name: &str) -> PathBuf;
}

/// Filesystem-backed repository rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FsEntryRepository {
    root: PathBuf,
}

impl FsEntryRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, id: EntryId) -> PathBuf {
        self.root.join(id.to_string())
    }

    fn field_path(&self, id: EntryId, field: EntryField) -> PathBuf {
        self.entry_dir(id).join(field.file_name())
    }

    async fn is_dir(path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}

#[async_trait]
impl EntryRepository for FsEntryRepository {
    async fn create_entry(&self, id: EntryId) -> bool {
        let dir = self.entry_dir(id);
        if Self::is_dir(&dir).await {
            debug!("Entry {} already exists", id);
            return true;
        }
        match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => {
                info!("Created entry {}", id);
                true
            }
            Err(e) => {
                error!("Failed to create entry directory {}: {}", dir.display(), e);
                false
            }
        }
    }

    async fn entry_exists(&self, id: EntryId) -> bool {
        Self::is_dir(&self.entry_dir(id)).await
    }

    async fn write_field(&self, id: EntryId, field: EntryField, value: &str) -> bool {
        let dir = self.entry_dir(id);
        if !Self::is_dir(&dir).await {
            warn!("Refusing to write {} for missing entry {}", field, id);
            return false;
        }
        let path = self.field_path(id, field);
        match tokio::fs::write(&path, value).await {
            Ok(()) => {
                debug!("Wrote {} for entry {} ({} bytes)", field, id, value.len());
                true
            }
            Err(e) => {
                error!("Failed to write {}: {}", path.display(), e);
                false
            }
        }
    }

    async fn read_field(&self, id: EntryId, field: EntryField) -> Option<String> {
        let path = self.field_path(id, field);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No {} for entry {}", field, id);
                None
            }
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn list_entry_ids(&self) -> Vec<String> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Storage root {} does not exist yet", self.root.display());
                return Vec::new();
            }
            Err(e) => {
                error!("Failed to list {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut names = Vec::new();
        loop {
            match dir.next_entry().await {
                Ok(Some(entry)) => {
                    let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                    if !is_dir {
                        continue;
                    }
                    if let Some(name) = entry.file_name().to_str() {
                        names.push(name.to_string());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Error while listing {}: {}", self.root.display(), e);
                    break;
                }
            }
        }
        names
    }

    async fn delete_entry(&self, id: EntryId) -> bool {
        let dir = self.entry_dir(id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!("Deleted entry {}", id);
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Entry {} already absent", id);
                true
            }
            Err(e) => {
                error!("Failed to delete {}: {}", dir.display(), e);
                false
            }
        }
    }

    async fn clear_all(&self) -> bool {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                info!("Cleared all entries under {}", self.root.display());
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                error!("Failed to clear {}: {}", self.root.display(), e);
                false
            }
        }
    }

    async fn move_binary(
        &self,
        source: &Path,
        id: EntryId,
        dest_name: &str,
    ) -> Result<PathBuf, StoreError> {
        let plain_name = !dest_name.is_empty()
            && dest_name != ".."
            && !dest_name.contains(|c: char| c == '/' || c == '\\');
        if !plain_name {
            return Err(StoreError::InvariantViolation(format!(
                "blob name {:?} must be a plain file name",
                dest_name
            )));
        }
        if !self.entry_exists(id).await {
            return Err(StoreError::InvariantViolation(format!(
                "cannot move a blob into entry {} before it is created",
                id
            )));
        }

        let dest = self.binary_path(id, dest_name);
        match tokio::fs::rename(source, &dest).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Io {
                    op: "move",
                    path: source.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                // rename cannot cross filesystems; fall back to copy + remove
                debug!("rename failed ({}), copying {} instead", e, source.display());
                tokio::fs::copy(source, &dest)
                    .await
                    .map_err(|source_err| StoreError::Io {
                        op: "copy",
                        path: dest.clone(),
                        source: source_err,
                    })?;
                if let Err(e) = tokio::fs::remove_file(source).await {
                    warn!("Copied {} but could not remove it: {}", source.display(), e);
                }
            }
        }
        info!("Moved {} into entry {}", source.display(), id);
        Ok(dest)
    }

    fn binary_path(&self, id: EntryId, name: &str) -> PathBuf {
        self.entry_dir(id).join(name)
    }
}
