//! Filesystem-backed attachment store
//!
//! Entries are written under a staging directory keyed by a generated
//! UUID, so user-supplied filenames never determine on-disk paths and
//! identically named files cannot overwrite each other.

use crate::attachments::{AttachmentRef, AttachmentStore};
use crate::error::{OzetteError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Attachment store writing entries to a local directory
///
/// # Examples
///
/// ```no_run
/// use ozette::attachments::FsAttachmentStore;
///
/// let store = FsAttachmentStore::default_location().unwrap();
/// ```
pub struct FsAttachmentStore {
    directory: PathBuf,
}

impl FsAttachmentStore {
    /// Create a store rooted at the given directory
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Create a store under the per-user data directory
    pub fn default_location() -> Result<Self> {
        let proj_dirs = directories::ProjectDirs::from("com", "xbcsmith", "ozette")
            .ok_or_else(|| OzetteError::Attachment("could not determine data directory".into()))?;
        Ok(Self::new(proj_dirs.data_dir().join("uploads")))
    }

    /// The staging directory this store writes into
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, locator: &str) -> PathBuf {
        self.directory.join(locator)
    }
}

#[async_trait]
impl AttachmentStore for FsAttachmentStore {
    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<AttachmentRef> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let path = self.entry_path(&id);
        tokio::fs::write(&path, bytes).await?;

        let kind = name
            .rsplit('.')
            .next()
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        tracing::debug!(%id, file = %name, size = bytes.len(), "stored attachment");

        Ok(AttachmentRef {
            id: id.clone(),
            display_name: name.to_string(),
            byte_size: bytes.len() as u64,
            kind,
            locator: id,
        })
    }

    async fn read(&self, locator: &str) -> Result<Vec<u8>> {
        let bytes = tokio::fs::read(self.entry_path(locator)).await?;
        Ok(bytes)
    }

    async fn delete(&self, locator: &str) -> Result<()> {
        tokio::fs::remove_file(self.entry_path(locator)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAttachmentStore::new(dir.path());

        let attachment = store.upload("notes.txt", b"hello world").await.unwrap();
        assert_eq!(attachment.display_name, "notes.txt");
        assert_eq!(attachment.kind, "txt");
        assert_eq!(attachment.byte_size, 11);

        let bytes = store.read(&attachment.locator).await.unwrap();
        assert_eq!(bytes, b"hello world");
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAttachmentStore::new(dir.path());

        let attachment = store.upload("tmp.md", b"bye").await.unwrap();
        store.delete(&attachment.locator).await.unwrap();

        assert!(store.read(&attachment.locator).await.is_err());
    }

    #[tokio::test]
    async fn test_read_unknown_locator_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAttachmentStore::new(dir.path());
        assert!(store.read("no-such-entry").await.is_err());
    }

    #[tokio::test]
    async fn test_uploads_are_keyed_by_generated_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAttachmentStore::new(dir.path());

        let first = store.upload("same.txt", b"one").await.unwrap();
        let second = store.upload("same.txt", b"two").await.unwrap();

        assert_ne!(first.locator, second.locator);
        assert_eq!(store.read(&first.locator).await.unwrap(), b"one");
        assert_eq!(store.read(&second.locator).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_upload_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep").join("uploads");
        let store = FsAttachmentStore::new(&nested);

        store.upload("a.txt", b"x").await.unwrap();
        assert!(nested.exists());
    }
}
