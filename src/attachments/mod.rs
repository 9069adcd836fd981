//! Single-use document attachments
//!
//! Uploaded files are staged for exactly one outgoing user turn: staging
//! uploads them to an [`AttachmentStore`], submission folds their content
//! into the request text, and release deletes the backing entries so
//! nothing accumulates as orphaned storage.

pub mod fs;

pub use fs::FsAttachmentStore;

use crate::config::AttachmentsConfig;
use crate::error::{OzetteError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Handle to an uploaded document staged for the next outgoing turn
///
/// Consumed exactly once; after release the backing storage entry is gone
/// and the ref never reappears on a later turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Generated storage identifier
    pub id: String,
    /// Original filename, for display and labeling only
    pub display_name: String,
    /// Size of the uploaded content in bytes
    pub byte_size: u64,
    /// Declared type tag (file extension)
    pub kind: String,
    /// Opaque locator understood by the store that produced this ref
    pub locator: String,
}

/// Abstract backing store for attachment content
///
/// Storage is keyed by a generated identifier, never by the user-supplied
/// filename, so two concurrently staged files with the same name cannot
/// collide.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Store `bytes` under a fresh identifier, returning the ref
    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<AttachmentRef>;

    /// Read back the full content for a locator
    async fn read(&self, locator: &str) -> Result<Vec<u8>>;

    /// Delete the entry behind a locator
    async fn delete(&self, locator: &str) -> Result<()>;
}

/// A file handed to the pipeline for staging
#[derive(Debug, Clone)]
pub struct StagedFile {
    /// Original filename
    pub name: String,
    /// Raw content
    pub bytes: Vec<u8>,
}

impl StagedFile {
    /// Read a file from disk into a stageable form
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| OzetteError::Attachment(format!("invalid file name: {:?}", path)))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { name, bytes })
    }
}

/// Per-file outcome report for a staging batch
///
/// Partial failures never abort the batch; failed files are reported here
/// alongside the refs that did stage.
#[derive(Debug, Default)]
pub struct StageReport {
    /// Refs for files that stored successfully, in input order
    pub staged: Vec<AttachmentRef>,
    /// (filename, reason) for files that were rejected or failed to store
    pub failed: Vec<(String, String)>,
}

/// Stages uploads for the next outgoing turn and resolves them at submit
///
/// The pending set is scoped to one conversation surface. Binding drains
/// it, so every attachment is eligible for exactly one turn.
pub struct AttachmentPipeline {
    store: Arc<dyn AttachmentStore>,
    config: AttachmentsConfig,
    pending: Vec<AttachmentRef>,
}

impl AttachmentPipeline {
    /// Create a pipeline over the given store
    pub fn new(store: Arc<dyn AttachmentStore>, config: AttachmentsConfig) -> Self {
        Self {
            store,
            config,
            pending: Vec::new(),
        }
    }

    /// Currently staged refs, in staging order
    pub fn pending(&self) -> &[AttachmentRef] {
        &self.pending
    }

    /// Upload a batch of files and add the successful ones to the pending set
    ///
    /// Each file is checked against the configured extension allow-list and
    /// size limit before upload. A failure is localized to its file.
    pub async fn stage(&mut self, files: Vec<StagedFile>) -> StageReport {
        let mut report = StageReport::default();

        for file in files {
            if let Err(reason) = self.check_file(&file) {
                tracing::warn!(file = %file.name, %reason, "rejected attachment");
                report.failed.push((file.name, reason));
                continue;
            }

            match self.store.upload(&file.name, &file.bytes).await {
                Ok(attachment) => {
                    tracing::debug!(file = %file.name, id = %attachment.id, "staged attachment");
                    self.pending.push(attachment.clone());
                    report.staged.push(attachment);
                }
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "attachment upload failed");
                    report.failed.push((file.name, e.to_string()));
                }
            }
        }

        report
    }

    /// Drain the pending set, binding its refs to the outgoing turn
    pub fn take_pending(&mut self) -> Vec<AttachmentRef> {
        std::mem::take(&mut self.pending)
    }

    /// Return refs to the pending set after a submit that never reached
    /// the transport, preserving their order
    pub fn restore_pending(&mut self, refs: Vec<AttachmentRef>) {
        let mut refs = refs;
        refs.extend(self.pending.drain(..));
        self.pending = refs;
    }

    /// Render bound attachments into labeled text blocks
    ///
    /// An attachment whose content cannot be read contributes nothing; the
    /// failure is logged, not fatal.
    pub async fn resolve(&self, refs: &[AttachmentRef]) -> String {
        let mut blocks = String::new();

        for attachment in refs {
            let bytes = match self.store.read(&attachment.locator).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(
                        id = %attachment.id,
                        error = %e,
                        "could not read attachment content; skipping"
                    );
                    continue;
                }
            };

            let content = String::from_utf8_lossy(&bytes);
            blocks.push_str(&format!(
                "\n\n[Attached file: {} ({}, {} bytes)]\n{}",
                attachment.display_name, attachment.kind, attachment.byte_size, content
            ));
        }

        blocks
    }

    /// Delete the backing storage for refs whose turn has been sent
    pub async fn release(&self, refs: &[AttachmentRef]) {
        for attachment in refs {
            if let Err(e) = self.store.delete(&attachment.locator).await {
                tracing::warn!(id = %attachment.id, error = %e, "failed to delete attachment");
            } else {
                tracing::debug!(id = %attachment.id, "released attachment");
            }
        }
    }

    fn check_file(&self, file: &StagedFile) -> std::result::Result<(), String> {
        if file.bytes.len() as u64 > self.config.max_file_bytes {
            return Err(format!(
                "exceeds the maximum size of {} bytes",
                self.config.max_file_bytes
            ));
        }

        let extension = file
            .name
            .rsplit('.')
            .next()
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !self.config.allowed_extensions.iter().any(|a| a == &extension) {
            return Err(format!("file type .{} is not supported", extension));
        }

        Ok(())
    }
}
