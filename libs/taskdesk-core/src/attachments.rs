//! On-disk storage for files attached to tasks
//!
//! A stored file is identified by a reference of the form
//! `<owner id>/<random id>_<cleaned name>`, relative to the store root. The
//! reference is what a task's `file` field records.

use crate::error::{Result, TaskdeskError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use taskdesk_common::MAX_UPLOAD_NAME_LENGTH;
use tracing::{debug, info, warn};
use uuid::Uuid;

const FALLBACK_NAME: &str = "file";

/// Attachment files kept under a root directory, one subdirectory per owner
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` for `owner` and return the new reference
    ///
    /// # Errors
    ///
    /// Returns an error if the owner directory or the file cannot be written
    pub async fn save(&self, owner: Uuid, original_name: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.root.join(owner.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}_{}", Uuid::new_v4().simple(), clean_file_name(original_name));
        tokio::fs::write(dir.join(&name), bytes).await?;

        let reference = format!("{owner}/{name}");
        info!(%owner, reference = %reference, size = bytes.len(), "Stored attachment");
        Ok(reference)
    }

    /// Read the file behind `reference`, which must belong to `owner`
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` when the reference belongs to someone else or
    /// the file is gone, and `Validation` for a malformed reference
    pub async fn read(&self, owner: Uuid, reference: &str) -> Result<Vec<u8>> {
        let (dir, _) = split_reference(reference)?;
        if dir != owner.to_string() {
            return Err(TaskdeskError::task_not_found(reference));
        }

        match tokio::fs::read(self.root.join(reference)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(reference = %reference, "Attachment missing from disk");
                Err(TaskdeskError::task_not_found(reference))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the file behind `reference`
    ///
    /// A file that is already gone is not an error. Other failures are
    /// logged, the task row is the source of truth.
    pub async fn remove(&self, reference: &str) {
        if split_reference(reference).is_err() {
            warn!(reference = %reference, "Refusing to remove malformed attachment reference");
            return;
        }
        match tokio::fs::remove_file(self.root.join(reference)).await {
            Ok(()) => debug!(reference = %reference, "Removed attachment"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(reference = %reference, error = %e, "Failed to remove attachment"),
        }
    }

    /// Delete every file stored for `owner`
    pub async fn remove_owner(&self, owner: Uuid) {
        match tokio::fs::remove_dir_all(self.root.join(owner.to_string())).await {
            Ok(()) => info!(%owner, "Removed attachments"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(%owner, error = %e, "Failed to remove attachments"),
        }
    }
}

/// Filename to offer when the attachment is downloaded
#[must_use]
pub fn download_name(reference: &str) -> &str {
    let file = reference.rsplit('/').next().unwrap_or(reference);
    match file.split_once('_') {
        Some((_, name)) if !name.is_empty() => name,
        _ => file,
    }
}

fn split_reference(reference: &str) -> Result<(&str, &str)> {
    let invalid = || TaskdeskError::validation(format!("Invalid file reference: {reference}"));
    let (dir, file) = reference.split_once('/').ok_or_else(invalid)?;

    let well_formed = Uuid::parse_str(dir).is_ok()
        && !file.is_empty()
        && !file.starts_with('.')
        && file.chars().all(is_name_char);
    if well_formed {
        Ok((dir, file))
    } else {
        Err(invalid())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Reduce a client-supplied filename to a safe single path component
fn clean_file_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if is_name_char(c) { c } else { '_' })
        .take(MAX_UPLOAD_NAME_LENGTH)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
