//! Uploaded image attachments
//!
//! Each image gets a preview copy in a temporary file. The copy is deleted
//! as soon as the attachment is removed or the set is cleared, so a long
//! session does not accumulate preview files.

use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// One attached image and its preview handle
#[derive(Debug)]
pub struct ImageAttachment {
    /// Path the user attached
    pub source: PathBuf,
    preview: NamedTempFile,
}

impl ImageAttachment {
    /// Location of the transient preview copy
    pub fn preview_path(&self) -> &Path {
        self.preview.path()
    }
}

/// Ordered set of image attachments
#[derive(Debug, Default)]
pub struct Attachments {
    images: Vec<ImageAttachment>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an image, creating its preview copy
    pub fn add_image(&mut self, path: impl AsRef<Path>) -> std::io::Result<&ImageAttachment> {
        let source = path.as_ref().to_path_buf();
        let suffix = source
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let preview = tempfile::Builder::new()
            .prefix("agentflow-preview-")
            .suffix(&suffix)
            .tempfile()?;
        std::fs::copy(&source, preview.path())?;
        debug!(source = %source.display(), preview = %preview.path().display(), "Attached image");

        self.images.push(ImageAttachment { source, preview });
        Ok(&self.images[self.images.len() - 1])
    }

    /// Remove an attachment and release its preview file
    pub fn remove(&mut self, index: usize) -> Option<PathBuf> {
        if index >= self.images.len() {
            return None;
        }
        let attachment = self.images.remove(index);
        debug!(source = %attachment.source.display(), "Released image preview");
        Some(attachment.source)
    }

    /// Release every preview file
    pub fn clear(&mut self) {
        self.images.clear();
    }

    pub fn images(&self) -> &[ImageAttachment] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
