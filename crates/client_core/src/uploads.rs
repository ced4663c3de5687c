use std::{fmt, path::Path, sync::Arc};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::validation::validate_upload;

/// One image selected for analysis.
#[derive(Clone)]
pub struct UploadItem {
    filename: String,
    size_bytes: u64,
    mime_type: String,
    payload: Arc<[u8]>,
}

impl UploadItem {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            size_bytes: payload.len() as u64,
            mime_type: mime_type.into(),
            payload: payload.into(),
        }
    }

    /// Reads a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let payload = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(filename, mime_type, payload))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

impl fmt::Debug for UploadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadItem")
            .field("filename", &self.filename)
            .field("size_bytes", &self.size_bytes)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("'{filename}' is not an image (type '{mime_type}')")]
    NotAnImage { filename: String, mime_type: String },
    #[error("'{filename}' is {size_bytes} bytes, above the 5 MiB limit")]
    TooLarge { filename: String, size_bytes: u64 },
}

impl UploadRejection {
    pub fn user_message(&self) -> &'static str {
        match self {
            UploadRejection::NotAnImage { .. } => "Please upload only image files.",
            UploadRejection::TooLarge { .. } => "One or more files exceed the 5MB size limit.",
        }
    }
}

/// Ordered images admitted into a wizard session.
#[derive(Debug, Clone, Default)]
pub struct UploadSet {
    items: Vec<UploadItem>,
}

impl UploadSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a batch as a unit: a single bad file rejects the whole batch
    /// and leaves the set unchanged. Type is checked across the batch before
    /// size. Returns the number of items added.
    pub fn admit(&mut self, batch: Vec<UploadItem>) -> Result<usize, UploadRejection> {
        if let Some(item) = batch.iter().find(|item| !item.is_image()) {
            return Err(UploadRejection::NotAnImage {
                filename: item.filename.clone(),
                mime_type: item.mime_type.clone(),
            });
        }
        for item in &batch {
            validate_upload(item)?;
        }

        let added = batch.len();
        self.items.extend(batch);
        Ok(added)
    }

    pub fn remove(&mut self, index: usize) -> Option<UploadItem> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn filenames(&self) -> Vec<&str> {
        self.items.iter().map(UploadItem::filename).collect()
    }
}
