//! Uploading the raw document file.
//!
//! The host hands the file out in fixed-size slices; they are reassembled in
//! index order, base64-encoded and posted as one JSON payload.

use std::io::SeekFrom;
use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

use super::error::{TransportError, TransportResult};

pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Default slice size used when reading a document file.
pub const DEFAULT_SLICE_SIZE: usize = 64 * 1024;

/// A document file readable slice by slice.
#[async_trait]
pub trait DocumentFileSource: Send + Sync {
    async fn slice_count(&self) -> std::io::Result<usize>;
    async fn slice(&self, index: usize) -> std::io::Result<Vec<u8>>;
}

/// Read every slice and concatenate them in index order.
pub async fn assemble_document(source: &dyn DocumentFileSource) -> std::io::Result<Vec<u8>> {
    let count = source.slice_count().await?;
    let mut bytes = Vec::new();
    for index in 0..count {
        let slice = source.slice(index).await?;
        bytes.extend_from_slice(&slice);
    }
    debug!(slices = count, bytes = bytes.len(), "document file assembled");
    Ok(bytes)
}

/// A document file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsDocumentFile {
    path: PathBuf,
    slice_size: usize,
}

impl FsDocumentFile {
    pub fn new(path: impl Into<PathBuf>, slice_size: usize) -> Self {
        Self {
            path: path.into(),
            slice_size: slice_size.max(1),
        }
    }
}

#[async_trait]
impl DocumentFileSource for FsDocumentFile {
    async fn slice_count(&self) -> std::io::Result<usize> {
        let len = tokio::fs::metadata(&self.path).await?.len() as usize;
        Ok(len.div_ceil(self.slice_size))
    }

    async fn slice(&self, index: usize) -> std::io::Result<Vec<u8>> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start((index * self.slice_size) as u64))
            .await?;
        let mut buf = Vec::with_capacity(self.slice_size);
        file.take(self.slice_size as u64).read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

/// Wire payload for a document upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub filename: String,
    pub filetype: String,
    pub created_at: DateTime<Utc>,
    pub base64: String,
}

impl DocumentUpload {
    pub fn new(filename: impl Into<String>, filetype: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            filename: filename.into(),
            filetype: filetype.into(),
            created_at: Utc::now(),
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Accepts raw document uploads.
#[async_trait]
pub trait DocumentUploader: Send + Sync {
    async fn upload_document(&self, upload: &DocumentUpload) -> TransportResult<serde_json::Value>;
}

/// Assemble the file from `source` and upload it.
pub async fn upload_document(
    source: &dyn DocumentFileSource,
    uploader: &dyn DocumentUploader,
    filename: &str,
    filetype: &str,
) -> TransportResult<serde_json::Value> {
    let bytes = assemble_document(source).await?;
    if bytes.is_empty() {
        return Err(TransportError::Source("document file is empty".into()));
    }
    let upload = DocumentUpload::new(filename, filetype, &bytes);
    let response = uploader.upload_document(&upload).await?;
    info!(event = "document.uploaded", filename = %filename, bytes = bytes.len());
    Ok(response)
}
