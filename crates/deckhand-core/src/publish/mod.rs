//! Shipping snapshots and document bytes to the backend.
//!
//! - [`snapshot`]: `SnapshotTransport`, `publish_snapshot()`, `publish_per_slide()`
//! - [`upload`]  : `DocumentFileSource`, `DocumentUploader`, `upload_document()`
//! - [`error`]   : `TransportError` / `TransportResult`

pub mod error;
pub mod snapshot;
pub mod upload;

pub use error::{TransportError, TransportResult};
pub use snapshot::{
    publish_per_slide, publish_snapshot, PublishOutcome, SnapshotDestination, SnapshotPayload,
    SnapshotTransport,
};
pub use upload::{
    assemble_document, upload_document, DocumentFileSource, DocumentUpload, DocumentUploader,
    FsDocumentFile, DEFAULT_SLICE_SIZE, PPTX_MIME,
};
