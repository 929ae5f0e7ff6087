//! Attachment resolution: turns a template's attachment references into
//! concrete bytes before dispatch begins, so a missing blob is reported
//! as a resolution failure rather than a transport failure.

mod blob;
mod resolver;

pub use blob::{create_blob_store, BlobStore, MemoryBlobStore};
pub use resolver::{AttachmentResolver, ResolvedAttachment};

use thiserror::Error;

/// Attachment-domain error type
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Attachment content missing for '{filename}' (key: {content_key})")]
    AttachmentMissing {
        filename: String,
        content_key: String,
    },
}

/// Result type for attachment operations
pub type AttachmentResult<T> = Result<T, AttachmentError>;
