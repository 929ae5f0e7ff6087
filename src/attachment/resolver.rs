//! Resolves attachment references into concrete bytes.

use std::sync::Arc;

use crate::template::TemplateStore;

use super::blob::BlobStore;
use super::{AttachmentError, AttachmentResult};

/// An attachment with its content resolved, ready for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Resolves a template's attachment references against the blob store.
pub struct AttachmentResolver {
    store: Arc<TemplateStore>,
    blobs: Arc<dyn BlobStore>,
}

impl AttachmentResolver {
    pub fn new(store: Arc<TemplateStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Resolve every attachment reference of a template, ordered by
    /// filename.
    ///
    /// Fails on the first reference whose content key has no blob, so
    /// nothing is handed to the transport with attachments missing.
    pub async fn resolve(&self, template_id: &str) -> AttachmentResult<Vec<ResolvedAttachment>> {
        let refs = self.store.attachments_for(template_id);
        let mut resolved = Vec::with_capacity(refs.len());

        for attachment in refs {
            let bytes = self.blobs.get(&attachment.content_key).await.ok_or(
                AttachmentError::AttachmentMissing {
                    filename: attachment.filename.clone(),
                    content_key: attachment.content_key.clone(),
                },
            )?;

            resolved.push(ResolvedAttachment {
                filename: attachment.filename,
                mime_type: attachment.mime_type,
                bytes,
            });
        }

        Ok(resolved)
    }
}
