//! Document identity from content

use sha2::{Digest, Sha256};
use smartstudy_domain::DocumentMeta;

/// Compute the lowercase hex SHA-256 of document bytes
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Build metadata for an uploaded document, keyed by its content hash
///
/// The same bytes always yield the same id, so re-uploading a file reopens
/// its session.
pub fn document_meta(bytes: &[u8], name: &str, last_modified: u64, mime_type: &str) -> DocumentMeta {
    DocumentMeta::new(
        content_hash(bytes),
        name,
        bytes.len() as u64,
        last_modified,
        mime_type,
    )
}
