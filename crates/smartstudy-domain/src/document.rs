//! Document identity

use serde::{Deserialize, Serialize};

/// Default MIME type when the upload does not report one
pub const DEFAULT_MIME_TYPE: &str = "application/pdf";

/// Metadata describing an uploaded document
///
/// The `id` is the lowercase hex SHA-256 of the document bytes, so the same
/// file always maps to the same study session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    /// Content hash used as the session identifier
    pub id: String,

    /// File name as uploaded
    pub name: String,

    /// Size in bytes
    pub size: u64,

    /// Last-modified time reported by the upload (milliseconds since Unix epoch)
    pub last_modified: u64,

    /// MIME type
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

impl DocumentMeta {
    /// Create metadata for a document with a precomputed content hash
    ///
    /// An empty `mime_type` falls back to [`DEFAULT_MIME_TYPE`].
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        last_modified: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        let mime_type = mime_type.into();
        Self {
            id: id.into(),
            name: name.into(),
            size,
            last_modified,
            mime_type: if mime_type.is_empty() {
                default_mime_type()
            } else {
                mime_type
            },
        }
    }

    /// Display title, falling back when the upload had no name
    pub fn title(&self) -> &str {
        if self.name.trim().is_empty() {
            "Untitled PDF"
        } else {
            &self.name
        }
    }
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}
