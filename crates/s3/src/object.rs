//! Object metadata returned by the filesystem-style operations

use jiff::Timestamp;

/// A file (object) or directory (common prefix) in a bucket listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    /// Size in bytes; `None` for directories
    pub size_bytes: Option<i64>,
    pub is_dir: bool,
    pub last_modified: Option<Timestamp>,
    /// ETag without surrounding quotes
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub storage_class: Option<String>,
}

impl ObjectInfo {
    pub fn file(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            is_dir: false,
            last_modified: None,
            etag: None,
            content_type: None,
            storage_class: None,
        }
    }

    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size_bytes: None,
            is_dir: true,
            last_modified: None,
            etag: None,
            content_type: None,
            storage_class: None,
        }
    }
}

pub(crate) fn timestamp(dt: &aws_smithy_types::DateTime) -> Option<Timestamp> {
    Timestamp::from_second(dt.secs()).ok()
}

pub(crate) fn clean_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}
