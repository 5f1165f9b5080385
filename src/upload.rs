//! Uploaded file parts of a request.

use axum::body::Bytes;
use std::collections::HashMap;

/// One uploaded file field.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied filename; `None` when the part carried none.
    pub filename: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: Some(filename.into()),
            bytes: bytes.into(),
        }
    }

    pub fn filename(&self) -> &str {
        self.filename.as_deref().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// File parts keyed by form field name.
#[derive(Debug, Clone, Default)]
pub struct UploadedParts {
    parts: HashMap<String, Upload>,
}

impl UploadedParts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a part. A repeated field name keeps the first occurrence.
    pub fn insert(&mut self, field: impl Into<String>, upload: Upload) {
        self.parts.entry(field.into()).or_insert(upload);
    }

    pub fn with(mut self, field: impl Into<String>, upload: Upload) -> Self {
        self.insert(field, upload);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Upload> {
        self.parts.get(field)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
