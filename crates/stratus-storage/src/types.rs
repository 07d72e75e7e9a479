//! Blob descriptors shared by listing and tag queries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tag key → tag value. Values are always strings.
pub type Tags = BTreeMap<String, String>;

/// A blob's identity plus its full tag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobDescriptor {
    pub container: String,
    pub name: String,
    pub tags: Tags,
}

impl BlobDescriptor {
    pub fn new(container: impl Into<String>, name: impl Into<String>, tags: Tags) -> Self {
        Self {
            container: container.into(),
            name: name.into(),
            tags,
        }
    }
}
