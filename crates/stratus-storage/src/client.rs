//! Container- and blob-scoped handles over a [`BlobStore`].
//!
//! These mirror the shape handler code expects from a cloud storage SDK:
//! get a container client, then a blob client, then upload or tag.
//! Addresses and shared access signatures are placeholders: nothing is
//! served at the URL and the signature is never checked.

use std::fmt;

use crate::error::StorageResult;
use crate::store::BlobStore;
use crate::types::{BlobDescriptor, Tags};

/// Account endpoint blobs are addressed under.
pub const BLOB_ENDPOINT: &str = "https://fake.blob.core.windows.net";

/// Public address of a blob.
pub fn blob_url(container: &str, name: &str) -> String {
    format!("{BLOB_ENDPOINT}/{container}/{name}")
}

/// Rights granted by a shared access signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobPermissions {
    pub read: bool,
    pub add: bool,
    pub create: bool,
    pub write: bool,
    pub delete: bool,
}

impl BlobPermissions {
    pub const READ: Self = Self {
        read: true,
        add: false,
        create: false,
        write: false,
        delete: false,
    };
}

/// Signed-permission letters in their canonical `racwd` order.
impl fmt::Display for BlobPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (granted, letter) in [
            (self.read, 'r'),
            (self.add, 'a'),
            (self.create, 'c'),
            (self.write, 'w'),
            (self.delete, 'd'),
        ] {
            if granted {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct ContainerClient {
    store: BlobStore,
    container: String,
}

impl ContainerClient {
    pub fn new(store: BlobStore, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.container
    }

    pub fn list_blobs(&self) -> impl Iterator<Item = BlobDescriptor> + use<> {
        self.store.list(&self.container)
    }

    pub fn download_blob(&self, name: &str) -> StorageResult<Vec<u8>> {
        self.store.get(&self.container, name)
    }

    /// Address of `name` in this container, with `sas` appended as the
    /// query string when given.
    pub fn make_blob_url(&self, name: &str, sas: Option<&str>) -> String {
        let url = blob_url(&self.container, name);
        match sas {
            Some(token) if !token.is_empty() => format!("{url}?{token}"),
            _ => url,
        }
    }

    pub fn get_blob_client(&self, name: impl Into<String>) -> BlobClient {
        BlobClient {
            store: self.store.clone(),
            container: self.container.clone(),
            name: name.into(),
        }
    }
}

#[derive(Clone)]
pub struct BlobClient {
    store: BlobStore,
    container: String,
    name: String,
}

impl BlobClient {
    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overwrite the blob, optionally replacing its tags.
    pub fn upload_blob(&self, data: &[u8], tags: Option<Tags>) -> StorageResult<()> {
        self.store.upload(&self.container, &self.name, data, tags)
    }

    pub fn download(&self) -> StorageResult<Vec<u8>> {
        self.store.get(&self.container, &self.name)
    }

    pub fn set_blob_tags(&self, tags: Tags) -> StorageResult<()> {
        self.store.set_tags(&self.container, &self.name, tags)
    }

    pub fn get_blob_tags(&self) -> Tags {
        self.store.get_tags(&self.container, &self.name)
    }

    pub fn exists(&self) -> bool {
        self.store.exists(&self.container, &self.name)
    }

    pub fn url(&self) -> String {
        blob_url(&self.container, &self.name)
    }

    /// An unsigned token granting `permissions` until `expiry` (unix
    /// seconds). Accepted by nothing; handlers only pass it along.
    pub fn generate_shared_access_signature(
        &self,
        permissions: BlobPermissions,
        expiry: i64,
    ) -> String {
        format!("sv=local&sr=b&sp={permissions}&se={expiry}&sig=unsigned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_client_upload_with_tags() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).unwrap();
        let blob = store.container("todo").get_blob_client("a.txt");

        assert!(!blob.exists());
        let tags: Tags = [("tts".to_string(), "42".to_string())].into();
        blob.upload_blob(b"content", Some(tags.clone())).unwrap();

        assert!(blob.exists());
        assert_eq!(blob.download().unwrap(), b"content");
        assert_eq!(blob.get_blob_tags(), tags);
    }

    #[test]
    fn urls_and_signatures_are_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).unwrap();
        let container = store.container("todo");
        let blob = container.get_blob_client("notes/a.txt");

        assert_eq!(blob.url(), "https://fake.blob.core.windows.net/todo/notes/a.txt");
        assert_eq!(container.make_blob_url("notes/a.txt", None), blob.url());

        let rw = BlobPermissions {
            write: true,
            ..BlobPermissions::READ
        };
        let sas = blob.generate_shared_access_signature(rw, 1_700_000_000);
        assert_eq!(sas, "sv=local&sr=b&sp=rw&se=1700000000&sig=unsigned");
        assert_eq!(
            container.make_blob_url("notes/a.txt", Some(&sas)),
            format!("{}?{sas}", blob.url())
        );
        assert!(!blob.exists());
    }

    #[test]
    fn container_client_lists_and_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).unwrap();
        let container = store.container("todo");

        container.get_blob_client("x").upload_blob(b"1", None).unwrap();
        container.get_blob_client("y").upload_blob(b"2", None).unwrap();

        let names: Vec<_> = container.list_blobs().map(|b| b.name).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(container.download_blob("y").unwrap(), b"2");
    }
}
