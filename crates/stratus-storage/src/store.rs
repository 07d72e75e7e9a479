//! BlobStore — filesystem-backed blob persistence.
//!
//! Containers map 1:1 to directories under the storage root; blob names
//! may contain `/` to address nested files. Tag bookkeeping is delegated
//! to the [`TagCatalog`], and every completed payload write is reported
//! to the configured [`WriteObserver`].

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use walkdir::WalkDir;

use crate::client::ContainerClient;
use crate::error::{StorageError, StorageResult};
use crate::query::TagQuery;
use crate::tags::TagCatalog;
use crate::types::{BlobDescriptor, Tags};

/// File name of the tag catalog under the storage root.
pub const TAG_CATALOG_FILE: &str = "tags.json";

/// Root entries owned by the tag catalog, never usable as containers.
const RESERVED_CONTAINERS: [&str; 2] = [TAG_CATALOG_FILE, "tags.json.tmp"];

/// Receives a callback after each blob payload write.
///
/// Implementations must not block: the callback runs on the writer's
/// thread before `put` returns.
pub trait WriteObserver: Send + Sync {
    fn blob_created(&self, container: &str, name: &str, size: u64);
}

/// Thread-safe handle to the local blob store.
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
    catalog: Arc<TagCatalog>,
    observer: Option<Arc<dyn WriteObserver>>,
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("root", &self.root)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl BlobStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(root).map_err(|source| StorageError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let catalog = TagCatalog::load(&root.join(TAG_CATALOG_FILE))?;
        debug!(?root, "blob store opened");
        Ok(Self {
            root: root.to_path_buf(),
            catalog: Arc::new(catalog),
            observer: None,
        })
    }

    /// Report every payload write to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn WriteObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn container(&self, container: &str) -> ContainerClient {
        ContainerClient::new(self.clone(), container)
    }

    // ── Payloads ───────────────────────────────────────────────────

    /// Create or overwrite a blob, then report the write.
    pub fn put(&self, container: &str, name: &str, data: &[u8]) -> StorageResult<()> {
        self.write_payload(container, name, data)?;
        self.notify(container, name, data.len());
        Ok(())
    }

    /// Write a blob and replace its tags before reporting the write, so an
    /// event subscriber always sees the new tags.
    pub fn upload(
        &self,
        container: &str,
        name: &str,
        data: &[u8],
        tags: Option<Tags>,
    ) -> StorageResult<()> {
        self.write_payload(container, name, data)?;
        if let Some(tags) = tags {
            self.set_tags(container, name, tags)?;
        }
        self.notify(container, name, data.len());
        Ok(())
    }

    pub fn get(&self, container: &str, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.blob_path(container, name)?;
        match std::fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound || path.is_dir() => {
                Err(StorageError::NotFound {
                    container: container.to_string(),
                    name: name.to_string(),
                })
            }
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    /// Never fails: invalid names and absent containers are simply `false`.
    pub fn exists(&self, container: &str, name: &str) -> bool {
        self.blob_path(container, name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Blobs currently in a container, with their tags. Names of nested
    /// files are relative to the container and `/`-separated.
    pub fn list(&self, container: &str) -> impl Iterator<Item = BlobDescriptor> + use<> {
        let mut blobs = Vec::new();
        if let Ok(dir) = self.container_path(container) {
            for entry in WalkDir::new(&dir)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                let Ok(relative) = entry.path().strip_prefix(&dir) else {
                    continue;
                };
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let tags = self.catalog.get(container, &name);
                blobs.push(BlobDescriptor::new(container, name, tags));
            }
        }
        blobs.into_iter()
    }

    // ── Tags ───────────────────────────────────────────────────────

    /// Replace (not merge) the tag set of a blob and persist the catalog.
    pub fn set_tags(&self, container: &str, name: &str, tags: Tags) -> StorageResult<()> {
        self.blob_path(container, name)?;
        self.catalog.set(container, name, tags)
    }

    /// Tags recorded for a blob, empty if none.
    pub fn get_tags(&self, container: &str, name: &str) -> Tags {
        self.catalog.get(container, name)
    }

    /// Blobs of one container whose tags satisfy `expression`.
    ///
    /// Scans the container's catalog entries linearly; the result reflects
    /// the catalog at call time.
    pub fn find_blobs_by_tags(
        &self,
        expression: &str,
    ) -> StorageResult<impl Iterator<Item = BlobDescriptor> + use<>> {
        let query = TagQuery::parse(expression)?;
        debug!(%query, "searching blobs by tags");
        let container = query.container.clone();
        let matches: Vec<_> = self
            .catalog
            .container_entries(&container)
            .into_iter()
            .filter(|(_, tags)| query.matches(tags))
            .map(|(name, tags)| BlobDescriptor::new(container.clone(), name, tags))
            .collect();
        Ok(matches.into_iter())
    }

    // ── Internals ──────────────────────────────────────────────────

    fn write_payload(&self, container: &str, name: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.blob_path(container, name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, data).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(%container, blob = %name, size = data.len(), "blob written");
        Ok(())
    }

    fn notify(&self, container: &str, name: &str, size: usize) {
        if let Some(observer) = &self.observer {
            observer.blob_created(container, name, size as u64);
        }
    }

    fn container_path(&self, container: &str) -> StorageResult<PathBuf> {
        check_relative(container)?;
        let top = Path::new(container).components().next();
        if top.is_some_and(|c| RESERVED_CONTAINERS.iter().any(|r| c.as_os_str() == *r)) {
            return Err(StorageError::InvalidName(container.to_string()));
        }
        Ok(self.root.join(container))
    }

    fn blob_path(&self, container: &str, name: &str) -> StorageResult<PathBuf> {
        check_relative(name)?;
        Ok(self.container_path(container)?.join(name))
    }
}

/// Accept only non-empty relative paths made of normal components.
fn check_relative(value: &str) -> StorageResult<()> {
    let path = Path::new(value);
    let valid = !value.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName(value.to_string()))
    }
}
