//! TagCatalog — the persisted secondary index of blob tags.
//!
//! One JSON document maps container → blob name → tags. Containers and
//! blobs keep the order they were first tagged in, both in memory and on
//! disk, so queries walk blobs oldest first. Reads and writes go through an
//! `RwLock`; a write only becomes visible once the whole document has been
//! rewritten.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::types::Tags;

/// Convert any `Display` error into a `StorageError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StorageError::$variant(e.to_string())
    };
}

type Entries = IndexMap<String, IndexMap<String, Tags>>;

#[derive(Debug)]
pub struct TagCatalog {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl TagCatalog {
    /// Load the catalog from `path`, starting empty if the file is absent.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let entries = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(map_err!(Catalog))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::new(),
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        debug!(?path, containers = entries.len(), "tag catalog loaded");
        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tags recorded for a blob, empty if none.
    pub fn get(&self, container: &str, name: &str) -> Tags {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(container)
            .and_then(|blobs| blobs.get(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the full tag set of a blob and persist the catalog. On a
    /// failed write the in-memory catalog is left as it was.
    pub fn set(&self, container: &str, name: &str, tags: Tags) -> StorageResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = entries.clone();
        updated
            .entry(container.to_string())
            .or_default()
            .insert(name.to_string(), tags);
        self.persist(&updated)?;
        *entries = updated;
        debug!(%container, blob = %name, "blob tags set");
        Ok(())
    }

    /// All (name, tags) pairs recorded for a container, in catalog order.
    pub fn container_entries(&self, container: &str) -> Vec<(String, Tags)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(container)
            .map(|blobs| {
                blobs
                    .iter()
                    .map(|(name, tags)| (name.clone(), tags.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Write the catalog next to its final location, then rename over it.
    fn persist(&self, entries: &Entries) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(entries).map_err(map_err!(Catalog))?;
        let tmp = self.path.with_extension("json.tmp");
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| StorageError::Io { path, source }
        };
        std::fs::write(&tmp, json).map_err(io_err(&tmp))?;
        std::fs::rename(&tmp, &self.path).map_err(io_err(&self.path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_entry_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = TagCatalog::load(&dir.path().join("tags.json")).unwrap();
        assert!(catalog.get("todo", "a.txt").is_empty());
        assert!(catalog.container_entries("todo").is_empty());
    }

    #[test]
    fn set_replaces_instead_of_merging() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = TagCatalog::load(&dir.path().join("tags.json")).unwrap();

        catalog.set("todo", "a.txt", tags(&[("tts", "100")])).unwrap();
        assert_eq!(catalog.get("todo", "a.txt"), tags(&[("tts", "100")]));

        catalog.set("todo", "a.txt", tags(&[("status", "done")])).unwrap();
        assert_eq!(catalog.get("todo", "a.txt"), tags(&[("status", "done")]));
    }

    #[test]
    fn persisted_catalog_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.json");
        {
            let catalog = TagCatalog::load(&path).unwrap();
            catalog.set("todo", "a.txt", tags(&[("tts", "100")])).unwrap();
            catalog.set("done", "b.txt", tags(&[("status", "done")])).unwrap();
        }

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["todo"]["a.txt"]["tts"], "100");

        let catalog = TagCatalog::load(&path).unwrap();
        assert_eq!(catalog.get("done", "b.txt"), tags(&[("status", "done")]));
        assert!(!dir.path().join("tags.json.tmp").exists());
    }

    #[test]
    fn blobs_keep_first_tagged_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.json");
        {
            let catalog = TagCatalog::load(&path).unwrap();
            catalog.set("todo", "zeta.txt", tags(&[("tts", "1")])).unwrap();
            catalog.set("todo", "alpha.txt", tags(&[("tts", "2")])).unwrap();
            catalog.set("todo", "zeta.txt", tags(&[("tts", "3")])).unwrap();
        }

        let catalog = TagCatalog::load(&path).unwrap();
        let names: Vec<_> = catalog
            .container_entries("todo")
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["zeta.txt", "alpha.txt"]);
        assert_eq!(catalog.get("todo", "zeta.txt"), tags(&[("tts", "3")]));
    }

    #[test]
    fn failed_write_keeps_previous_tags() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        let catalog = TagCatalog::load(&nested.join("tags.json")).unwrap();
        catalog.set("todo", "a.txt", tags(&[("tts", "100")])).unwrap();

        std::fs::remove_dir_all(&nested).unwrap();
        let err = catalog.set("todo", "a.txt", tags(&[("status", "done")])).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        assert!(catalog.set("todo", "b.txt", tags(&[("tts", "1")])).is_err());

        assert_eq!(catalog.get("todo", "a.txt"), tags(&[("tts", "100")]));
        assert!(catalog.get("todo", "b.txt").is_empty());
        assert_eq!(catalog.container_entries("todo").len(), 1);
    }

    #[test]
    fn corrupt_catalog_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(TagCatalog::load(&path), Err(StorageError::Catalog(_))));
    }
}
