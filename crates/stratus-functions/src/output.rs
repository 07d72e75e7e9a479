//! Output blob binding.
//!
//! The manifest's `path` template is resolved on every write: environment
//! references are expanded and each `{rand-guid}` becomes a fresh uuid.
//! The first path segment names the container, the rest the blob.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use stratus_core::Environment;
use stratus_storage::{BlobStore, StorageError};

use crate::error::FunctionResult;

pub const RAND_GUID: &str = "{rand-guid}";

#[derive(Debug, Clone)]
pub struct BlobOutput {
    template: String,
    env: Arc<Environment>,
    store: BlobStore,
}

impl BlobOutput {
    pub fn new(template: impl Into<String>, env: Arc<Environment>, store: BlobStore) -> Self {
        Self {
            template: template.into(),
            env,
            store,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Resolve the template into `(container, name)`.
    pub fn resolve(&self) -> FunctionResult<(String, String)> {
        let expanded = self.env.expand(&self.template);
        let path = if expanded.contains(RAND_GUID) {
            expanded.replace(RAND_GUID, &Uuid::new_v4().to_string())
        } else {
            expanded
        };
        match path.split_once('/') {
            Some((container, name)) if !container.is_empty() && !name.is_empty() => {
                Ok((container.to_string(), name.to_string()))
            }
            _ => Err(StorageError::InvalidName(path).into()),
        }
    }

    /// Write `data` to a freshly resolved location and return it.
    pub fn set(&self, data: &[u8]) -> FunctionResult<(String, String)> {
        let (container, name) = self.resolve()?;
        self.store.put(&container, &name, data)?;
        debug!(%container, blob = %name, bytes = data.len(), "output binding written");
        Ok((container, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FunctionError;

    fn output(template: &str, dir: &std::path::Path) -> BlobOutput {
        let env = Environment::from_pairs([("OUT_CONTAINER", "results")]);
        BlobOutput::new(template, Arc::new(env), BlobStore::open(dir).unwrap())
    }

    #[test]
    fn rand_guid_is_fresh_per_write() {
        let dir = tempfile::tempdir().unwrap();
        let out = output("out/{rand-guid}", dir.path());

        let (c1, n1) = out.set(b"one").unwrap();
        let (c2, n2) = out.set(b"two").unwrap();
        assert_eq!(c1, "out");
        assert_eq!(c2, "out");
        assert_ne!(n1, n2);
        assert_eq!(n1.len(), 36);

        let store = BlobStore::open(dir.path()).unwrap();
        assert_eq!(store.get("out", &n1).unwrap(), b"one");
        assert_eq!(store.get("out", &n2).unwrap(), b"two");
    }

    #[test]
    fn environment_is_expanded() {
        let dir = tempfile::tempdir().unwrap();
        let (container, name) = output("%OUT_CONTAINER%/report.txt", dir.path())
            .resolve()
            .unwrap();
        assert_eq!((container.as_str(), name.as_str()), ("results", "report.txt"));

        let (container, _) = output("OUT_CONTAINER/{rand-guid}.bin", dir.path())
            .resolve()
            .unwrap();
        assert_eq!(container, "results");
    }

    #[test]
    fn nested_names_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let (container, name) = output("out/2026/{rand-guid}", dir.path()).resolve().unwrap();
        assert_eq!(container, "out");
        assert!(name.starts_with("2026/"));
    }

    #[test]
    fn template_without_container_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for template in ["{rand-guid}", "/name", "out/"] {
            assert!(matches!(
                output(template, dir.path()).resolve(),
                Err(FunctionError::Storage(StorageError::InvalidName(_)))
            ));
        }
    }
}
