//! Static container → logical queue mapping.
//!
//! Loaded once at startup from a JSON object such as
//! `{"todo": "todo-events"}` and immutable afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueMap {
    queues: BTreeMap<String, String>,
}

impl QueueMap {
    /// Read the mapping file. A missing file yields an empty map; an
    /// unreadable or malformed one is an error.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(?path, "no storage queues defined, blob events will not be delivered");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let queues: BTreeMap<String, String> =
            serde_json::from_str(&content).map_err(|source| ConfigError::QueueMap {
                path: path.to_path_buf(),
                source,
            })?;
        for (container, queue) in &queues {
            debug!(%container, %queue, "blob events routed to queue");
        }
        Ok(Self { queues })
    }

    pub fn queue_for(&self, container: &str) -> Option<&str> {
        self.queues.get(container).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.queues.iter().map(|(c, q)| (c.as_str(), q.as_str()))
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

impl<C: Into<String>, Q: Into<String>> FromIterator<(C, Q)> for QueueMap {
    fn from_iter<I: IntoIterator<Item = (C, Q)>>(iter: I) -> Self {
        Self {
            queues: iter.into_iter().map(|(c, q)| (c.into(), q.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = QueueMap::load(&dir.path().join("storage-queues.json")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn load_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage-queues.json");
        std::fs::write(&path, r#"{"todo": "Q", "uploads": "uploads-events"}"#).unwrap();

        let map = QueueMap::load(&path).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.queue_for("todo"), Some("Q"));
        assert_eq!(map.queue_for("other"), None);
    }

    #[test]
    fn malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage-queues.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(QueueMap::load(&path), Err(ConfigError::QueueMap { .. })));
    }

    #[test]
    fn collect_from_pairs() {
        let map: QueueMap = [("todo", "Q")].into_iter().collect();
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("todo", "Q")]);
    }
}
