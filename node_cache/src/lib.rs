//! Durable, atomic cache of the last-known node roster.
//!
//! Survives process restarts: `NodeManager::startup_restore` falls back to
//! this cache when the upstream catalog is unreachable. Writes are
//! write-to-temp-in-same-directory then rename, so a reader never observes a
//! partially-written file. Both read and write failures are swallowed at this
//! layer — the original Python `node_cache_store` treats them as warnings,
//! never as fatal errors, and callers are expected to fall back to an empty
//! roster.

use std::path::{Path, PathBuf};

use catalog::Node;
use tracing::{debug, info, warn};

/// Single-file, atomic store for the persisted node roster.
pub struct NodeCacheStore {
    path: PathBuf,
}

impl NodeCacheStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Atomically persist `nodes`. Logs and swallows any I/O or
    /// serialization failure.
    pub async fn save(&self, nodes: &[Node]) {
        if let Err(e) = self.save_inner(nodes).await {
            warn!(error = %e, path = %self.path.display(), "failed to persist node cache");
        }
    }

    async fn save_inner(&self, nodes: &[Node]) -> std::io::Result<()> {
        let Some(dir) = self.path.parent() else {
            return Err(std::io::Error::other("cache path has no parent directory"));
        };
        tokio::fs::create_dir_all(dir).await?;

        let json = serde_json::to_vec(nodes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let dir = dir.to_path_buf();
        let target = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &json))
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))??;

        debug!(count = nodes.len(), path = %self.path.display(), "persisted node cache");
        Ok(())
    }

    /// Load the persisted roster. Returns `None` on any read or parse
    /// failure ("no cache"), never an error.
    pub async fn load(&self) -> Option<Vec<Node>> {
        match self.load_inner().await {
            Ok(nodes) => {
                info!(count = nodes.len(), path = %self.path.display(), "loaded persisted node cache");
                Some(nodes)
            }
            Err(e) => {
                debug!(error = %e, path = %self.path.display(), "could not load persisted node cache");
                None
            }
        }
    }

    async fn load_inner(&self) -> std::io::Result<Vec<Node>> {
        let bytes = tokio::fs::read(&self.path).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

fn write_atomic(dir: &Path, target: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut tmp = tempfile::Builder::new()
        .prefix(".node_cache")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(target)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_nodes() -> Vec<Node> {
        vec![Node {
            hostname: "ams01.ring.nlnog.net".to_string(),
            asn: "64512".to_string(),
            city: "Amsterdam".to_string(),
            countrycode: "NL".to_string(),
            continent: "Europe".to_string(),
            company: "Unknown".to_string(),
        }]
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = NodeCacheStore::new(dir.path().join("node_cache.json"));

        let nodes = sample_nodes();
        store.save(&nodes).await;

        let loaded = store.load().await.expect("cache should load");
        assert_eq!(loaded, nodes);
    }

    #[tokio::test]
    async fn missing_file_yields_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = NodeCacheStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn corrupt_file_yields_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node_cache.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = NodeCacheStore::new(path);
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn save_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("node_cache.json");
        let store = NodeCacheStore::new(nested.clone());

        store.save(&sample_nodes()).await;
        assert!(nested.exists());
    }
}
