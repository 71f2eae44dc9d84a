//! Filesystem artifact store.
//!
//! Artifacts are written under `<root>/<process_id>/` with a content-hash
//! suffix in the file name, and referenced by the relative path
//! `<process_id>/<file>`. References are opaque to callers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;

use super::{ArtifactKind, ArtifactStore};

/// Artifact store rooted at a local directory
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at the configured home directory
    pub fn from_config() -> Result<Self> {
        Ok(Self::new(crate::config::artifacts_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// First 12 hex chars of the content SHA256
fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(&hasher.finalize()[..6])
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, process_id: &str, kind: ArtifactKind, data: Vec<u8>) -> Result<String> {
        let dir = self.root.join(process_id);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create artifact directory: {}", dir.display()))?;

        let file_name = format!(
            "{}-{}.{}",
            kind.as_str(),
            content_hash(&data),
            kind.extension()
        );
        let path = dir.join(&file_name);

        fs::write(&path, &data)
            .await
            .with_context(|| format!("Failed to write artifact: {}", path.display()))?;

        Ok(format!("{}/{}", process_id, file_name))
    }

    async fn get(&self, artifact_ref: &str) -> Result<Option<Vec<u8>>> {
        // References are relative paths; refuse anything that climbs out.
        if artifact_ref
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..")
        {
            anyhow::bail!("Invalid artifact reference: {}", artifact_ref);
        }

        let path = self.root.join(artifact_ref);
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(&path)
            .await
            .with_context(|| format!("Failed to read artifact: {}", path.display()))?;

        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp.path());

        let reference = store
            .put("p1", ArtifactKind::Document, b"# Prayer\n".to_vec())
            .await
            .unwrap();

        assert!(reference.starts_with("p1/document-"));
        assert!(reference.ends_with(".md"));

        let data = store.get(&reference).await.unwrap().unwrap();
        assert_eq!(data, b"# Prayer\n");
    }

    #[tokio::test]
    async fn test_get_unknown_reference() {
        let temp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp.path());

        let result = store.get("p1/document-abc.md").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp.path());

        assert!(store.get("../etc/passwd").await.is_err());
        assert!(store.get("p1//x.md").await.is_err());
    }

    #[test]
    fn test_content_hash_stability() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
        assert_eq!(content_hash(b"abc").len(), 12);
    }
}
