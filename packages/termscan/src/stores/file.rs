//! JSON file result store.
//!
//! The record is written to a sibling temp file and renamed over the
//! target, so readers see either the old or the new result.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StoreResult;
use crate::stores::ResultStore;
use crate::types::verification::VerificationResult;

/// Stores the latest result as pretty-printed JSON at `path`.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    path: PathBuf,
}

impl FileResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "result.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    async fn get(&self) -> StoreResult<Option<VerificationResult>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, result: &VerificationResult) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(result)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, &json).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(
            path = %self.path.display(),
            request_id = %result.provenance.request_id,
            "Stored verification result"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::testing::sample_result;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path().join("latest.json"));
        assert!(store.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path().join("nested/latest.json"));

        store.set(&sample_result("first", 0.82)).await.unwrap();
        store.set(&sample_result("second", 0.0)).await.unwrap();

        let latest = store.get().await.unwrap().unwrap();
        assert_eq!(latest.primary_summary, "second");
        assert_eq!(latest.confidence, 0.0);
        assert!(!dir.path().join("nested/latest.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = FileResultStore::new(&path);
        assert!(matches!(store.get().await, Err(StoreError::Serialize(_))));
    }
}
