//! Version record storage backends

use crate::SwitchVersion;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Version storage backend trait
#[async_trait]
pub trait VersionBackend: Send + Sync {
    /// Append a version record
    async fn write(&self, version: &SwitchVersion) -> Result<(), VersionBackendError>;

    /// Flush any pending writes
    async fn flush(&self) -> Result<(), VersionBackendError>;

    /// Read the most recent records, newest first (if supported)
    async fn read(&self, _limit: usize) -> Result<Vec<SwitchVersion>, VersionBackendError> {
        Err(VersionBackendError::NotSupported)
    }

    /// Every record of one switch, oldest first (if supported)
    async fn history(&self, _key: &str) -> Result<Vec<SwitchVersion>, VersionBackendError> {
        Err(VersionBackendError::NotSupported)
    }
}

/// Version backend errors
#[derive(Debug, thiserror::Error)]
pub enum VersionBackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation not supported")]
    NotSupported,

    #[error("Backend error: {0}")]
    Other(String),
}

/// File-based version backend
///
/// Appends one JSON record per line.
pub struct FileBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileBackend {
    /// Create a new file backend
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use switchboard_audit::*;
    ///
    /// let backend = FileBackend::new("switch_versions.jsonl");
    /// ```
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<SwitchVersion>, VersionBackendError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| SwitchVersion::from_json(line).map_err(Into::into))
            .collect()
    }
}

#[async_trait]
impl VersionBackend for FileBackend {
    async fn write(&self, version: &SwitchVersion) -> Result<(), VersionBackendError> {
        let json = version.to_json()?;
        let _guard = self.lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        Ok(())
    }

    async fn flush(&self) -> Result<(), VersionBackendError> {
        Ok(())
    }

    async fn read(&self, limit: usize) -> Result<Vec<SwitchVersion>, VersionBackendError> {
        let _guard = self.lock.lock().await;
        let versions = self.read_all().await?;
        Ok(versions.into_iter().rev().take(limit).collect())
    }

    async fn history(&self, key: &str) -> Result<Vec<SwitchVersion>, VersionBackendError> {
        let _guard = self.lock.lock().await;
        let versions = self.read_all().await?;
        Ok(versions
            .into_iter()
            .filter(|version| version.switch_key == key)
            .collect())
    }
}

/// In-memory version backend
#[derive(Clone, Default)]
pub struct MemoryBackend {
    versions: Arc<Mutex<Vec<SwitchVersion>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all records, oldest first
    pub async fn get_versions(&self) -> Vec<SwitchVersion> {
        self.versions.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.versions.lock().await.clear();
    }
}

#[async_trait]
impl VersionBackend for MemoryBackend {
    async fn write(&self, version: &SwitchVersion) -> Result<(), VersionBackendError> {
        self.versions.lock().await.push(version.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), VersionBackendError> {
        Ok(())
    }

    async fn read(&self, limit: usize) -> Result<Vec<SwitchVersion>, VersionBackendError> {
        let versions = self.versions.lock().await;
        Ok(versions.iter().rev().take(limit).cloned().collect())
    }

    async fn history(&self, key: &str) -> Result<Vec<SwitchVersion>, VersionBackendError> {
        let versions = self.versions.lock().await;
        Ok(versions
            .iter()
            .filter(|version| version.switch_key == key)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::{Switch, SwitchChange};

    fn created(key: &str) -> SwitchVersion {
        SwitchVersion::from_change(&SwitchChange::Created(Switch::new(key)), "alice").unwrap()
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let backend = MemoryBackend::new();
        backend.write(&created("a")).await.unwrap();

        let versions = backend.get_versions().await;
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].switch_key, "a");

        backend.clear().await;
        assert!(backend.get_versions().await.is_empty());
    }

    #[tokio::test]
    async fn test_memory_backend_read_newest_first() {
        let backend = MemoryBackend::new();
        for key in ["a", "b", "c", "d"] {
            backend.write(&created(key)).await.unwrap();
        }

        let keys: Vec<_> = backend
            .read(2)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.switch_key)
            .collect();
        assert_eq!(keys, vec!["d", "c"]);
    }

    #[tokio::test]
    async fn test_memory_backend_history() {
        let backend = MemoryBackend::new();
        backend.write(&created("a")).await.unwrap();
        backend.write(&created("b")).await.unwrap();
        backend
            .write(&SwitchVersion::from_change(&SwitchChange::Deleted(Switch::new("a")), "").unwrap())
            .await
            .unwrap();

        let history = backend.history("a").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].delta, crate::VersionDelta::Deleted);
    }

    #[tokio::test]
    async fn test_file_backend_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("versions.jsonl"));

        assert!(backend.read(10).await.unwrap().is_empty());
        assert!(backend.history("a").await.unwrap().is_empty());
    }
}
