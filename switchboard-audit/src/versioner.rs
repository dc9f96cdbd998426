//! Switch versioner

use crate::{MemoryBackend, SwitchVersion, VersionBackend, VersionBackendError};
use async_trait::async_trait;
use std::sync::Arc;
use switchboard_core::{AmbientContext, SwitchChange, VersioningError, VersioningHook};

/// Records a [`SwitchVersion`] for every switch write.
///
/// Register it with a manager as a versioning hook.
#[derive(Clone)]
pub struct SwitchVersioner {
    backend: Arc<dyn VersionBackend>,
    enabled: bool,
}

impl SwitchVersioner {
    /// Create a new versioner builder
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use switchboard_audit::*;
    /// use switchboard_core::{MemoryStore, SwitchManager};
    ///
    /// let versioner = SwitchVersioner::builder()
    ///     .backend(FileBackend::new("switch_versions.jsonl"))
    ///     .build();
    ///
    /// let manager = SwitchManager::builder(MemoryStore::new())
    ///     .hook(versioner)
    ///     .build();
    /// ```
    pub fn builder() -> SwitchVersionerBuilder {
        SwitchVersionerBuilder::new()
    }

    /// Build a record for `change` and write it to the backend.
    pub async fn version(
        &self,
        change: &SwitchChange,
        username: &str,
    ) -> Result<(), VersionBackendError> {
        if !self.enabled {
            return Ok(());
        }

        let version = SwitchVersion::from_change(change, username)?;
        if version.delta.is_empty() {
            tracing::trace!(switch = change.key(), "No changes to version");
            return Ok(());
        }

        self.backend.write(&version).await
    }

    /// Most recent records, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<SwitchVersion>, VersionBackendError> {
        self.backend.read(limit).await
    }

    /// Every record of one switch, oldest first
    pub async fn history(&self, key: &str) -> Result<Vec<SwitchVersion>, VersionBackendError> {
        self.backend.history(key).await
    }

    pub async fn flush(&self) -> Result<(), VersionBackendError> {
        self.backend.flush().await
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

#[async_trait]
impl VersioningHook for SwitchVersioner {
    async fn record(
        &self,
        change: &SwitchChange,
        context: &AmbientContext,
    ) -> Result<(), VersioningError> {
        let username = context.acting_username();
        self.version(change, &username)
            .await
            .map_err(|err| match err {
                VersionBackendError::Serialization(err) => VersioningError::Serialization(err),
                other => VersioningError::Backend(other.to_string()),
            })
    }
}

/// Switch versioner builder
pub struct SwitchVersionerBuilder {
    backend: Option<Arc<dyn VersionBackend>>,
    enabled: bool,
}

impl SwitchVersionerBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            enabled: true,
        }
    }

    /// Set the storage backend
    pub fn backend(mut self, backend: impl VersionBackend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Enable or disable versioning
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Build the versioner; defaults to an in-memory backend
    pub fn build(self) -> SwitchVersioner {
        SwitchVersioner {
            backend: self
                .backend
                .unwrap_or_else(|| Arc::new(MemoryBackend::new())),
            enabled: self.enabled,
        }
    }
}

impl Default for SwitchVersionerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
