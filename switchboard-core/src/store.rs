//! Switch storage
//!
//! [`SwitchStore`] is the contract for the document store holding switch
//! records; [`MemoryStore`] is an in-process implementation.

use crate::error::StoreResult;
use crate::switch::Switch;
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Switch storage backend trait
#[async_trait]
pub trait SwitchStore: Send + Sync {
    /// Load a switch by key
    async fn find(&self, key: &str) -> StoreResult<Option<Switch>>;

    /// List every stored switch
    async fn list(&self) -> StoreResult<Vec<Switch>>;

    /// Insert or replace a switch, returning the previously stored record
    async fn save(&self, switch: Switch) -> StoreResult<Option<Switch>>;

    /// Insert a switch only if its key is absent. Returns whether it was inserted.
    async fn create(&self, switch: Switch) -> StoreResult<bool>;

    /// Delete a switch, returning the removed record
    async fn delete(&self, key: &str) -> StoreResult<Option<Switch>>;
}

/// In-memory switch store
#[derive(Clone, Default)]
pub struct MemoryStore {
    switches: Arc<RwLock<HashMap<String, Switch>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with switches
    pub fn with_switches(switches: impl IntoIterator<Item = Switch>) -> Self {
        let map = switches
            .into_iter()
            .map(|switch| (switch.key.clone(), switch))
            .collect();
        Self {
            switches: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn len(&self) -> usize {
        self.switches.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.switches.read().await.is_empty()
    }
}

#[async_trait]
impl SwitchStore for MemoryStore {
    async fn find(&self, key: &str) -> StoreResult<Option<Switch>> {
        Ok(self.switches.read().await.get(key).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Switch>> {
        let mut switches: Vec<Switch> = self.switches.read().await.values().cloned().collect();
        switches.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(switches)
    }

    async fn save(&self, switch: Switch) -> StoreResult<Option<Switch>> {
        Ok(self
            .switches
            .write()
            .await
            .insert(switch.key.clone(), switch))
    }

    async fn create(&self, switch: Switch) -> StoreResult<bool> {
        match self.switches.write().await.entry(switch.key.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(switch);
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<Option<Switch>> {
        Ok(self.switches.write().await.remove(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switch::SwitchStatus;

    #[tokio::test]
    async fn test_memory_store_crud() {
        let store = MemoryStore::new();

        let previous = store.save(Switch::new("feature")).await.unwrap();
        assert!(previous.is_none());

        let previous = store
            .save(Switch::new("feature").with_status(SwitchStatus::Global))
            .await
            .unwrap();
        assert_eq!(previous.map(|s| s.status), Some(SwitchStatus::Disabled));

        let found = store.find("feature").await.unwrap().unwrap();
        assert_eq!(found.status, SwitchStatus::Global);

        let removed = store.delete("feature").await.unwrap();
        assert!(removed.is_some());
        assert!(store.find("feature").await.unwrap().is_none());
        assert!(store.delete("feature").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_keeps_existing_record() {
        let store = MemoryStore::new();

        assert!(store.create(Switch::new("feature")).await.unwrap());
        assert!(
            !store
                .create(Switch::new("feature").with_status(SwitchStatus::Global))
                .await
                .unwrap()
        );

        let found = store.find("feature").await.unwrap().unwrap();
        assert_eq!(found.status, SwitchStatus::Disabled);
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_key() {
        let store = MemoryStore::with_switches(vec![Switch::new("b"), Switch::new("a:b"), Switch::new("a")]);

        let keys: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.key)
            .collect();
        assert_eq!(keys, vec!["a", "a:b", "b"]);
        assert_eq!(store.len().await, 3);
    }
}
