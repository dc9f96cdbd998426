//! Condition set registry, keyed by id and by namespace.

use crate::condition::{ConditionSet, Field};
use crate::error::RegistryError;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// One row of [`ConditionRegistry::list_all_conditions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionDescriptor {
    pub id: String,
    pub group_label: String,
    pub field: Field,
}

#[derive(Default)]
struct RegistryInner {
    by_id: HashMap<String, (u64, Arc<dyn ConditionSet>)>,
    by_namespace: HashMap<String, Arc<dyn ConditionSet>>,
    next_seq: u64,
}

/// Registered condition sets.
///
/// Cloning yields another handle to the same registry. Registration is
/// expected at startup; lookups are safe under concurrent evaluation.
#[derive(Clone, Default)]
pub struct ConditionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ConditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a condition set under its id and namespace.
    ///
    /// A prior entry under either key is replaced.
    pub fn register(&self, condition_set: impl ConditionSet + 'static) {
        self.register_arc(Arc::new(condition_set));
    }

    pub fn register_arc(&self, condition_set: Arc<dyn ConditionSet>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let seq = inner.next_seq;
        inner.next_seq += 1;

        tracing::debug!(
            id = condition_set.id(),
            namespace = condition_set.namespace(),
            "Registering condition set"
        );

        inner
            .by_namespace
            .insert(condition_set.namespace().to_string(), condition_set.clone());
        inner
            .by_id
            .insert(condition_set.id().to_string(), (seq, condition_set));
    }

    /// Remove a condition set by its id and namespace. Absent entries are ignored.
    pub fn unregister(&self, condition_set: &dyn ConditionSet) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.by_id.remove(condition_set.id());
        inner.by_namespace.remove(condition_set.namespace());
    }

    pub fn get_by_id(&self, id: &str) -> Result<Arc<dyn ConditionSet>, RegistryError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_id
            .get(id)
            .map(|(_, set)| set.clone())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn get_by_namespace(&self, namespace: &str) -> Option<Arc<dyn ConditionSet>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.by_namespace.get(namespace).cloned()
    }

    /// Snapshot of every registered condition set, in no particular order.
    pub fn list_all(&self) -> Vec<Arc<dyn ConditionSet>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.by_id.values().map(|(_, set)| set.clone()).collect()
    }

    /// One descriptor per field of every registered set, ordered by group
    /// label and then registration order.
    pub fn list_all_conditions(&self) -> impl Iterator<Item = ConditionDescriptor> {
        let mut sets: Vec<(u64, Arc<dyn ConditionSet>)> = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            inner.by_id.values().cloned().collect()
        };
        sets.sort_by_key(|(seq, _)| *seq);
        sets.sort_by(|(_, a), (_, b)| a.group_label().cmp(b.group_label()));

        sets.into_iter().flat_map(|(_, set)| {
            let id = set.id().to_string();
            let group_label = set.group_label().to_string();
            set.fields()
                .iter()
                .map(|field| ConditionDescriptor {
                    id: id.clone(),
                    group_label: group_label.clone(),
                    field: field.clone(),
                })
                .collect::<Vec<_>>()
        })
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Vote;
    use crate::context::Instances;
    use crate::error::ConditionError;
    use serde_json::Value;

    struct Fixed {
        id: &'static str,
        namespace: &'static str,
        label: &'static str,
        fields: Vec<Field>,
    }

    impl Fixed {
        fn new(id: &'static str, namespace: &'static str, label: &'static str) -> Self {
            Self {
                id,
                namespace,
                label,
                fields: vec![Field::boolean(format!("{}_flag", id), "Flag")],
            }
        }
    }

    impl ConditionSet for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        fn namespace(&self) -> &str {
            self.namespace
        }

        fn group_label(&self) -> &str {
            self.label
        }

        fn fields(&self) -> &[Field] {
            &self.fields
        }

        fn has_active_condition(&self, _: &Value, _: &Instances) -> Result<Vote, ConditionError> {
            Ok(Vote::Active)
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ConditionRegistry::new();
        registry.register(Fixed::new("a", "ns-a", "A"));

        assert_eq!(registry.get_by_id("a").unwrap().namespace(), "ns-a");
        assert_eq!(registry.get_by_namespace("ns-a").unwrap().id(), "a");
        assert!(registry.get_by_namespace("missing").is_none());
        assert!(matches!(
            registry.get_by_id("missing"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_namespace_last_writer_wins() {
        let registry = ConditionRegistry::new();
        registry.register(Fixed::new("first", "shared", "A"));
        registry.register(Fixed::new("second", "shared", "A"));

        assert_eq!(registry.get_by_namespace("shared").unwrap().id(), "second");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unregister_round_trip() {
        let registry = ConditionRegistry::new();
        let set = Fixed::new("a", "ns-a", "A");
        registry.register(Fixed::new("a", "ns-a", "A"));

        registry.unregister(&set);
        assert!(registry.get_by_id("a").is_err());
        assert!(registry.get_by_namespace("ns-a").is_none());
        assert!(registry.is_empty());

        registry.unregister(&set);
    }

    #[test]
    fn test_list_all_conditions_ordering() {
        let registry = ConditionRegistry::new();
        registry.register(Fixed::new("z1", "z1", "Zeta"));
        registry.register(Fixed::new("a1", "a1", "Alpha"));
        registry.register(Fixed::new("z0", "z0", "Zeta"));

        let ids: Vec<_> = registry.list_all_conditions().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a1", "z1", "z0"]);

        let first = registry.list_all_conditions().next().unwrap();
        assert_eq!(first.group_label, "Alpha");
        assert_eq!(first.field.name, "a1_flag");
    }

    #[test]
    fn test_clones_share_state() {
        let registry = ConditionRegistry::new();
        let handle = registry.clone();
        handle.register(Fixed::new("a", "ns-a", "A"));
        assert_eq!(registry.list_all().len(), 1);
    }
}
