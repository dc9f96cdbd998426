//! Switch Manager
//!
//! Evaluates switches (`is_active`) and applies versioned writes.
//!
//! # Evaluation
//!
//! For a key `a:b:c` the ancestors `a` and `a:b` are resolved first, root
//! first. An ancestor that resolves inactive vetoes every descendant; one
//! that resolves active becomes the fallback for the next level. The key's
//! own switch is then dispatched on its status:
//!
//! | Status      | Result                                              |
//! |-------------|-----------------------------------------------------|
//! | `Global`    | active                                              |
//! | `Disabled`  | inactive                                            |
//! | `Inherit`   | the current fallback                                |
//! | `Selective` | condition votes; no conditions means the fallback   |
//!
//! Among condition votes any `Inactive` wins, otherwise the switch is active
//! only if some namespace voted `Active`. Any failure resolves to inactive.

use crate::condition::{ConditionMode, Vote};
use crate::context::{AmbientContext, Instance, Instances};
use crate::error::{ConditionError, RegistryError, Result, SwitchError};
use crate::registry::ConditionRegistry;
use crate::store::SwitchStore;
use crate::switch::{Switch, SwitchStatus};
use crate::versioning::{SwitchChange, VersioningHook};
use chrono::Utc;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Default hierarchy delimiter
pub const DEFAULT_DELIMITER: char = ':';

/// Resolution of one level of the hierarchy.
///
/// `Unset` means no opinion: the key is undefined or inherits without a
/// fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Active,
    Inactive,
    Unset,
}

impl Resolution {
    /// Collapse to a boolean, using `default` for `Unset`.
    pub fn unwrap_or(self, default: bool) -> bool {
        match self {
            Resolution::Active => true,
            Resolution::Inactive => false,
            Resolution::Unset => default,
        }
    }
}

impl From<bool> for Resolution {
    fn from(active: bool) -> Self {
        if active {
            Resolution::Active
        } else {
            Resolution::Inactive
        }
    }
}

/// Evaluates and edits switches.
///
/// Cheap to clone; clones share the store, registry and hooks.
#[derive(Clone)]
pub struct SwitchManager {
    store: Arc<dyn SwitchStore>,
    registry: ConditionRegistry,
    hooks: Vec<Arc<dyn VersioningHook>>,
    delimiter: char,
    auto_create: bool,
}

impl SwitchManager {
    /// Create a manager with default options
    pub fn new(store: impl SwitchStore + 'static, registry: ConditionRegistry) -> Self {
        Self::builder(store).registry(registry).build()
    }

    /// Create a manager builder
    ///
    /// # Examples
    ///
    /// ```
    /// use switchboard_core::*;
    ///
    /// let manager = SwitchManager::builder(MemoryStore::new())
    ///     .delimiter('.')
    ///     .auto_create(true)
    ///     .build();
    /// assert_eq!(manager.delimiter(), '.');
    /// ```
    pub fn builder(store: impl SwitchStore + 'static) -> SwitchManagerBuilder {
        SwitchManagerBuilder::new(store)
    }

    pub fn registry(&self) -> &ConditionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn SwitchStore> {
        &self.store
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn auto_create(&self) -> bool {
        self.auto_create
    }

    /// Bind ambient values for one logical request.
    ///
    /// # Examples
    ///
    /// ```
    /// use switchboard_core::*;
    ///
    /// # async fn example() {
    /// let manager = SwitchManager::new(MemoryStore::new(), ConditionRegistry::new());
    /// let scoped = manager.with_context(AmbientContext::new().with_user(User::new("1", "alice")));
    ///
    /// assert!(!scoped.is_active("new-checkout", &[]).await);
    /// # }
    /// ```
    pub fn with_context(&self, context: AmbientContext) -> ScopedSwitches<'_> {
        ScopedSwitches {
            manager: self,
            context,
        }
    }

    /// Whether the switch `key` is active for `instances`, defaulting to inactive.
    pub async fn is_active(&self, key: &str, instances: &[Instance]) -> bool {
        self.evaluate(key, instances, &AmbientContext::new(), false)
            .await
    }

    /// Like [`is_active`](Self::is_active) with an explicit default for
    /// undefined switches.
    pub async fn is_active_or(&self, key: &str, instances: &[Instance], default: bool) -> bool {
        self.evaluate(key, instances, &AmbientContext::new(), default)
            .await
    }

    async fn evaluate(
        &self,
        key: &str,
        instances: &[Instance],
        ambient: &AmbientContext,
        default: bool,
    ) -> bool {
        match self.try_evaluate(key, instances, ambient, default).await {
            Ok(active) => active,
            Err(err) => {
                tracing::error!(switch = key, error = %err, "Error checking if switch is active");
                false
            }
        }
    }

    async fn try_evaluate(
        &self,
        key: &str,
        instances: &[Instance],
        ambient: &AmbientContext,
        default: bool,
    ) -> Result<bool> {
        let instances = Instances::merged(instances, ambient);

        let mut inherited = Resolution::Unset;
        for (idx, _) in key.match_indices(self.delimiter) {
            let ancestor = &key[..idx];
            inherited = self.resolve(ancestor, inherited, &instances, ambient).await?;
            if inherited == Resolution::Inactive {
                tracing::trace!(switch = key, ancestor, "Disabled by ancestor");
                return Ok(false);
            }
        }

        let default = inherited == Resolution::Active || default;
        let resolution = self
            .resolve(key, default.into(), &instances, ambient)
            .await?;
        Ok(resolution.unwrap_or(default))
    }

    async fn resolve(
        &self,
        key: &str,
        default: Resolution,
        instances: &Instances,
        ambient: &AmbientContext,
    ) -> Result<Resolution> {
        let Some(switch) = self.lookup(key, ambient).await? else {
            return Ok(default);
        };

        let resolution = match switch.status {
            SwitchStatus::Global => Resolution::Active,
            SwitchStatus::Disabled => Resolution::Inactive,
            SwitchStatus::Inherit => default,
            SwitchStatus::Selective => match self.evaluate_conditions(&switch, instances)? {
                Some(active) => active.into(),
                None => default,
            },
        };

        tracing::trace!(switch = key, status = %switch.status, ?resolution, "Resolved switch");
        Ok(resolution)
    }

    /// `None` when the switch has no conditions.
    fn evaluate_conditions(
        &self,
        switch: &Switch,
        instances: &Instances,
    ) -> Result<Option<bool>> {
        if switch.value.is_empty() {
            return Ok(None);
        }

        let mut matched = false;
        for (namespace, payload) in &switch.value {
            let Some(condition_set) = self.registry.get_by_namespace(namespace) else {
                tracing::debug!(
                    switch = %switch.key,
                    namespace = namespace.as_str(),
                    "Skipping unregistered namespace"
                );
                continue;
            };

            let vote = panic::catch_unwind(AssertUnwindSafe(|| {
                condition_set.has_active_condition(payload, instances)
            }))
            .map_err(|cause| ConditionError::Evaluator {
                namespace: namespace.clone(),
                reason: panic_message(cause.as_ref()),
            })??;

            match vote {
                Vote::Inactive => return Ok(Some(false)),
                Vote::Active => matched = true,
                Vote::Abstain => {}
            }
        }

        Ok(Some(matched))
    }

    async fn lookup(&self, key: &str, ambient: &AmbientContext) -> Result<Option<Switch>> {
        let found = self.store.find(key).await?;

        if found.is_none() && self.auto_create {
            let switch = Switch::new(key);
            match self.store.create(switch.clone()).await {
                Ok(true) => {
                    tracing::debug!(switch = key, "Auto-created switch");
                    self.notify(&SwitchChange::Created(switch), ambient).await;
                }
                Ok(false) => tracing::debug!(switch = key, "Switch created concurrently"),
                Err(err) => {
                    tracing::warn!(switch = key, error = %err, "Unable to auto-create switch")
                }
            }
        }

        Ok(found)
    }

    /// Load a switch by key
    pub async fn get(&self, key: &str) -> Result<Option<Switch>> {
        Ok(self.store.find(key).await?)
    }

    /// List every stored switch
    pub async fn list(&self) -> Result<Vec<Switch>> {
        Ok(self.store.list().await?)
    }

    /// Save a switch and record the change with the versioning hooks.
    pub async fn save(&self, switch: Switch, context: &AmbientContext) -> Result<Switch> {
        self.write(switch, context).await
    }

    /// Delete a switch and record the deletion. Returns the removed record.
    pub async fn delete(&self, key: &str, context: &AmbientContext) -> Result<Option<Switch>> {
        let removed = self.store.delete(key).await?;
        if let Some(previous) = &removed {
            self.notify(&SwitchChange::Deleted(previous.clone()), context)
                .await;
        }
        Ok(removed)
    }

    /// Validate and add a field condition to a stored switch.
    pub async fn add_condition(
        &self,
        key: &str,
        namespace: &str,
        field: &str,
        condition: &str,
        mode: ConditionMode,
        context: &AmbientContext,
    ) -> Result<Switch> {
        self.validate_condition(namespace, field, condition)?;
        let mut switch = self.require(key).await?;
        switch.add_condition(namespace, field, condition, mode)?;
        self.write(switch, context).await
    }

    /// Remove a field condition from a stored switch.
    pub async fn remove_condition(
        &self,
        key: &str,
        namespace: &str,
        field: &str,
        condition: &str,
        context: &AmbientContext,
    ) -> Result<Switch> {
        let mut switch = self.require(key).await?;
        switch.remove_condition(namespace, field, condition)?;
        self.write(switch, context).await
    }

    /// Clear one field of a namespace, or the whole namespace.
    pub async fn clear_conditions(
        &self,
        key: &str,
        namespace: &str,
        field: Option<&str>,
        context: &AmbientContext,
    ) -> Result<Switch> {
        let mut switch = self.require(key).await?;
        switch.clear_conditions(namespace, field)?;
        self.write(switch, context).await
    }

    fn validate_condition(&self, namespace: &str, field: &str, condition: &str) -> Result<()> {
        let condition_set = self
            .registry
            .get_by_namespace(namespace)
            .ok_or_else(|| RegistryError::NotFound(namespace.to_string()))?;
        let field = condition_set
            .field(field)
            .ok_or_else(|| ConditionError::invalid(field, condition, "unknown field"))?;
        field.validate(condition)?;
        Ok(())
    }

    async fn require(&self, key: &str) -> Result<Switch> {
        self.store
            .find(key)
            .await?
            .ok_or_else(|| SwitchError::SwitchNotFound(key.to_string()))
    }

    async fn write(&self, mut switch: Switch, context: &AmbientContext) -> Result<Switch> {
        switch.date_modified = Utc::now();
        let change = match self.store.save(switch.clone()).await? {
            Some(previous) => SwitchChange::Updated {
                previous,
                current: switch.clone(),
            },
            None => SwitchChange::Created(switch.clone()),
        };
        self.notify(&change, context).await;
        Ok(switch)
    }

    async fn notify(&self, change: &SwitchChange, context: &AmbientContext) {
        for hook in &self.hooks {
            if let Err(err) = hook.record(change, context).await {
                tracing::warn!(
                    switch = change.key(),
                    change = change.kind(),
                    error = %err,
                    "Unable to save the switch version"
                );
            }
        }
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = cause.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.clone()
    } else {
        "evaluator panicked".to_string()
    }
}

/// A manager bound to the ambient context of one logical request.
pub struct ScopedSwitches<'a> {
    manager: &'a SwitchManager,
    context: AmbientContext,
}

impl ScopedSwitches<'_> {
    pub fn context(&self) -> &AmbientContext {
        &self.context
    }

    pub async fn is_active(&self, key: &str, instances: &[Instance]) -> bool {
        self.manager
            .evaluate(key, instances, &self.context, false)
            .await
    }

    pub async fn is_active_or(&self, key: &str, instances: &[Instance], default: bool) -> bool {
        self.manager
            .evaluate(key, instances, &self.context, default)
            .await
    }

    pub async fn save(&self, switch: Switch) -> Result<Switch> {
        self.manager.save(switch, &self.context).await
    }

    pub async fn delete(&self, key: &str) -> Result<Option<Switch>> {
        self.manager.delete(key, &self.context).await
    }

    pub async fn add_condition(
        &self,
        key: &str,
        namespace: &str,
        field: &str,
        condition: &str,
        mode: ConditionMode,
    ) -> Result<Switch> {
        self.manager
            .add_condition(key, namespace, field, condition, mode, &self.context)
            .await
    }

    pub async fn remove_condition(
        &self,
        key: &str,
        namespace: &str,
        field: &str,
        condition: &str,
    ) -> Result<Switch> {
        self.manager
            .remove_condition(key, namespace, field, condition, &self.context)
            .await
    }

    pub async fn clear_conditions(
        &self,
        key: &str,
        namespace: &str,
        field: Option<&str>,
    ) -> Result<Switch> {
        self.manager
            .clear_conditions(key, namespace, field, &self.context)
            .await
    }
}

/// Switch manager builder
pub struct SwitchManagerBuilder {
    store: Arc<dyn SwitchStore>,
    registry: ConditionRegistry,
    hooks: Vec<Arc<dyn VersioningHook>>,
    delimiter: char,
    auto_create: bool,
}

impl SwitchManagerBuilder {
    pub fn new(store: impl SwitchStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
            registry: ConditionRegistry::new(),
            hooks: Vec::new(),
            delimiter: DEFAULT_DELIMITER,
            auto_create: false,
        }
    }

    /// Use an existing registry
    pub fn registry(mut self, registry: ConditionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Add a versioning hook
    pub fn hook(mut self, hook: impl VersioningHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn hook_arc(mut self, hook: Arc<dyn VersioningHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Set the hierarchy delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Persist a disabled switch the first time an undefined key is checked
    pub fn auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    pub fn build(self) -> SwitchManager {
        SwitchManager {
            store: self.store,
            registry: self.registry,
            hooks: self.hooks,
            delimiter: self.delimiter,
            auto_create: self.auto_create,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager(switches: Vec<Switch>) -> SwitchManager {
        SwitchManager::new(MemoryStore::with_switches(switches), ConditionRegistry::new())
    }

    #[test]
    fn test_resolution_unwrap_or() {
        assert!(Resolution::Active.unwrap_or(false));
        assert!(!Resolution::Inactive.unwrap_or(true));
        assert!(Resolution::Unset.unwrap_or(true));
        assert_eq!(Resolution::from(true), Resolution::Active);
    }

    #[tokio::test]
    async fn test_undefined_switch_uses_default() {
        let manager = manager(vec![]);
        assert!(!manager.is_active("missing", &[]).await);
        assert!(manager.is_active_or("missing", &[], true).await);
    }

    #[tokio::test]
    async fn test_status_dispatch() {
        let manager = manager(vec![
            Switch::new("global").with_status(SwitchStatus::Global),
            Switch::new("disabled").with_status(SwitchStatus::Disabled),
            Switch::new("inherit").with_status(SwitchStatus::Inherit),
            Switch::new("selective").with_status(SwitchStatus::Selective),
        ]);

        assert!(manager.is_active("global", &[]).await);
        assert!(!manager.is_active_or("disabled", &[], true).await);
        assert!(manager.is_active_or("inherit", &[], true).await);
        assert!(!manager.is_active("inherit", &[]).await);
        assert!(manager.is_active_or("selective", &[], true).await);
        assert!(!manager.is_active("selective", &[]).await);
    }

    #[tokio::test]
    async fn test_custom_delimiter() {
        let manager = SwitchManager::builder(MemoryStore::with_switches(vec![
            Switch::new("a").with_status(SwitchStatus::Disabled),
            Switch::new("a.b").with_status(SwitchStatus::Global),
            Switch::new("x").with_status(SwitchStatus::Disabled),
            Switch::new("x:y").with_status(SwitchStatus::Global),
        ]))
        .delimiter('.')
        .build();

        assert!(!manager.is_active("a.b", &[]).await);
        assert!(manager.is_active("x:y", &[]).await);
    }

    #[test]
    fn test_panic_message() {
        let cause: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(cause.as_ref()), "boom");

        let cause: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(cause.as_ref()), "bang");

        let cause: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(cause.as_ref()), "evaluator panicked");
    }
}
