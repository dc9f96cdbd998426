//! Evaluation Context
//!
//! Call-scoped instances handed to condition sets, the ambient values bound
//! for one logical request, and the builtin context models.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// An arbitrary typed object passed to condition sets (a user, a request, ...).
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Wrap a value as an [`Instance`].
pub fn instance<T: Any + Send + Sync>(value: T) -> Instance {
    Arc::new(value)
}

/// The set of instances a condition set receives.
#[derive(Clone, Default)]
pub struct Instances {
    items: Vec<Instance>,
}

impl Instances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of explicit instances and the ambient context values.
    pub fn merged(explicit: &[Instance], ambient: &AmbientContext) -> Self {
        let mut items = explicit.to_vec();
        items.extend(ambient.values().cloned());
        Self { items }
    }

    /// Add an instance
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.items.push(instance(value));
        self
    }

    pub fn push(&mut self, item: Instance) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.items.iter()
    }

    /// Iterate over every instance of type `T`.
    pub fn of_type<T: Any>(&self) -> impl Iterator<Item = &T> {
        self.items
            .iter()
            .filter_map(|item| (**item).downcast_ref::<T>())
    }
}

impl fmt::Debug for Instances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instances")
            .field("len", &self.items.len())
            .finish()
    }
}

/// Values bound for one logical request (e.g. the current user).
///
/// Each request builds its own context and hands it to
/// [`SwitchManager::with_context`](crate::SwitchManager::with_context); nothing
/// is shared between concurrent evaluations.
#[derive(Clone, Default)]
pub struct AmbientContext {
    values: BTreeMap<String, Instance>,
}

impl AmbientContext {
    /// Binding name used for the acting user.
    pub const USER: &'static str = "user";

    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value under `name`
    pub fn bind<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.values.insert(name.into(), instance(value));
        self
    }

    /// Bind the current user
    pub fn with_user(self, user: User) -> Self {
        self.bind(Self::USER, user)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Instance) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.values.get(name)
    }

    pub fn get_as<T: Any>(&self, name: &str) -> Option<&T> {
        self.values
            .get(name)
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    pub fn values(&self) -> impl Iterator<Item = &Instance> {
        self.values.values()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Label of the acting user, or an empty string.
    ///
    /// The `user` binding may be a [`User`] or a JSON object carrying a
    /// `username` string.
    pub fn acting_username(&self) -> String {
        if let Some(user) = self.get_as::<User>(Self::USER) {
            return user.username.clone();
        }

        self.get_as::<serde_json::Value>(Self::USER)
            .and_then(|value| value.get("username"))
            .and_then(|name| name.as_str())
            .map(str::to_string)
            .unwrap_or_default()
    }
}

impl fmt::Debug for AmbientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientContext")
            .field("bindings", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// User model understood by the builtin user condition set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_staff(mut self, is_staff: bool) -> Self {
        self.is_staff = is_staff;
        self
    }

    pub fn with_superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = is_superuser;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Minimal request description for request-based condition sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub user: Option<User>,
    pub ip_address: Option<String>,
    pub host: Option<String>,
    pub query_string: Option<String>,
}

impl RequestInfo {
    /// Build a request from an optional user and IP address.
    pub fn new(user: Option<User>, ip_address: Option<String>) -> Self {
        Self {
            user,
            ip_address,
            ..Default::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_query_string(mut self, query: impl Into<String>) -> Self {
        self.query_string = Some(query.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_type_filters_instances() {
        let instances = Instances::new()
            .with(User::new("1", "alice"))
            .with(RequestInfo::new(None, Some("10.0.0.1".to_string())))
            .with(User::new("2", "bob"));

        let names: Vec<_> = instances
            .of_type::<User>()
            .map(|u| u.username.as_str())
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(instances.of_type::<RequestInfo>().count(), 1);
        assert_eq!(instances.of_type::<String>().count(), 0);
    }

    #[test]
    fn test_merged_includes_ambient_values() {
        let ambient = AmbientContext::new().with_user(User::new("1", "alice"));
        let explicit = vec![instance(RequestInfo::default())];

        let merged = Instances::merged(&explicit, &ambient);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.of_type::<User>().count(), 1);
    }

    #[test]
    fn test_acting_username() {
        let ctx = AmbientContext::new().with_user(User::new("1", "alice"));
        assert_eq!(ctx.acting_username(), "alice");

        let ctx = AmbientContext::new().bind(
            AmbientContext::USER,
            serde_json::json!({"username": "bob"}),
        );
        assert_eq!(ctx.acting_username(), "bob");

        let ctx = AmbientContext::new().bind(AmbientContext::USER, serde_json::json!({}));
        assert_eq!(ctx.acting_username(), "");

        assert_eq!(AmbientContext::new().acting_username(), "");
    }
}
