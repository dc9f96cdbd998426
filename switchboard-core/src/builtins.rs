//! Builtin condition sets for users and requests.

use crate::condition::{evaluate_field_conditions, ConditionSet, Field, Operator, Vote};
use crate::context::{Instances, RequestInfo, User};
use crate::error::ConditionError;
use crate::registry::ConditionRegistry;
use serde_json::Value;

/// Register every builtin condition set.
pub fn register_builtins(registry: &ConditionRegistry) {
    registry.register(UserConditionSet::new());
    registry.register(IpAddressConditionSet::new());
    registry.register(HostConditionSet::new());
    registry.register(QueryStringConditionSet::new());
}

/// Targets [`User`] instances.
pub struct UserConditionSet {
    fields: Vec<Field>,
}

impl UserConditionSet {
    pub const ID: &'static str = "switchboard.builtins.UserConditionSet";
    pub const NAMESPACE: &'static str = "user";

    pub fn new() -> Self {
        Self {
            fields: vec![
                Field::text("username", "Username", Operator::In)
                    .with_help_text("Comma separated list of usernames"),
                Field::text("email", "Email", Operator::EndsWith)
                    .with_help_text("Email suffix, e.g. @example.com"),
                Field::boolean("is_staff", "Staff"),
                Field::boolean("is_superuser", "Superuser"),
                Field::percent("percent", "Percent of users")
                    .with_help_text("Bucket range lo-hi, bucketed by user id"),
            ],
        }
    }

    fn field_value(user: &User, field: &str) -> Option<String> {
        match field {
            "username" => Some(user.username.clone()),
            "email" => user.email.clone(),
            "is_staff" => Some(user.is_staff.to_string()),
            "is_superuser" => Some(user.is_superuser.to_string()),
            "percent" => Some(user.id.clone()).filter(|id| !id.is_empty()),
            _ => None,
        }
    }
}

impl Default for UserConditionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionSet for UserConditionSet {
    fn id(&self) -> &str {
        Self::ID
    }

    fn namespace(&self) -> &str {
        Self::NAMESPACE
    }

    fn group_label(&self) -> &str {
        "User"
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn has_active_condition(
        &self,
        payload: &Value,
        instances: &Instances,
    ) -> Result<Vote, ConditionError> {
        evaluate_field_conditions::<User, _>(
            Self::NAMESPACE,
            &self.fields,
            payload,
            instances,
            Self::field_value,
        )
    }
}

/// Targets the client IP address of [`RequestInfo`] instances.
pub struct IpAddressConditionSet {
    fields: Vec<Field>,
}

impl IpAddressConditionSet {
    pub const ID: &'static str = "switchboard.builtins.IpAddressConditionSet";
    pub const NAMESPACE: &'static str = "ip_address";

    pub fn new() -> Self {
        Self {
            fields: vec![
                Field::text("ip_address", "IP Address", Operator::In),
                Field::percent("percent", "Percent of addresses"),
            ],
        }
    }

    fn field_value(request: &RequestInfo, field: &str) -> Option<String> {
        match field {
            "ip_address" | "percent" => request.ip_address.clone(),
            _ => None,
        }
    }
}

impl Default for IpAddressConditionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionSet for IpAddressConditionSet {
    fn id(&self) -> &str {
        Self::ID
    }

    fn namespace(&self) -> &str {
        Self::NAMESPACE
    }

    fn group_label(&self) -> &str {
        "IP Address"
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn has_active_condition(
        &self,
        payload: &Value,
        instances: &Instances,
    ) -> Result<Vote, ConditionError> {
        evaluate_field_conditions::<RequestInfo, _>(
            Self::NAMESPACE,
            &self.fields,
            payload,
            instances,
            Self::field_value,
        )
    }
}

/// Targets the host a [`RequestInfo`] was served for.
pub struct HostConditionSet {
    fields: Vec<Field>,
}

impl HostConditionSet {
    pub const ID: &'static str = "switchboard.builtins.HostConditionSet";
    pub const NAMESPACE: &'static str = "host";

    pub fn new() -> Self {
        Self {
            fields: vec![Field::text("hostname", "Hostname", Operator::In)],
        }
    }
}

impl Default for HostConditionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionSet for HostConditionSet {
    fn id(&self) -> &str {
        Self::ID
    }

    fn namespace(&self) -> &str {
        Self::NAMESPACE
    }

    fn group_label(&self) -> &str {
        "Host"
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn has_active_condition(
        &self,
        payload: &Value,
        instances: &Instances,
    ) -> Result<Vote, ConditionError> {
        evaluate_field_conditions::<RequestInfo, _>(
            Self::NAMESPACE,
            &self.fields,
            payload,
            instances,
            |request: &RequestInfo, _| request.host.clone(),
        )
    }
}

/// Targets substrings of a [`RequestInfo`] query string.
pub struct QueryStringConditionSet {
    fields: Vec<Field>,
}

impl QueryStringConditionSet {
    pub const ID: &'static str = "switchboard.builtins.QueryStringConditionSet";
    pub const NAMESPACE: &'static str = "querystring";

    pub fn new() -> Self {
        Self {
            fields: vec![Field::text("value", "Query String", Operator::Contains)],
        }
    }
}

impl Default for QueryStringConditionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionSet for QueryStringConditionSet {
    fn id(&self) -> &str {
        Self::ID
    }

    fn namespace(&self) -> &str {
        Self::NAMESPACE
    }

    fn group_label(&self) -> &str {
        "Query String"
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn has_active_condition(
        &self,
        payload: &Value,
        instances: &Instances,
    ) -> Result<Vote, ConditionError> {
        evaluate_field_conditions::<RequestInfo, _>(
            Self::NAMESPACE,
            &self.fields,
            payload,
            instances,
            |request: &RequestInfo, _| request.query_string.clone(),
        )
    }
}
