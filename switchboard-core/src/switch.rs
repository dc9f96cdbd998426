//! Switch Model
//!
//! A stored switch: key, status, and namespace-keyed condition payloads.

use crate::condition::{ConditionMode, FieldConditions};
use crate::error::ConditionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Namespace to opaque condition payload.
pub type Conditions = BTreeMap<String, Value>;

/// Switch status. Status alone decides whether conditions are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchStatus {
    /// Always inactive
    #[default]
    Disabled,
    /// Active according to conditions
    Selective,
    /// Always active
    Global,
    /// Follows the parent switch (or the caller's default)
    Inherit,
}

impl SwitchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchStatus::Disabled => "disabled",
            SwitchStatus::Selective => "selective",
            SwitchStatus::Global => "global",
            SwitchStatus::Inherit => "inherit",
        }
    }
}

impl fmt::Display for SwitchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored switch definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    /// Unique key; may encode hierarchy with a delimiter (`parent:child`)
    pub key: String,

    /// Human readable label
    pub label: Option<String>,

    /// Description
    pub description: Option<String>,

    /// Current status
    pub status: SwitchStatus,

    /// Condition payloads by namespace
    #[serde(default)]
    pub value: Conditions,

    pub date_created: DateTime<Utc>,

    pub date_modified: DateTime<Utc>,
}

impl Switch {
    /// Create a disabled switch with no conditions
    pub fn new(key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            label: None,
            description: None,
            status: SwitchStatus::Disabled,
            value: Conditions::new(),
            date_created: now,
            date_modified: now,
        }
    }

    pub fn with_status(mut self, status: SwitchStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the raw payload for a namespace
    pub fn with_payload(mut self, namespace: impl Into<String>, payload: Value) -> Self {
        self.value.insert(namespace.into(), payload);
        self
    }

    /// Builder form of [`Switch::add_condition`]
    pub fn with_condition(
        mut self,
        namespace: &str,
        field: &str,
        condition: impl Into<String>,
        mode: ConditionMode,
    ) -> Result<Self, ConditionError> {
        self.add_condition(namespace, field, condition, mode)?;
        Ok(self)
    }

    /// Parsed field conditions for a namespace; empty when absent.
    pub fn field_conditions(&self, namespace: &str) -> Result<FieldConditions, ConditionError> {
        match self.value.get(namespace) {
            Some(payload) => FieldConditions::from_payload(namespace, payload),
            None => Ok(FieldConditions::new()),
        }
    }

    pub fn add_condition(
        &mut self,
        namespace: &str,
        field: &str,
        condition: impl Into<String>,
        mode: ConditionMode,
    ) -> Result<(), ConditionError> {
        let mut conditions = self.field_conditions(namespace)?;
        conditions.add(field, condition, mode);
        self.value
            .insert(namespace.to_string(), conditions.to_payload());
        Ok(())
    }

    /// Remove a condition; returns whether it was present.
    pub fn remove_condition(
        &mut self,
        namespace: &str,
        field: &str,
        condition: &str,
    ) -> Result<bool, ConditionError> {
        let mut conditions = self.field_conditions(namespace)?;
        let removed = conditions.remove(field, condition);
        self.store_conditions(namespace, conditions);
        Ok(removed)
    }

    /// Clear one field of a namespace, or the whole namespace when `field` is `None`.
    pub fn clear_conditions(
        &mut self,
        namespace: &str,
        field: Option<&str>,
    ) -> Result<(), ConditionError> {
        let Some(field) = field else {
            self.value.remove(namespace);
            return Ok(());
        };
        let mut conditions = self.field_conditions(namespace)?;
        conditions.clear_field(field);
        self.store_conditions(namespace, conditions);
        Ok(())
    }

    fn store_conditions(&mut self, namespace: &str, conditions: FieldConditions) {
        if conditions.is_empty() {
            self.value.remove(namespace);
        } else {
            self.value
                .insert(namespace.to_string(), conditions.to_payload());
        }
    }
}
