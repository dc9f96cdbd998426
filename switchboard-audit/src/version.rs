//! Switch version records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use switchboard_core::{Switch, SwitchChange};
use uuid::Uuid;

/// Old and new value of a changed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub from: Value,
    pub to: Value,
}

/// What a version record captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VersionDelta {
    /// Full record of a new switch
    Created { record: Value },

    /// Fields that differ from the previously stored record
    Updated {
        added: BTreeMap<String, Value>,
        deleted: BTreeMap<String, Value>,
        changed: BTreeMap<String, FieldChange>,
    },

    Deleted,
}

impl VersionDelta {
    /// Compute the delta for a change.
    pub fn from_change(change: &SwitchChange) -> Result<Self, serde_json::Error> {
        Ok(match change {
            SwitchChange::Created(switch) => VersionDelta::Created {
                record: serde_json::to_value(switch)?,
            },
            SwitchChange::Updated { previous, current } => diff(previous, current)?,
            SwitchChange::Deleted(_) => VersionDelta::Deleted,
        })
    }

    /// Whether an update touched nothing
    pub fn is_empty(&self) -> bool {
        match self {
            VersionDelta::Updated {
                added,
                deleted,
                changed,
            } => added.is_empty() && deleted.is_empty() && changed.is_empty(),
            _ => false,
        }
    }
}

/// Immutable record of one switch write
///
/// # Examples
///
/// ```
/// use switchboard_audit::*;
/// use switchboard_core::{Switch, SwitchChange};
///
/// let change = SwitchChange::Created(Switch::new("checkout"));
/// let version = SwitchVersion::from_change(&change, "alice").unwrap();
///
/// assert_eq!(version.switch_key, "checkout");
/// assert_eq!(version.username, "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchVersion {
    pub id: String,
    pub switch_key: String,
    pub timestamp: DateTime<Utc>,

    /// Acting user; empty when none was bound
    pub username: String,

    pub delta: VersionDelta,
}

impl SwitchVersion {
    pub fn from_change(
        change: &SwitchChange,
        username: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            switch_key: change.key().to_string(),
            timestamp: Utc::now(),
            username: username.into(),
            delta: VersionDelta::from_change(change)?,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Diff two records of the same switch.
///
/// Condition payloads are compared per namespace under `value.<namespace>`.
/// `date_modified` is ignored.
pub fn diff(previous: &Switch, current: &Switch) -> Result<VersionDelta, serde_json::Error> {
    let before = flatten(previous)?;
    let mut after = flatten(current)?;

    let mut deleted = BTreeMap::new();
    let mut changed = BTreeMap::new();
    for (field, old) in before {
        match after.remove(&field) {
            Some(new) if new != old => {
                changed.insert(field, FieldChange { from: old, to: new });
            }
            Some(_) => {}
            None => {
                deleted.insert(field, old);
            }
        }
    }

    Ok(VersionDelta::Updated {
        added: after,
        deleted,
        changed,
    })
}

fn flatten(switch: &Switch) -> Result<BTreeMap<String, Value>, serde_json::Error> {
    let record = match serde_json::to_value(switch)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let mut fields = BTreeMap::new();
    for (name, value) in record {
        match (name.as_str(), value) {
            ("date_modified", _) => {}
            ("value", Value::Object(namespaces)) => {
                for (namespace, payload) in namespaces {
                    fields.insert(format!("value.{}", namespace), payload);
                }
            }
            (_, value) => {
                fields.insert(name, value);
            }
        }
    }
    Ok(fields)
}
