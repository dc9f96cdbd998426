//! Condition Sets
//!
//! The extension surface for targeting strategies: a [`ConditionSet`] judges
//! the condition payload stored under its namespace in a switch. Also holds
//! the field helpers used by field-structured payloads.

use crate::context::Instances;
use crate::error::ConditionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;

/// Outcome of one condition set for one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Active,
    Inactive,
    Abstain,
}

/// A pluggable evaluator for one namespace.
///
/// `has_active_condition` may be called concurrently from many evaluations
/// and must not depend on hidden state or produce side effects.
pub trait ConditionSet: Send + Sync {
    /// Unique identifier, stable across restarts
    fn id(&self) -> &str;

    /// Namespace this set evaluates within a switch's conditions
    fn namespace(&self) -> &str;

    /// Label used to order sets when listing
    fn group_label(&self) -> &str;

    /// Parameters a payload for this namespace may contain
    fn fields(&self) -> &[Field];

    /// Decide activation for this namespace's payload alone.
    fn has_active_condition(
        &self,
        payload: &Value,
        instances: &Instances,
    ) -> Result<Vote, ConditionError>;

    /// Look up one field by name
    fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name == name)
    }
}

/// Whether a field condition includes or excludes matching instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionMode {
    Include,
    Exclude,
}

/// Comparison operator for text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
}

/// How a field interprets its condition strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "operator", rename_all = "lowercase")]
pub enum FieldKind {
    /// `"true"` or `"false"`, compared against the instance value
    Boolean,
    /// Text comparison with an operator
    Text(Operator),
    /// Inclusive numeric range `"lo-hi"`
    Range,
    /// Percentage bucket range `"lo-hi"` within `0..=100`
    Percent,
}

/// A configurable parameter of a condition set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub help_text: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            help_text: None,
        }
    }

    pub fn boolean(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Boolean)
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>, operator: Operator) -> Self {
        Self::new(name, label, FieldKind::Text(operator))
    }

    pub fn range(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Range)
    }

    pub fn percent(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Percent)
    }

    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    /// Check that `condition` is well formed for this field.
    pub fn validate(&self, condition: &str) -> Result<(), ConditionError> {
        match self.kind {
            FieldKind::Boolean => self.parse_bool(condition).map(|_| ()),
            FieldKind::Text(Operator::Matches) => self.compile(condition).map(|_| ()),
            FieldKind::Text(_) => Ok(()),
            FieldKind::Range => self.parse_range(condition).map(|_| ()),
            FieldKind::Percent => self.parse_percent(condition).map(|_| ()),
        }
    }

    /// Whether `condition` matches the instance's value for this field.
    ///
    /// A missing value only matches `NotIn`.
    pub fn is_active(&self, condition: &str, value: Option<&str>) -> Result<bool, ConditionError> {
        match self.kind {
            FieldKind::Boolean => {
                let expected = self.parse_bool(condition)?;
                Ok(value.and_then(parse_bool) == Some(expected))
            }
            FieldKind::Text(operator) => self.matches_text(operator, condition, value),
            FieldKind::Range => {
                let (lo, hi) = self.parse_range(condition)?;
                Ok(value
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .is_some_and(|v| lo <= v && v <= hi))
            }
            FieldKind::Percent => {
                let (lo, hi) = self.parse_percent(condition)?;
                Ok(value.is_some_and(|v| {
                    let bucket = percent_bucket(&self.name, v);
                    lo <= bucket && bucket < hi
                }))
            }
        }
    }

    fn matches_text(
        &self,
        operator: Operator,
        condition: &str,
        value: Option<&str>,
    ) -> Result<bool, ConditionError> {
        let listed = || condition.split(',').map(str::trim);

        Ok(match operator {
            Operator::In => value.is_some_and(|v| listed().any(|c| c == v)),
            Operator::NotIn => value.is_none_or(|v| !listed().any(|c| c == v)),
            Operator::Contains => value.is_some_and(|v| v.contains(condition)),
            Operator::StartsWith => value.is_some_and(|v| v.starts_with(condition)),
            Operator::EndsWith => value.is_some_and(|v| v.ends_with(condition)),
            Operator::Matches => {
                let pattern = self.compile(condition)?;
                value.is_some_and(|v| pattern.is_match(v))
            }
        })
    }

    fn compile(&self, condition: &str) -> Result<Regex, ConditionError> {
        Regex::new(condition)
            .map_err(|e| ConditionError::invalid(&self.name, condition, e.to_string()))
    }

    fn parse_bool(&self, condition: &str) -> Result<bool, ConditionError> {
        parse_bool(condition)
            .ok_or_else(|| ConditionError::invalid(&self.name, condition, "expected true or false"))
    }

    fn parse_range(&self, condition: &str) -> Result<(f64, f64), ConditionError> {
        let invalid = || ConditionError::invalid(&self.name, condition, "expected lo-hi");
        let (lo, hi) = condition.split_once('-').ok_or_else(invalid)?;
        let lo: f64 = lo.trim().parse().map_err(|_| invalid())?;
        let hi: f64 = hi.trim().parse().map_err(|_| invalid())?;
        if lo > hi {
            return Err(ConditionError::invalid(
                &self.name,
                condition,
                "lower bound exceeds upper bound",
            ));
        }
        Ok((lo, hi))
    }

    fn parse_percent(&self, condition: &str) -> Result<(u8, u8), ConditionError> {
        let invalid = || ConditionError::invalid(&self.name, condition, "expected lo-hi within 0-100");
        let (lo, hi) = condition.split_once('-').ok_or_else(invalid)?;
        let lo: u8 = lo.trim().parse().map_err(|_| invalid())?;
        let hi: u8 = hi.trim().parse().map_err(|_| invalid())?;
        if lo >= hi || hi > 100 {
            return Err(invalid());
        }
        Ok((lo, hi))
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Stable bucket in `0..100` for a value.
pub fn percent_bucket(salt: &str, value: &str) -> u8 {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(value.as_bytes());
    let result = hasher.finalize();

    let sample = u16::from_be_bytes([result[0], result[1]]) as u32;
    ((sample * 100) >> 16) as u8
}

/// Field-structured payload: field name to `(mode, condition)` pairs.
///
/// Serialized as `{"field": [["include", "value"], ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldConditions(BTreeMap<String, Vec<(ConditionMode, String)>>);

impl FieldConditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a namespace payload.
    pub fn from_payload(namespace: &str, payload: &Value) -> Result<Self, ConditionError> {
        serde_json::from_value(payload.clone()).map_err(|e| ConditionError::MalformedPayload {
            namespace: namespace.to_string(),
            reason: e.to_string(),
        })
    }

    /// Encode back into a namespace payload.
    pub fn to_payload(&self) -> Value {
        let map = self
            .0
            .iter()
            .map(|(field, entries)| {
                let entries = entries
                    .iter()
                    .map(|(mode, condition)| {
                        let mode = match mode {
                            ConditionMode::Include => "include",
                            ConditionMode::Exclude => "exclude",
                        };
                        Value::Array(vec![Value::from(mode), Value::from(condition.as_str())])
                    })
                    .collect();
                (field.clone(), Value::Array(entries))
            })
            .collect();
        Value::Object(map)
    }

    pub fn get(&self, field: &str) -> Option<&[(ConditionMode, String)]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Add a condition, ignoring exact duplicates.
    pub fn add(&mut self, field: &str, condition: impl Into<String>, mode: ConditionMode) {
        let condition = condition.into();
        let entries = self.0.entry(field.to_string()).or_default();
        if !entries.iter().any(|(m, c)| *m == mode && *c == condition) {
            entries.push((mode, condition));
        }
    }

    /// Remove a condition; empty fields are dropped. Returns whether anything was removed.
    pub fn remove(&mut self, field: &str, condition: &str) -> bool {
        let Some(entries) = self.0.get_mut(field) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(_, c)| c != condition);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.0.remove(field);
        }
        removed
    }

    pub fn clear_field(&mut self, field: &str) {
        self.0.remove(field);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<(ConditionMode, String)>)> {
        self.0.iter()
    }
}

/// Evaluate a field-structured payload against every instance of model `M`.
///
/// Per instance, a matching `exclude` condition votes Inactive at once and a
/// matching `include` condition votes Active. Across instances any Inactive
/// vote wins.
pub fn evaluate_field_conditions<M, F>(
    namespace: &str,
    fields: &[Field],
    payload: &Value,
    instances: &Instances,
    field_value: F,
) -> Result<Vote, ConditionError>
where
    M: Any,
    F: Fn(&M, &str) -> Option<String>,
{
    let conditions = FieldConditions::from_payload(namespace, payload)?;
    let mut vote = Vote::Abstain;

    for model in instances.of_type::<M>() {
        match model_vote(fields, &conditions, |field| field_value(model, field))? {
            Vote::Inactive => return Ok(Vote::Inactive),
            Vote::Active => vote = Vote::Active,
            Vote::Abstain => {}
        }
    }

    Ok(vote)
}

fn model_vote(
    fields: &[Field],
    conditions: &FieldConditions,
    field_value: impl Fn(&str) -> Option<String>,
) -> Result<Vote, ConditionError> {
    let mut vote = Vote::Abstain;

    for field in fields {
        let Some(entries) = conditions.get(&field.name) else {
            continue;
        };
        let value = field_value(&field.name);

        for (mode, condition) in entries {
            if field.is_active(condition, value.as_deref())? {
                match mode {
                    ConditionMode::Exclude => return Ok(Vote::Inactive),
                    ConditionMode::Include => vote = Vote::Active,
                }
            }
        }
    }

    Ok(vote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_operators() {
        let field = Field::text("email", "Email", Operator::EndsWith);
        assert!(field.is_active("@example.com", Some("a@example.com")).unwrap());
        assert!(!field.is_active("@example.com", Some("a@other.com")).unwrap());
        assert!(!field.is_active("@example.com", None).unwrap());

        let field = Field::text("username", "Username", Operator::In);
        assert!(field.is_active("alice, bob", Some("bob")).unwrap());
        assert!(!field.is_active("alice, bob", Some("carol")).unwrap());

        let field = Field::text("username", "Username", Operator::NotIn);
        assert!(field.is_active("alice", Some("carol")).unwrap());
        assert!(field.is_active("alice", None).unwrap());
    }

    #[test]
    fn test_regex_field() {
        let field = Field::text("path", "Path", Operator::Matches);
        assert!(field.is_active("^/api/v[0-9]+", Some("/api/v2/users")).unwrap());
        assert!(field.validate("(unclosed").is_err());
        assert!(field.is_active("(unclosed", Some("x")).is_err());
    }

    #[test]
    fn test_range_field() {
        let field = Field::range("age", "Age");
        assert!(field.is_active("18-65", Some("30")).unwrap());
        assert!(field.is_active("18-65", Some("65")).unwrap());
        assert!(!field.is_active("18-65", Some("70")).unwrap());
        assert!(!field.is_active("18-65", Some("abc")).unwrap());
        assert!(field.validate("65-18").is_err());
        assert!(field.validate("18").is_err());
    }

    #[test]
    fn test_percent_field() {
        let field = Field::percent("percent", "Percent");
        assert!(field.is_active("0-100", Some("anyone")).unwrap());
        assert!(field.validate("50-50").is_err());
        assert!(field.validate("0-101").is_err());

        let mut enabled = 0;
        for i in 0..1000 {
            if field.is_active("0-50", Some(&format!("user-{}", i))).unwrap() {
                enabled += 1;
            }
        }
        assert!((400..=600).contains(&enabled));
    }

    #[test]
    fn test_percent_bucket_is_stable() {
        assert_eq!(percent_bucket("percent", "user-1"), percent_bucket("percent", "user-1"));
        assert!(percent_bucket("percent", "user-1") < 100);
    }

    #[test]
    fn test_boolean_field() {
        let field = Field::boolean("is_staff", "Staff");
        assert!(field.is_active("true", Some("true")).unwrap());
        assert!(!field.is_active("true", Some("false")).unwrap());
        assert!(field.validate("maybe").is_err());
    }

    #[test]
    fn test_field_conditions_payload_shape() {
        let mut conditions = FieldConditions::new();
        conditions.add("username", "alice", ConditionMode::Include);
        conditions.add("username", "alice", ConditionMode::Include);
        conditions.add("username", "bob", ConditionMode::Exclude);

        let payload = conditions.to_payload();
        assert_eq!(
            payload,
            json!({"username": [["include", "alice"], ["exclude", "bob"]]})
        );
        assert_eq!(
            FieldConditions::from_payload("user", &payload).unwrap(),
            conditions
        );

        assert!(conditions.remove("username", "alice"));
        assert!(conditions.remove("username", "bob"));
        assert!(conditions.is_empty());
    }

    #[test]
    fn test_malformed_payload() {
        let err = FieldConditions::from_payload("user", &json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ConditionError::MalformedPayload { .. }));
    }

    #[test]
    fn test_exclude_vetoes_include() {
        let fields = vec![Field::text("name", "Name", Operator::In)];
        let payload = json!({"name": [["include", "alice"], ["exclude", "alice"]]});
        let instances = Instances::new().with("alice".to_string());

        let vote = evaluate_field_conditions::<String, _>("name", &fields, &payload, &instances, |s, _| {
            Some(s.clone())
        })
        .unwrap();
        assert_eq!(vote, Vote::Inactive);
    }

    #[test]
    fn test_no_model_instances_abstains() {
        let fields = vec![Field::text("name", "Name", Operator::In)];
        let payload = json!({"name": [["include", "alice"]]});

        let vote = evaluate_field_conditions::<String, _>(
            "name",
            &fields,
            &payload,
            &Instances::new().with(42u32),
            |s, _| Some(s.clone()),
        )
        .unwrap();
        assert_eq!(vote, Vote::Abstain);
    }
}
