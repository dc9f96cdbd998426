// Switchboard runtime settings

use crate::validation::{ConfigValidator, Validate};
use crate::Result;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Runtime settings for a switch manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Persist a disabled switch when an undefined key is checked
    #[serde(deserialize_with = "flag")]
    pub auto_create: bool,

    /// Hierarchy delimiter
    pub delimiter: char,

    /// Register the builtin condition sets
    #[serde(deserialize_with = "flag")]
    pub register_builtins: bool,

    /// Record switch versions
    #[serde(deserialize_with = "flag")]
    pub versioning: bool,

    /// JSON-lines file for version records
    #[serde(deserialize_with = "optional_text")]
    pub version_log: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_create: false,
            delimiter: ':',
            register_builtins: true,
            versioning: true,
            version_log: None,
        }
    }
}

/// A scalar as it arrives from environment variables or files.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    match Scalar::deserialize(deserializer)? {
        Scalar::Bool(value) => Ok(value),
        Scalar::Int(1) => Ok(true),
        Scalar::Int(0) => Ok(false),
        Scalar::Text(text) => match text.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(de::Error::custom(format!("expected a boolean, found {:?}", other))),
        },
        Scalar::Int(other) => Err(de::Error::custom(format!(
            "expected a boolean, found {}",
            other
        ))),
        Scalar::Float(other) => Err(de::Error::custom(format!(
            "expected a boolean, found {}",
            other
        ))),
    }
}

fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Bool(value) => value.to_string(),
        Scalar::Int(value) => value.to_string(),
        Scalar::Float(value) => value.to_string(),
        Scalar::Text(value) => value,
    }))
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::is_delimiter(self.delimiter, "delimiter")?;
        if let Some(path) = &self.version_log {
            ConfigValidator::not_empty(path, "version_log")?;
        }
        Ok(())
    }
}
