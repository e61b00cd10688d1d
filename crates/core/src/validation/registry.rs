//! Built-in rule and key-check registries, held by [`ValidatorConfig`].
//!
//! The defaults carry Russian-language messages. Every message
//! can be replaced by loading a JSON configuration file; sections missing
//! from the file keep their defaults.

use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::PathDelimiters;

/// Name of the built-in rule that marks a field as mandatory.
pub const REQUIRED: &str = "required";

/// A regex-backed rule referenced by name from rule settings.
#[derive(Debug, Clone)]
pub struct BuiltinRule {
    pub pattern: Regex,
    pub message: String,
}

impl BuiltinRule {
    pub fn new(pattern: &str, message: impl Into<String>) -> Result<Self, CoreError> {
        let compiled = Regex::new(pattern).map_err(|source| CoreError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: compiled,
            message: message.into(),
        })
    }
}

/// Where a top-level field's values must exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRule {
    pub table: String,
    pub column: String,
    pub message: String,
    /// Check the keys of the field's mapping instead of its values.
    #[serde(default)]
    pub use_keys: bool,
}

impl KeyRule {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            message: message.into(),
            use_keys: false,
        }
    }

    /// Take candidates from the keys of the field's mapping.
    pub fn using_keys(mut self) -> Self {
        self.use_keys = true;
        self
    }
}

/// Field name to key-check settings, in check order.
pub type KeyRegistry = IndexMap<String, KeyRule>;

/// Message templates that are not tied to a registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    /// Failure message of the `range` check; `{min}` and `{max}` are replaced
    /// by the bounds.
    pub range: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            range: "Пожалуйста, введите число от {min} до {max}.".to_string(),
        }
    }
}

/// Process-wide validation configuration.
///
/// Built once at startup and shared read-only (wrap in an `Arc` to share it
/// between validators).
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub rules: IndexMap<String, BuiltinRule>,
    pub keys: KeyRegistry,
    pub delimiters: PathDelimiters,
    pub messages: Messages,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            keys: default_keys(),
            delimiters: PathDelimiters::default(),
            messages: Messages::default(),
        }
    }
}

/// On-disk shape of [`ValidatorConfig`]. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    rules: Option<IndexMap<String, RuleEntry>>,
    keys: Option<KeyRegistry>,
    delimiters: Option<PathDelimiters>,
    messages: Option<Messages>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    pattern: String,
    message: String,
}

impl ValidatorConfig {
    /// Parse a JSON configuration document.
    ///
    /// ```json
    /// {
    ///   "rules": { "digits": { "pattern": "^\\d+$", "message": "Digits only." } },
    ///   "keys": { "party_id": { "table": "parties", "column": "party_id", "message": "No such party" } },
    ///   "delimiters": { "left": "[", "right": "]" },
    ///   "messages": { "range": "Enter a number from {min} to {max}." }
    /// }
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let file: ConfigFile =
            serde_json::from_str(json).map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        let defaults = Self::default();

        let rules = match file.rules {
            Some(entries) => entries
                .into_iter()
                .map(|(name, entry)| {
                    BuiltinRule::new(&entry.pattern, entry.message).map(|rule| (name, rule))
                })
                .collect::<Result<IndexMap<_, _>, _>>()?,
            None => defaults.rules,
        };

        Ok(Self {
            rules,
            keys: file.keys.unwrap_or(defaults.keys),
            delimiters: file.delimiters.unwrap_or(defaults.delimiters),
            messages: file.messages.unwrap_or(defaults.messages),
        })
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            rules = config.rules.len(),
            keys = config.keys.len(),
            "Loaded validator configuration"
        );
        Ok(config)
    }

    /// Look up a built-in rule by name.
    pub fn builtin(&self, name: &str) -> Result<&BuiltinRule, CoreError> {
        self.rules
            .get(name)
            .ok_or_else(|| CoreError::UnknownRule(name.to_string()))
    }

    /// Build a key registry holding only the named fields, in the given order.
    pub fn select_keys<S: AsRef<str>>(&self, fields: &[S]) -> Result<KeyRegistry, CoreError> {
        fields
            .iter()
            .map(|field| {
                let field = field.as_ref();
                self.keys
                    .get(field)
                    .map(|rule| (field.to_string(), rule.clone()))
                    .ok_or_else(|| CoreError::UnknownKeyField(field.to_string()))
            })
            .collect()
    }
}

fn default_rules() -> IndexMap<String, BuiltinRule> {
    [
        (REQUIRED, r"\w+", "Это поле необходимо заполнить."),
        ("digits", r"^\d+$", "Пожалуйста, вводите только цифры."),
        ("number", r"^[0-9]+(?:\.[0-9]*)?$", "Пожалуйста, введите число."),
    ]
    .into_iter()
    .map(|(name, pattern, message)| {
        let rule = BuiltinRule {
            pattern: Regex::new(pattern).expect("valid regex"),
            message: message.to_string(),
        };
        (name.to_string(), rule)
    })
    .collect()
}

fn default_keys() -> KeyRegistry {
    const DISTRICT: &str = "Такого округа не существует";
    const AREA: &str = "Такого участка не существует";
    const PARTY: &str = "Такой партии не существует";
    const MAJORITARIAN: &str = "Такого мажоритарного кандидата не существует";

    [
        ("district_id", KeyRule::new("districts", "district_id", DISTRICT)),
        ("area_id", KeyRule::new("areas", "area_id", AREA)),
        ("party_id", KeyRule::new("parties", "party_id", PARTY)),
        (
            "majoritarian_id",
            KeyRule::new("majoritarians", "majoritarian_id", MAJORITARIAN),
        ),
        (
            "parties",
            KeyRule::new("parties", "party_id", PARTY).using_keys(),
        ),
        (
            "majoritarians",
            KeyRule::new("majoritarians", "majoritarian_id", MAJORITARIAN).using_keys(),
        ),
    ]
    .into_iter()
    .map(|(field, rule)| (field.to_string(), rule))
    .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
