//! Key checker: confirms that referenced identifiers exist in the store.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use super::evaluator::Validator;
use super::registry::KeyRegistry;
use super::rules::{ErrorEntry, ValidationErrors};
use super::store::KeyStore;
use super::value::{is_blank, text_of};
use crate::error::CoreError;

/// Which key checks [`Validator::validate`] runs after the rules pass.
#[derive(Debug, Clone, Default)]
pub enum KeyCheck {
    /// No key checks.
    #[default]
    Skip,
    /// Every entry of the configured key registry.
    Registered,
    /// The named entries of the configured key registry.
    Only(Vec<String>),
    /// A caller-supplied registry. An empty one means the configured registry.
    Using(KeyRegistry),
}

/// Values whose existence is being checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    /// A single value; a failure is reported as a plain message.
    Scalar(String),
    /// Several values; a failure is reported per missing value.
    Collection(Vec<String>),
}

impl Candidates {
    /// Candidates taken from a field's value: the items of an array, the
    /// values of an object, or the value itself.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::Collection(items.iter().map(owned_text).collect()),
            Value::Object(map) => Self::Collection(map.values().map(owned_text).collect()),
            scalar => Self::Scalar(owned_text(scalar)),
        }
    }

    /// Candidates taken from the keys of a field's value: object keys or
    /// array indices. A scalar is checked as itself.
    pub fn keys_of(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::Collection(map.keys().cloned().collect()),
            Value::Array(items) => Self::Collection((0..items.len()).map(|i| i.to_string()).collect()),
            scalar => Self::Scalar(owned_text(scalar)),
        }
    }

    fn into_distinct(self) -> (IndexSet<String>, bool) {
        match self {
            Self::Scalar(value) => (IndexSet::from([value]), false),
            Self::Collection(values) => (values.into_iter().collect(), true),
        }
    }
}

fn owned_text(value: &Value) -> String {
    text_of(value).into_owned()
}

impl From<&str> for Candidates {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for Candidates {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<String>> for Candidates {
    fn from(values: Vec<String>) -> Self {
        Self::Collection(values)
    }
}

impl<S> Validator<S> {
    /// Turn a [`KeyCheck`] into the registry to run, `None` for [`KeyCheck::Skip`].
    pub(crate) fn resolve_key_check(
        &self,
        key_check: &KeyCheck,
    ) -> Result<Option<KeyRegistry>, CoreError> {
        match key_check {
            KeyCheck::Skip => Ok(None),
            KeyCheck::Registered => Ok(Some(self.config().keys.clone())),
            KeyCheck::Only(fields) => self.config().select_keys(fields).map(Some),
            KeyCheck::Using(spec) => Ok(Some(spec.clone())),
        }
    }
}

impl<S: KeyStore> Validator<S> {
    /// Check the top-level fields of `data` named in `spec` (or the configured
    /// registry when `spec` is `None` or empty) against the store.
    ///
    /// Absent and blank fields are skipped. Only failing fields appear in the
    /// result. With `first_error_only`, checking stops at the first failure.
    pub async fn validate_keys(
        &self,
        data: &Value,
        spec: Option<&KeyRegistry>,
        first_error_only: bool,
    ) -> Result<ValidationErrors, CoreError> {
        let spec = match spec {
            Some(spec) if !spec.is_empty() => spec,
            _ => &self.config().keys,
        };
        let mut errors = ValidationErrors::new();
        let Some(document) = data.as_object() else {
            return Ok(errors);
        };

        for (field, key_rule) in spec {
            let Some(value) = document.get(field) else {
                continue;
            };
            if is_blank(value) {
                continue;
            }

            let candidates = if key_rule.use_keys {
                Candidates::keys_of(value)
            } else {
                Candidates::from_value(value)
            };
            let entry = self
                .validate_key(&key_rule.table, &key_rule.column, candidates, &key_rule.message)
                .await?;

            if let Some(entry) = entry {
                errors.insert(field.clone(), entry);
                if first_error_only {
                    break;
                }
            }
        }

        tracing::debug!(
            checked = spec.len(),
            errors = errors.len(),
            "Evaluated key checks"
        );
        Ok(errors)
    }

    /// Check that every candidate exists in `table.column`.
    ///
    /// Returns `None` when all exist. Otherwise a scalar candidate yields
    /// `message` itself and a collection yields each missing value mapped to
    /// `message`.
    pub async fn validate_key(
        &self,
        table: &str,
        column: &str,
        candidates: impl Into<Candidates>,
        message: &str,
    ) -> Result<Option<ErrorEntry>, CoreError> {
        let (distinct, is_collection) = candidates.into().into_distinct();
        if distinct.is_empty() {
            return Ok(None);
        }

        let values: Vec<String> = distinct.into_iter().collect();
        let existing = self
            .store()
            .existing_values(table, column, &values)
            .await
            .map_err(|e| {
                tracing::warn!(table, column, error = %e, "Key store query failed");
                CoreError::Store {
                    table: table.to_string(),
                    column: column.to_string(),
                    source: Box::new(e),
                }
            })?;

        let missing: Vec<String> = values
            .into_iter()
            .filter(|value| !existing.contains(value))
            .collect();
        tracing::debug!(
            table,
            column,
            found = existing.len(),
            missing = missing.len(),
            "Checked key existence"
        );

        if missing.is_empty() {
            return Ok(None);
        }
        if !is_collection {
            return Ok(Some(ErrorEntry::Message(message.to_string())));
        }
        let per_value: IndexMap<String, String> = missing
            .into_iter()
            .map(|value| (value, message.to_string()))
            .collect();
        Ok(Some(ErrorEntry::PerValue(per_value)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
