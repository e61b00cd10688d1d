//! Custom checks: named validation routines that are not a single regex.
//!
//! A rule setting `{"<name>": <payload>}` dispatches to the check registered
//! under `<name>`. `range` is registered by default; callers add their own
//! with [`CustomChecks::register`] or
//! [`Validator::register_check`](super::evaluator::Validator::register_check).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::registry::Messages;
use super::value::{number_of, number_text};
use crate::error::CoreError;

/// Name of the built-in numeric range check.
pub const RANGE: &str = "range";

/// A named check over one field value.
pub trait CustomCheck: Send + Sync {
    /// Check `value` against `payload`. Returns the failure message, or
    /// `None` when the value passes.
    fn check(&self, value: &Value, name: &str, payload: &Value)
        -> Result<Option<String>, CoreError>;

    /// Reject a malformed payload before any field is evaluated.
    fn validate_payload(&self, _name: &str, _payload: &Value) -> Result<(), CoreError> {
        Ok(())
    }
}

impl<F> CustomCheck for F
where
    F: Fn(&Value, &str, &Value) -> Result<Option<String>, CoreError> + Send + Sync,
{
    fn check(
        &self,
        value: &Value,
        name: &str,
        payload: &Value,
    ) -> Result<Option<String>, CoreError> {
        self(value, name, payload)
    }
}

/// Inclusive numeric range check with a `[min, max]` payload.
///
/// Bounds may be numbers or numeric strings. A value that does not read as a
/// number is out of range.
#[derive(Debug, Clone)]
pub struct RangeCheck {
    message: String,
}

impl RangeCheck {
    /// `message` may contain `{min}` and `{max}` placeholders.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

struct Bound {
    value: f64,
    text: String,
}

fn bound(name: &str, raw: &Value) -> Result<Bound, CoreError> {
    let value = number_of(raw).ok_or_else(|| CoreError::InvalidPayload {
        check: name.to_string(),
        reason: format!("bound {raw} is not a number"),
    })?;
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => number_text(n),
        other => other.to_string(),
    };
    Ok(Bound { value, text })
}

fn bounds(name: &str, payload: &Value) -> Result<(Bound, Bound), CoreError> {
    match payload.as_array().map(Vec::as_slice) {
        Some([min, max]) => Ok((bound(name, min)?, bound(name, max)?)),
        _ => Err(CoreError::InvalidPayload {
            check: name.to_string(),
            reason: format!("expected [min, max], got {payload}"),
        }),
    }
}

impl CustomCheck for RangeCheck {
    fn check(
        &self,
        value: &Value,
        name: &str,
        payload: &Value,
    ) -> Result<Option<String>, CoreError> {
        let (min, max) = bounds(name, payload)?;
        let within = number_of(value).is_some_and(|n| min.value <= n && n <= max.value);
        if within {
            return Ok(None);
        }
        Ok(Some(
            self.message
                .replace("{min}", &min.text)
                .replace("{max}", &max.text),
        ))
    }

    fn validate_payload(&self, name: &str, payload: &Value) -> Result<(), CoreError> {
        bounds(name, payload).map(|_| ())
    }
}

/// Registered custom checks by name.
#[derive(Clone)]
pub struct CustomChecks {
    checks: HashMap<String, Arc<dyn CustomCheck>>,
}

impl CustomChecks {
    /// An empty registry, without `range`.
    pub fn empty() -> Self {
        Self {
            checks: HashMap::new(),
        }
    }

    /// The default checks, with messages taken from `messages`.
    pub fn with_defaults(messages: &Messages) -> Self {
        let mut checks = Self::empty();
        checks.register(RANGE, RangeCheck::new(messages.range.clone()));
        checks
    }

    /// Register `check` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, check: impl CustomCheck + 'static) {
        self.checks.insert(name.into(), Arc::new(check));
    }

    pub fn get(&self, name: &str) -> Result<&dyn CustomCheck, CoreError> {
        self.checks
            .get(name)
            .map(|check| check.as_ref())
            .ok_or_else(|| CoreError::UnknownCustomCheck(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }
}

impl std::fmt::Debug for CustomChecks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.checks.keys().collect();
        names.sort();
        f.debug_struct("CustomChecks").field("names", &names).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
