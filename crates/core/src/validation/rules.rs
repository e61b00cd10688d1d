//! Rule, rule-set and result types.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::registry::REQUIRED;
use crate::error::CoreError;

/// Reserved setting key carrying a rule's override message.
pub const MESSAGE_KEY: &str = "msg";

/// Which flattened fields a rule applies to.
#[derive(Debug, Clone)]
pub enum RuleSelector {
    /// Exactly one field path.
    Literal(String),
    /// Every field path the expression matches.
    Pattern(Regex),
}

impl RuleSelector {
    /// Parse a rule name. Names starting with `/` are patterns written as
    /// `/expression/flags`; anything else is a literal field path.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        if name.starts_with('/') {
            compile_delimited(name).map(Self::Pattern)
        } else {
            Ok(Self::Literal(name.to_string()))
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == path,
            Self::Pattern(re) => re.is_match(path),
        }
    }
}

/// Compile `/expression/flags` into a regex. Supported flags are `i`, `m`,
/// `s`, `x` and `u`; `u` is accepted and ignored since matching is always
/// Unicode-aware.
fn compile_delimited(name: &str) -> Result<Regex, CoreError> {
    let close = name.rfind('/').filter(|&i| i > 0).ok_or_else(|| {
        CoreError::InvalidRuleSet(format!("pattern {name:?} is missing its closing '/'"))
    })?;
    let body = name[1..close].replace("\\/", "/");
    let mut flags = String::new();
    for flag in name[close + 1..].chars() {
        match flag {
            'i' | 'm' | 's' | 'x' => flags.push(flag),
            'u' => {}
            other => {
                return Err(CoreError::InvalidRuleSet(format!(
                    "pattern {name:?} has unsupported flag '{other}'"
                )))
            }
        }
    }
    let expression = if flags.is_empty() {
        body
    } else {
        format!("(?{flags}){body}")
    };
    Regex::new(&expression).map_err(|source| CoreError::InvalidPattern {
        pattern: name.to_string(),
        source,
    })
}

/// One entry of a rule's ordered settings.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleSetting {
    /// A rule from the built-in registry, referenced by name.
    Builtin(String),
    /// A registered custom check with its payload.
    Custom { name: String, payload: Value },
    /// Message reported instead of a built-in rule's default message.
    Message(String),
}

/// A selector plus the ordered settings applied to every field it matches.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    selector: RuleSelector,
    settings: Vec<RuleSetting>,
}

impl Rule {
    /// A rule for exactly one field path.
    pub fn literal(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            selector: RuleSelector::Literal(path.clone()),
            name: path,
            settings: Vec::new(),
        }
    }

    /// A rule for every field path matching `expression` (without delimiters).
    pub fn pattern(expression: &str) -> Result<Self, CoreError> {
        let selector = Regex::new(expression)
            .map(RuleSelector::Pattern)
            .map_err(|source| CoreError::InvalidPattern {
                pattern: expression.to_string(),
                source,
            })?;
        Ok(Self {
            name: format!("/{expression}/"),
            selector,
            settings: Vec::new(),
        })
    }

    /// A rule from its textual name (see [`RuleSelector::parse`]) and settings.
    pub fn parse(name: &str, settings: Vec<RuleSetting>) -> Result<Self, CoreError> {
        Ok(Self {
            name: name.to_string(),
            selector: RuleSelector::parse(name)?,
            settings,
        })
    }

    pub fn builtin(mut self, name: impl Into<String>) -> Self {
        self.settings.push(RuleSetting::Builtin(name.into()));
        self
    }

    pub fn required(self) -> Self {
        self.builtin(REQUIRED)
    }

    pub fn custom(mut self, name: impl Into<String>, payload: Value) -> Self {
        self.settings.push(RuleSetting::Custom {
            name: name.into(),
            payload,
        });
        self
    }

    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.settings.push(RuleSetting::Message(text.into()));
        self
    }

    /// The rule name as declared; missing required fields are reported under it.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> &RuleSelector {
        &self.selector
    }

    pub fn settings(&self) -> &[RuleSetting] {
        &self.settings
    }

    pub fn is_required(&self) -> bool {
        self.settings
            .iter()
            .any(|s| matches!(s, RuleSetting::Builtin(name) if name == REQUIRED))
    }

    /// The last non-empty override message, if any.
    pub fn override_message(&self) -> Option<&str> {
        self.settings.iter().rev().find_map(|s| match s {
            RuleSetting::Message(text) if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Rules in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parse the JSON rule-set form.
    ///
    /// ```json
    /// {
    ///   "id": ["required", "digits"],
    ///   "/^goods_prices\\[.+?\\]$/": ["required", "number"],
    ///   "age": [{"range": [18, 99]}],
    ///   "city": ["required", {"msg": "Enter a city name"}]
    /// }
    /// ```
    ///
    /// Strings are built-in rule names. Objects contribute one setting per
    /// key: `msg` is the override message, any other key is a custom check
    /// whose payload is the key's value. A bare string may stand in for a
    /// one-element list.
    pub fn from_json(value: &Value) -> Result<Self, CoreError> {
        let entries = value
            .as_object()
            .ok_or_else(|| CoreError::InvalidRuleSet("rule set must be an object".into()))?;

        let mut rules = Self::new();
        for (name, settings) in entries {
            let items: &[Value] = match settings {
                Value::Array(items) => items,
                Value::String(_) => std::slice::from_ref(settings),
                other => {
                    return Err(CoreError::InvalidRuleSet(format!(
                        "settings of rule {name:?} must be a list, got {other}"
                    )))
                }
            };
            let mut parsed = Vec::with_capacity(items.len());
            for item in items {
                parse_setting(name, item, &mut parsed)?;
            }
            rules.push(Rule::parse(name, parsed)?);
        }
        Ok(rules)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| CoreError::InvalidRuleSet(e.to_string()))?;
        Self::from_json(&value)
    }
}

fn parse_setting(rule: &str, item: &Value, out: &mut Vec<RuleSetting>) -> Result<(), CoreError> {
    match item {
        Value::String(name) => out.push(RuleSetting::Builtin(name.clone())),
        Value::Object(map) => {
            for (key, payload) in map {
                if key == MESSAGE_KEY {
                    let text = payload.as_str().ok_or_else(|| {
                        CoreError::InvalidRuleSet(format!(
                            "message of rule {rule:?} must be a string"
                        ))
                    })?;
                    out.push(RuleSetting::Message(text.to_string()));
                } else {
                    out.push(RuleSetting::Custom {
                        name: key.clone(),
                        payload: payload.clone(),
                    });
                }
            }
        }
        other => {
            return Err(CoreError::InvalidRuleSet(format!(
                "unsupported setting {other} in rule {rule:?}"
            )))
        }
    }
    Ok(())
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// What went wrong with one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorEntry {
    /// A single message for the whole field.
    Message(String),
    /// Key checks over a collection: each missing value with its message.
    PerValue(IndexMap<String, String>),
}

impl ErrorEntry {
    pub fn as_message(&self) -> Option<&str> {
        match self {
            Self::Message(text) => Some(text.as_str()),
            Self::PerValue(_) => None,
        }
    }

    pub fn as_per_value(&self) -> Option<&IndexMap<String, String>> {
        match self {
            Self::Message(_) => None,
            Self::PerValue(values) => Some(values),
        }
    }
}

/// Field path (or rule name) to error, in the order errors were first raised.
///
/// Empty means the data passed every check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(IndexMap<String, ErrorEntry>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error, replacing any earlier one for the same field.
    pub fn insert(&mut self, field: impl Into<String>, entry: ErrorEntry) {
        self.0.insert(field.into(), entry);
    }

    pub fn insert_message(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.insert(field, ErrorEntry::Message(message.into()));
    }

    pub fn get(&self, field: &str) -> Option<&ErrorEntry> {
        self.0.get(field)
    }

    /// The plain message recorded for `field`, if any.
    pub fn message(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(ErrorEntry::as_message)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ErrorEntry> {
        self.0.iter()
    }

    pub fn into_inner(self) -> IndexMap<String, ErrorEntry> {
        self.0
    }
}

impl IntoIterator for ValidationErrors {
    type Item = (String, ErrorEntry);
    type IntoIter = indexmap::map::IntoIter<String, ErrorEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
