//! Rule evaluator.
//!
//! [`Validator::check_rules`] is pure logic over the flattened document;
//! [`Validator::validate`] adds the key checker once the rules pass.

use std::sync::Arc;

use serde_json::Value;

use super::custom::{CustomCheck, CustomChecks};
use super::flatten::flatten;
use super::keys::KeyCheck;
use super::registry::{ValidatorConfig, REQUIRED};
use super::rules::{Rule, RuleSet, RuleSetting, ValidationErrors};
use super::store::KeyStore;
use super::value::{is_blank, text_of};
use crate::error::CoreError;

/// Validates documents against rule sets using one configuration and store.
#[derive(Debug, Clone)]
pub struct Validator<S> {
    config: Arc<ValidatorConfig>,
    checks: CustomChecks,
    store: S,
}

impl<S> Validator<S> {
    pub fn new(config: ValidatorConfig, store: S) -> Self {
        Self::with_shared_config(Arc::new(config), store)
    }

    /// Build a validator over a configuration shared with other validators.
    pub fn with_shared_config(config: Arc<ValidatorConfig>, store: S) -> Self {
        let checks = CustomChecks::with_defaults(&config.messages);
        Self {
            config,
            checks,
            store,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register a custom check under `name`, replacing any existing one.
    pub fn register_check(
        &mut self,
        name: impl Into<String>,
        check: impl CustomCheck + 'static,
    ) -> &mut Self {
        self.checks.register(name, check);
        self
    }

    /// Apply `rules` to `data` without consulting the key store.
    ///
    /// Every rule is checked against the configuration first; an unknown
    /// built-in rule, unknown custom check or malformed payload aborts the
    /// call before any field is evaluated.
    pub fn check_rules(&self, data: &Value, rules: &RuleSet) -> Result<ValidationErrors, CoreError> {
        self.verify(rules)?;

        let fields = flatten(data, &self.config.delimiters);
        let mut errors = ValidationErrors::new();

        for rule in rules {
            let mut matched = fields
                .iter()
                .filter(|(path, _)| rule.selector().matches(path))
                .peekable();

            if matched.peek().is_none() {
                if rule.is_required() {
                    let message = &self.config.builtin(REQUIRED)?.message;
                    errors.insert_message(rule.name(), message.clone());
                }
                continue;
            }

            for (path, value) in matched {
                if let Some(message) = self.check_field(rule, value)? {
                    errors.insert_message(path.clone(), message);
                }
            }
        }

        tracing::debug!(
            rules = rules.len(),
            fields = fields.len(),
            errors = errors.len(),
            "Evaluated rule set"
        );
        Ok(errors)
    }

    /// Run `rule`'s settings over one field. The first failing setting wins.
    fn check_field(&self, rule: &Rule, value: &Value) -> Result<Option<String>, CoreError> {
        let required = rule.is_required();

        for setting in rule.settings() {
            match setting {
                RuleSetting::Message(_) => continue,
                _ if !required && is_blank(value) => return Ok(None),
                RuleSetting::Builtin(name) => {
                    let builtin = self.config.builtin(name)?;
                    if !builtin.pattern.is_match(&text_of(value)) {
                        let message = rule.override_message().unwrap_or(builtin.message.as_str());
                        return Ok(Some(message.to_string()));
                    }
                }
                RuleSetting::Custom { name, payload } => {
                    if let Some(message) = self.checks.get(name)?.check(value, name, payload)? {
                        return Ok(Some(message));
                    }
                }
            }
        }
        Ok(None)
    }

    fn verify(&self, rules: &RuleSet) -> Result<(), CoreError> {
        for setting in rules.iter().flat_map(Rule::settings) {
            match setting {
                RuleSetting::Builtin(name) => {
                    self.config.builtin(name)?;
                }
                RuleSetting::Custom { name, payload } => {
                    self.checks.get(name)?.validate_payload(name, payload)?;
                }
                RuleSetting::Message(_) => {}
            }
        }
        Ok(())
    }
}

impl<S: KeyStore> Validator<S> {
    /// Apply `rules` to `data`; if nothing fails and `key_check` asks for it,
    /// return the key checker's result instead.
    ///
    /// Configuration errors in either the rules or the key-check selection
    /// abort the call. A store failure is returned as [`CoreError::Store`].
    pub async fn validate(
        &self,
        data: &Value,
        rules: &RuleSet,
        key_check: &KeyCheck,
    ) -> Result<ValidationErrors, CoreError> {
        let key_spec = self.resolve_key_check(key_check)?;
        let errors = self.check_rules(data, rules)?;

        match key_spec {
            Some(spec) if errors.is_empty() => self.validate_keys(data, Some(&spec), false).await,
            _ => Ok(errors),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::validation::store::MemoryKeyStore;

    const REQUIRED_MSG: &str = "Это поле необходимо заполнить.";
    const DIGITS_MSG: &str = "Пожалуйста, вводите только цифры.";
    const NUMBER_MSG: &str = "Пожалуйста, введите число.";

    fn validator() -> Validator<MemoryKeyStore> {
        Validator::new(ValidatorConfig::default(), MemoryKeyStore::new())
    }

    fn rules(value: Value) -> RuleSet {
        RuleSet::from_json(&value).unwrap()
    }

    #[test]
    fn digits_failure_on_required_field() {
        let errors = validator()
            .check_rules(&json!({"id": "abc"}), &rules(json!({"id": ["required", "digits"]})))
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.message("id"), Some(DIGITS_MSG));
    }

    #[test]
    fn present_but_empty_required_field_fails_required_pattern() {
        let errors = validator()
            .check_rules(&json!({"id": ""}), &rules(json!({"id": ["required"]})))
            .unwrap();
        assert_eq!(errors.message("id"), Some(REQUIRED_MSG));
    }

    #[test]
    fn missing_required_field_is_keyed_by_rule_name() {
        let errors = validator()
            .check_rules(
                &json!({"name": "x"}),
                &rules(json!({"city": ["required", {"msg": "Введите название города"}]})),
            )
            .unwrap();
        // The override message does not apply to a field that is absent.
        assert_eq!(errors.message("city"), Some(REQUIRED_MSG));
    }

    #[test]
    fn override_message_applies_to_present_field() {
        let errors = validator()
            .check_rules(
                &json!({"city": ""}),
                &rules(json!({"city": ["required", {"msg": "Введите название города"}]})),
            )
            .unwrap();
        assert_eq!(errors.message("city"), Some("Введите название города"));
    }

    #[test]
    fn pattern_rule_checks_every_matching_field() {
        let data = json!({"goods_prices": {"phone": 1000, "tv": "10k", "pc": ""}});
        let errors = validator()
            .check_rules(
                &data,
                &rules(json!({"/^goods_prices\\[.+?\\]$/": ["required", "number"]})),
            )
            .unwrap();
        assert!(!errors.contains("goods_prices[phone]"));
        assert_eq!(errors.message("goods_prices[tv]"), Some(NUMBER_MSG));
        assert_eq!(errors.message("goods_prices[pc]"), Some(REQUIRED_MSG));
    }

    #[test]
    fn unmatched_pattern_rule_reports_pattern_name() {
        let errors = validator()
            .check_rules(
                &json!({"id": 1}),
                &rules(json!({"/^goods_prices\\[.+?\\]$/": ["required"]})),
            )
            .unwrap();
        assert_eq!(errors.message(r"/^goods_prices\[.+?\]$/"), Some(REQUIRED_MSG));
    }

    #[test]
    fn blank_optional_field_skips_format_checks() {
        let errors = validator()
            .check_rules(
                &json!({"phone": "", "zip": null, "age": "0"}),
                &rules(json!({
                    "phone": ["digits"],
                    "zip": ["number"],
                    "age": [{"range": [18, 99]}]
                })),
            )
            .unwrap();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn unmatched_optional_rule_is_silent() {
        let errors = validator()
            .check_rules(&json!({}), &rules(json!({"phone": ["digits"]})))
            .unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn first_failing_setting_wins() {
        let mut v = validator();
        v.register_check(
            "never",
            |_: &Value, _: &str, _: &Value| -> Result<Option<String>, CoreError> {
                Ok(Some("never reached".to_string()))
            },
        );
        let errors = v
            .check_rules(
                &json!({"id": "abc"}),
                &RuleSet::new().with(Rule::literal("id").builtin("digits").custom("never", json!(null))),
            )
            .unwrap();
        assert_eq!(errors.message("id"), Some(DIGITS_MSG));
    }

    #[test]
    fn range_failure_stops_later_settings() {
        let errors = validator()
            .check_rules(
                &json!({"age": "150.5"}),
                &RuleSet::new().with(
                    Rule::literal("age")
                        .custom("range", json!([18, 99]))
                        .builtin("digits"),
                ),
            )
            .unwrap();
        assert_eq!(
            errors.message("age"),
            Some("Пожалуйста, введите число от 18 до 99.")
        );
    }

    #[test]
    fn later_rule_overwrites_same_field() {
        let errors = validator()
            .check_rules(
                &json!({"id": "abc"}),
                &RuleSet::new()
                    .with(Rule::literal("id").builtin("digits"))
                    .with(Rule::pattern("^id$").unwrap().builtin("number").message("second")),
            )
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.message("id"), Some("second"));
    }

    #[test]
    fn unknown_builtin_fails_fast_even_without_matches() {
        let result = validator().check_rules(
            &json!({}),
            &rules(json!({"email": ["email"]})),
        );
        assert_matches!(result, Err(CoreError::UnknownRule(name)) if name == "email");
    }

    #[test]
    fn unknown_custom_check_fails_fast() {
        let result = validator().check_rules(
            &json!({"x": "1"}),
            &rules(json!({"x": [{"between": [1, 2]}]})),
        );
        assert_matches!(result, Err(CoreError::UnknownCustomCheck(_)));
    }

    #[test]
    fn malformed_range_payload_fails_fast() {
        let result = validator().check_rules(
            &json!({}),
            &rules(json!({"x": [{"range": 5}]})),
        );
        assert_matches!(result, Err(CoreError::InvalidPayload { .. }));
    }

    #[test]
    fn custom_check_receives_name_and_payload() {
        let mut v = validator();
        v.register_check(
            "one_of",
            |value: &Value, name: &str, payload: &Value| -> Result<Option<String>, CoreError> {
                let allowed = payload.as_array().cloned().unwrap_or_default();
                Ok((!allowed.contains(value)).then(|| format!("{name}: not allowed")))
            },
        );
        let errors = v
            .check_rules(
                &json!({"color": "pink", "size": "m"}),
                &rules(json!({
                    "color": [{"one_of": ["red", "green"]}],
                    "size": [{"one_of": ["s", "m"]}]
                })),
            )
            .unwrap();
        assert_eq!(errors.message("color"), Some("one_of: not allowed"));
        assert!(!errors.contains("size"));
    }

    #[test]
    fn custom_delimiters_are_used_for_matching() {
        let config = ValidatorConfig {
            delimiters: crate::types::PathDelimiters::new(".", ""),
            ..ValidatorConfig::default()
        };
        let v = Validator::new(config, MemoryKeyStore::new());
        let errors = v
            .check_rules(
                &json!({"user": {"age": "x"}}),
                &rules(json!({"user.age": ["digits"]})),
            )
            .unwrap();
        assert_eq!(errors.message("user.age"), Some(DIGITS_MSG));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let v = validator();
        let data = json!({"id": "abc", "goods_prices": {"pc": ""}});
        let set = rules(json!({
            "id": ["required", "digits"],
            "/^goods_prices\\[.+?\\]$/": ["required", "number"],
            "city": ["required"]
        }));
        let first = v.check_rules(&data, &set).unwrap();
        let second = v.check_rules(&data, &set).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn key_check_runs_only_when_rules_pass() {
        let v = Validator::new(
            ValidatorConfig::default(),
            MemoryKeyStore::new().with("parties", "party_id", [1]),
        );
        let set = rules(json!({"party_id": ["required", "digits"]}));

        let invalid = v
            .validate(&json!({"party_id": "x"}), &set, &KeyCheck::Registered)
            .await
            .unwrap();
        assert_eq!(invalid.message("party_id"), Some(DIGITS_MSG));

        let missing = v
            .validate(&json!({"party_id": "2"}), &set, &KeyCheck::Registered)
            .await
            .unwrap();
        assert_eq!(missing.message("party_id"), Some("Такой партии не существует"));

        let ok = v
            .validate(&json!({"party_id": "1"}), &set, &KeyCheck::Registered)
            .await
            .unwrap();
        assert!(ok.is_empty());
    }

    /// Store whose every query fails, counting the attempts.
    #[derive(Default)]
    struct UnreachableStore {
        calls: AtomicUsize,
    }

    impl KeyStore for UnreachableStore {
        type Error = std::io::Error;

        async fn existing_values(
            &self,
            _table: &str,
            _column: &str,
            _candidates: &[String],
        ) -> Result<HashSet<String>, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "connection timed out",
            ))
        }
    }

    #[tokio::test]
    async fn store_failure_reaches_caller() {
        let store = UnreachableStore::default();
        let v = Validator::new(ValidatorConfig::default(), &store);
        let set = rules(json!({"party_id": ["required", "digits"]}));

        let result = v
            .validate(&json!({"party_id": "2"}), &set, &KeyCheck::Registered)
            .await;
        assert_matches!(
            &result,
            Err(CoreError::Store { table, column, .. })
                if table == "parties" && column == "party_id"
        );
        assert!(result.unwrap_err().is_store_failure());
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_rules_skip_store() {
        let store = UnreachableStore::default();
        let v = Validator::new(ValidatorConfig::default(), &store);
        let set = rules(json!({"party_id": ["required", "digits"]}));

        let errors = v
            .validate(&json!({"party_id": "x"}), &set, &KeyCheck::Registered)
            .await
            .unwrap();
        assert_eq!(errors.message("party_id"), Some(DIGITS_MSG));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn whole_float_passes_digits() {
        let errors = validator()
            .validate(
                &json!({"id": 10.0, "age": 5}),
                &rules(json!({"id": ["digits"], "age": [{"range": [1e3, 2000]}]})),
                &KeyCheck::Skip,
            )
            .await
            .unwrap();
        assert!(!errors.contains("id"));
        assert_eq!(
            errors.message("age"),
            Some("Пожалуйста, введите число от 1000 до 2000.")
        );
    }

    #[tokio::test]
    async fn skip_never_touches_store() {
        let errors = validator()
            .validate(&json!({"party_id": "2"}), &RuleSet::new(), &KeyCheck::Skip)
            .await
            .unwrap();
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn unknown_key_field_fails_fast() {
        let result = validator()
            .validate(
                &json!({"id": "x"}),
                &rules(json!({"id": ["digits"]})),
                &KeyCheck::Only(vec!["city_id".to_string()]),
            )
            .await;
        assert_matches!(result, Err(CoreError::UnknownKeyField(f)) if f == "city_id");
    }
}
