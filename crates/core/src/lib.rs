//! Declarative validation of nested request data.
//!
//! A document is flattened into `path -> leaf` pairs, matched against a
//! [`RuleSet`](validation::rules::RuleSet) of literal or pattern rules, and
//! optionally cross-checked for referential existence through a
//! [`KeyStore`](validation::store::KeyStore).

pub mod error;
pub mod types;
pub mod validation;

pub use error::CoreError;
pub use validation::evaluator::Validator;
pub use validation::keys::{Candidates, KeyCheck};
pub use validation::registry::{BuiltinRule, KeyRegistry, KeyRule, Messages, ValidatorConfig};
pub use validation::rules::{ErrorEntry, Rule, RuleSelector, RuleSet, RuleSetting, ValidationErrors};
pub use validation::store::{KeyStore, MemoryKeyStore};
