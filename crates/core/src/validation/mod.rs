//! Data validation engine.
//!
//! Flattening, rule types, registries, the rule evaluator, custom checks and
//! the referential key checker. Only the key checker touches a store, and it
//! does so through the [`store::KeyStore`] trait.

pub mod custom;
pub mod evaluator;
pub mod flatten;
pub mod keys;
pub mod registry;
pub mod rules;
pub mod store;

mod value;
