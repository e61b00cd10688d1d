use std::path::PathBuf;

/// Errors that abort a validation call.
///
/// Field-level validation failures are never reported through this type;
/// they are entries in [`ValidationErrors`](crate::validation::rules::ValidationErrors).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown built-in rule: {0}")]
    UnknownRule(String),

    #[error("Unknown custom check: {0}")]
    UnknownCustomCheck(String),

    #[error("Unknown key-check field: {0}")]
    UnknownKeyField(String),

    #[error("Invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid payload for check '{check}': {reason}")]
    InvalidPayload { check: String, reason: String },

    #[error("Invalid rule set: {0}")]
    InvalidRuleSet(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration from {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key store could not answer an existence query.
    #[error("Key store query failed for {table}.{column}: {source}")]
    Store {
        table: String,
        column: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CoreError {
    /// `true` when the caller could not learn whether the data is valid
    /// because the backing store failed.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store { .. })
    }

    /// `true` for programmer errors in rules or registries.
    pub fn is_configuration(&self) -> bool {
        !self.is_store_failure()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_rule() {
        let err = CoreError::UnknownRule("email".to_string());
        assert_eq!(err.to_string(), "Unknown built-in rule: email");
        assert!(err.is_configuration());
    }

    #[test]
    fn display_store_failure() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = CoreError::Store {
            table: "parties".to_string(),
            column: "party_id".to_string(),
            source: Box::new(inner),
        };
        assert_eq!(
            err.to_string(),
            "Key store query failed for parties.party_id: refused"
        );
        assert!(err.is_store_failure());
        assert!(!err.is_configuration());
    }
}
