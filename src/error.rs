//! Error taxonomy shared by the store, the repository and the front ends.
//!
//! Lookups that miss are not errors at the data layer: they come back as
//! `None` or `false`. Errors here cover an unusable store, undecodable
//! collections and presentation-level checks.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No persistent store exists in this execution context.
    #[error("persistent store is not available in this context")]
    Unavailable,
    #[error("sled backend error: {0}")]
    Backend(#[from] sled::Error),
    #[error("value stored under `{key}` is not valid UTF-8")]
    Encoding { key: String },
    #[error("collection under `{key}` is not valid JSON: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Required form fields that were left blank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required fields: {}", .missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<&'static str>,
}

/// Failures surfaced to whoever drives a user action (CLI, scripts).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{what} `{id}` not found")]
    NotFound { what: &'static str, id: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("you need to be logged in")]
    NotLoggedIn,
    #[error("only the owner of this listing may change it")]
    Forbidden,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_fields() {
        let err = ValidationError {
            missing: vec!["name", "email"],
        };
        assert_eq!(err.to_string(), "missing required fields: name, email");

        let app: AppError = err.into();
        assert!(matches!(app, AppError::Validation(_)));
    }
}
