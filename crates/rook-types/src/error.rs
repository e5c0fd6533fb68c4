use thiserror::Error;

/// Errors produced by type construction and conversion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("expected a record object, found {found}")]
    NotARecord { found: &'static str },

    #[error("record field {field:?} holds a nested object")]
    NestedField { field: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
