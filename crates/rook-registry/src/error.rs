//! Error types for registry operations.

use thiserror::Error;

use rook_types::TypeError;

/// Errors that can occur while resolving or converting domain types.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The domain type has no registry entry.
    #[error("domain type not registered: {domain_type}")]
    Unregistered { domain_type: &'static str },

    /// A persisted value does not match the registered persisted type.
    #[error("type mismatch for {domain_type}: expected {expected}, {reason}")]
    TypeMismatch {
        domain_type: &'static str,
        expected: &'static str,
        reason: String,
    },

    /// A persisted value decoded cleanly but is not a legal domain value.
    #[error("cannot convert {domain_type}: {reason}")]
    Conversion {
        domain_type: &'static str,
        reason: String,
    },

    /// The domain type was registered twice.
    #[error("domain type registered twice: {domain_type}")]
    DuplicateDomainType { domain_type: &'static str },

    /// Two domain types claim the same (or nested) root paths.
    #[error("root path {root_path} for {domain_type} conflicts with {existing}")]
    RootPathConflict {
        domain_type: &'static str,
        root_path: String,
        existing: &'static str,
    },

    /// A root path or persisted value failed validation.
    #[error("invalid input: {0}")]
    Type(#[from] TypeError),
}

impl RegistryError {
    /// Shorthand for domain-level validation failures in `from_persisted`.
    pub fn conversion(domain_type: &'static str, reason: impl Into<String>) -> Self {
        Self::Conversion {
            domain_type,
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
