use thiserror::Error;

use rook_registry::RegistryError;
use rook_remote::RemoteError;
use rook_types::{Key, StorePath, TypeError};

/// Errors surfaced by the typed storage client.
///
/// `NotFound` and `AlreadyExists` are expected outcomes callers branch on.
/// Registry errors (`Unregistered`, `TypeMismatch`) are programming errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{domain_type} not found: {key}")]
    NotFound { domain_type: &'static str, key: Key },

    #[error("{domain_type} already exists: {key}")]
    AlreadyExists { domain_type: &'static str, key: Key },

    #[error("collection at {path} is not a map of records")]
    MalformedCollection { path: StorePath },

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("invalid input: {0}")]
    Type(#[from] TypeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// `true` for conditions a caller is expected to handle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::AlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_unregistered(&self) -> bool {
        matches!(self, Self::Registry(RegistryError::Unregistered { .. }))
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::Registry(RegistryError::TypeMismatch { .. }))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
