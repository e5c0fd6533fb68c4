use rook_types::TypeError;

/// Errors from remote store operations.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The backend cannot be reached.
    #[error("remote store unavailable")]
    Unavailable,

    /// A path or value failed validation.
    #[error("invalid input: {0}")]
    Type(#[from] TypeError),

    /// Subscriptions need a running tokio runtime to deliver notifications.
    #[error("no async runtime available to deliver notifications")]
    NoRuntime,

    /// Internal state is unusable (e.g. a poisoned lock).
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Result alias for remote store operations.
pub type RemoteResult<T> = Result<T, RemoteError>;
