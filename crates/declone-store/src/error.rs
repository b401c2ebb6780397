/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The named store does not exist or is not reachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Failure reported by the backend itself.
    #[error("backend error: {0}")]
    Backend(String),

    /// A lock guarding in-memory state was poisoned.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
