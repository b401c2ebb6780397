use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid clone reference: {0}")]
    InvalidReference(String),

    #[error("invalid item id: {0}")]
    InvalidItemId(String),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("store name is not a valid reference host: {0:?}")]
    InvalidStore(String),
}
