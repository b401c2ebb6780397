use std::fmt;

use declone_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Which half of a batch's reads failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchPhase {
    /// Clone variants and their outbound relationships.
    Clones,
    /// Source variants and their outbound relationships.
    Sources,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clones => f.write_str("clones"),
            Self::Sources => f.write_str("sources"),
        }
    }
}

/// Errors that end a promotion run.
///
/// Orphaned clones and cancellation are not errors and never appear here.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("fetch failed ({phase}): {source}")]
    Fetch {
        phase: FetchPhase,
        #[source]
        source: StoreError,
    },

    #[error("persist failed: {0}")]
    Persist(#[source] StoreError),

    #[error("manifest read failed: {0}")]
    Manifest(#[source] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl MergeError {
    pub fn fetch(phase: FetchPhase) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Fetch { phase, source }
    }
}

pub type MergeResult<T> = Result<T, MergeError>;
