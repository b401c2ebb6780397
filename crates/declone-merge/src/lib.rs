//! Clone resolution engine.
//!
//! Reconstructs the effective content of clone variants by combining each
//! clone's own fields and relationships with those inherited from the
//! variant it was cloned from, then hands the merged records to the target
//! store.
//!
//! # Pipeline (per batch)
//!
//! 1. [`VariantFetcher::fetch_clone_set`] -- clone variants + outbound edges, concurrently
//! 2. [`CloneSet::resolve`] -- decode each clone reference once
//! 3. [`VariantFetcher::fetch_sources`] -- source variants + outbound edges, concurrently
//! 4. [`DecloneEngine::declone`] -- pure merge, one record per clone
//! 5. [`PersistenceAdapter::persist`] -- variants and edges written concurrently
//!
//! [`PromotionDriver`] repeats this per manifest batch until the manifest is
//! exhausted or a [`CancelSignal`] is raised.

pub mod cancel;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod persist;

pub use cancel::{CancelHandle, CancelSignal};
pub use config::{ConfigError, PromoterConfig, DEFAULT_BATCH_SIZE, DEFAULT_TARGET_STORE};
pub use driver::{PromotionDriver, PromotionOutcome, PromotionReport};
pub use engine::{DecloneBatch, DecloneEngine, DefaultMergeStrategy, MergeStrategy};
pub use error::{FetchPhase, MergeError, MergeResult};
pub use fetch::{source_locators, CloneSet, ResolvedClone, VariantFetcher};
pub use merge::{
    merge_fields, merge_relationships, merge_variants, orphan_variant, EdgeIdGenerator,
    MergeOrigin, MergedVariant, RandomEdgeIds, SequentialEdgeIds,
};
pub use persist::{PersistStats, PersistenceAdapter};
