//! Repository boundary for clone promotion.
//!
//! The merge engine never talks to storage directly. It reads variants and
//! outbound relationships, writes merged results, and pulls manifest batches
//! through the async traits defined here.
//!
//! # Storage Backends
//!
//! - [`InMemoryItemStore`] -- variants keyed by identifier
//! - [`InMemoryRelationshipStore`] -- outbound edges, partitioned by store name
//! - [`InMemoryManifest`] -- FIFO queues of pending work per manifest step
//!
//! # Rules
//!
//! 1. Reads are idempotent; an empty request yields an empty response.
//! 2. A missing relationship entry means "no outbound edges", not an error.
//! 3. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod manifest;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use manifest::{InMemoryManifest, ManifestStepAction};
pub use memory::{InMemoryItemStore, InMemoryRelationshipStore};
pub use traits::{
    ItemReadRepository, ItemWriteRepository, ManifestRepository, RelationshipMap,
    RelationshipRepository,
};
