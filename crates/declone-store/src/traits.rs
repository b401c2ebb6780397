use std::collections::HashMap;

use async_trait::async_trait;
use declone_types::{ItemRelationship, ItemVariant, VariantIdentifier};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::manifest::ManifestStepAction;

/// Outbound relationships keyed by the variant they originate from.
pub type RelationshipMap = HashMap<VariantIdentifier, Vec<ItemRelationship>>;

/// Read side of the item store.
///
/// Implementations must satisfy:
/// - Reads are idempotent and side-effect free.
/// - An empty locator slice yields an empty result.
/// - A locator repeated in the input yields at most one variant.
/// - Locators with no stored variant are silently absent from the result.
#[async_trait]
pub trait ItemReadRepository: Send + Sync {
    async fn get_variants(&self, locators: &[VariantIdentifier]) -> StoreResult<Vec<ItemVariant>>;
}

/// Write side of the item store.
#[async_trait]
pub trait ItemWriteRepository: Send + Sync {
    /// Insert or replace each variant by identifier.
    async fn save_variants(&self, variants: &[ItemVariant]) -> StoreResult<()>;
}

/// Outbound relationship storage, partitioned by store name.
#[async_trait]
pub trait RelationshipRepository: Send + Sync {
    /// Outbound edges of each locator within `store`.
    ///
    /// Locators without edges may be absent from the map; callers treat an
    /// absent entry as an empty set.
    async fn get_out_relationships(
        &self,
        store: &str,
        locators: &[VariantIdentifier],
    ) -> StoreResult<RelationshipMap>;

    /// Replace the outbound edge set of every variant present in `relationships`.
    async fn save_relationships(&self, store: &str, relationships: &RelationshipMap) -> StoreResult<()>;
}

/// Source of pending promotion work.
#[async_trait]
pub trait ManifestRepository: Send + Sync {
    /// Take up to `batch_size` locators pending `step` in `manifest`.
    ///
    /// Returns `Ok(None)` once the manifest holds no more work for the step.
    async fn get_next_batch(
        &self,
        manifest: Uuid,
        step: ManifestStepAction,
        batch_size: usize,
    ) -> StoreResult<Option<Vec<VariantIdentifier>>>;
}
