use std::collections::HashMap;
use std::sync::Arc;

use declone_store::{ItemReadRepository, RelationshipMap, RelationshipRepository};
use declone_types::{
    clone_source, distinct_identifiers, index_by_identifier, ItemRelationship, ItemVariant,
    VariantIdentifier,
};
use tracing::debug;

use crate::error::{FetchPhase, MergeError, MergeResult};

/// Variants and their outbound relationships, fetched together.
///
/// Read-only once built; lookups go by identifier value.
#[derive(Clone, Debug, Default)]
pub struct CloneSet {
    variants: Vec<ItemVariant>,
    index: HashMap<VariantIdentifier, usize>,
    relationships: RelationshipMap,
}

impl CloneSet {
    pub fn new(variants: Vec<ItemVariant>, relationships: RelationshipMap) -> Self {
        Self {
            index: index_by_identifier(variants.as_slice()),
            variants,
            relationships,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn variants(&self) -> &[ItemVariant] {
        &self.variants
    }

    pub fn variant(&self, id: &VariantIdentifier) -> Option<&ItemVariant> {
        self.index.get(id).map(|&i| &self.variants[i])
    }

    /// Outbound edges of `id`; empty when none were fetched.
    pub fn relationships_of(&self, id: &VariantIdentifier) -> &[ItemRelationship] {
        self.relationships
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Decode every clone's reference once, in fetch order.
    pub fn resolve(&self) -> Vec<ResolvedClone<'_>> {
        self.variants
            .iter()
            .map(|clone| ResolvedClone {
                clone,
                relationships: self.relationships_of(&clone.identifier),
                source: clone_source(clone),
            })
            .collect()
    }
}

/// A fetched clone with its decoded source locator.
///
/// The source lookup and the merge both read `source` from here, so a
/// reference is decoded exactly once per batch.
#[derive(Clone, Debug)]
pub struct ResolvedClone<'a> {
    pub clone: &'a ItemVariant,
    pub relationships: &'a [ItemRelationship],
    /// `None` when the clone carries no decodable reference.
    pub source: Option<VariantIdentifier>,
}

/// Distinct source locators referenced by `resolved`, in first-seen order.
///
/// Clones without a decodable reference contribute nothing. The store named
/// in a reference is ignored: sources are always read from the clone's store.
pub fn source_locators(resolved: &[ResolvedClone<'_>]) -> Vec<VariantIdentifier> {
    distinct_identifiers(resolved.iter().filter_map(|r| r.source.as_ref()))
}

/// Reads variants and their outbound relationships from the repository
/// boundary, two requests at a time.
#[derive(Clone)]
pub struct VariantFetcher {
    items: Arc<dyn ItemReadRepository>,
    relationships: Arc<dyn RelationshipRepository>,
    store: String,
}

impl VariantFetcher {
    pub fn new(
        items: Arc<dyn ItemReadRepository>,
        relationships: Arc<dyn RelationshipRepository>,
        store: impl Into<String>,
    ) -> Self {
        Self {
            items,
            relationships,
            store: store.into(),
        }
    }

    pub fn store(&self) -> &str {
        &self.store
    }

    /// Fetch variants and outbound relationships for `locators` concurrently.
    ///
    /// Both reads must succeed; the first failure is returned tagged with
    /// `phase`. An empty request returns an empty set without any reads.
    pub async fn fetch(&self, locators: &[VariantIdentifier], phase: FetchPhase) -> MergeResult<CloneSet> {
        if locators.is_empty() {
            return Ok(CloneSet::empty());
        }
        let (variants, relationships) = tokio::try_join!(
            self.items.get_variants(locators),
            self.relationships.get_out_relationships(&self.store, locators),
        )
        .map_err(MergeError::fetch(phase))?;

        debug!(
            %phase,
            requested = locators.len(),
            variants = variants.len(),
            with_relationships = relationships.len(),
            "fetched variant set"
        );
        Ok(CloneSet::new(variants, relationships))
    }

    /// Clone-phase fetch.
    pub async fn fetch_clone_set(&self, locators: &[VariantIdentifier]) -> MergeResult<CloneSet> {
        self.fetch(locators, FetchPhase::Clones).await
    }

    /// Source-phase fetch of every source the resolved clones point at.
    pub async fn fetch_sources(&self, resolved: &[ResolvedClone<'_>]) -> MergeResult<CloneSet> {
        let locators = source_locators(resolved);
        self.fetch(&locators, FetchPhase::Sources).await
    }
}

impl std::fmt::Debug for VariantFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantFetcher")
            .field("store", &self.store)
            .finish()
    }
}
