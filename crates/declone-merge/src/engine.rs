use declone_store::RelationshipMap;
use declone_types::{ItemRelationship, ItemVariant};
use tracing::{debug, warn};

use crate::fetch::{CloneSet, ResolvedClone};
use crate::merge::{merge_variants, orphan_variant, EdgeIdGenerator, MergedVariant, RandomEdgeIds};

/// How one clone is turned into a self-contained record.
///
/// The engine decides *which* path a clone takes; the strategy decides what
/// each path produces. Strategies are stateless across clones.
pub trait MergeStrategy: Send + Sync {
    /// Merge a clone with its resolved source.
    fn merge(
        &self,
        clone: &ItemVariant,
        clone_relationships: &[ItemRelationship],
        source: &ItemVariant,
        source_relationships: &[ItemRelationship],
    ) -> MergedVariant;

    /// Record for a clone whose source could not be resolved.
    fn orphan(&self, clone: &ItemVariant, clone_relationships: &[ItemRelationship]) -> MergedVariant;
}

/// Field and relationship merge as implemented in [`crate::merge`].
pub struct DefaultMergeStrategy {
    ids: Box<dyn EdgeIdGenerator>,
}

impl DefaultMergeStrategy {
    pub fn new(ids: Box<dyn EdgeIdGenerator>) -> Self {
        Self { ids }
    }
}

impl Default for DefaultMergeStrategy {
    fn default() -> Self {
        Self::new(Box::new(RandomEdgeIds))
    }
}

impl MergeStrategy for DefaultMergeStrategy {
    fn merge(
        &self,
        clone: &ItemVariant,
        clone_relationships: &[ItemRelationship],
        source: &ItemVariant,
        source_relationships: &[ItemRelationship],
    ) -> MergedVariant {
        merge_variants(
            clone,
            clone_relationships,
            source,
            source_relationships,
            self.ids.as_ref(),
        )
    }

    fn orphan(&self, clone: &ItemVariant, clone_relationships: &[ItemRelationship]) -> MergedVariant {
        orphan_variant(clone, clone_relationships)
    }
}

/// Merged output of one batch.
#[derive(Clone, Debug, Default)]
pub struct DecloneBatch {
    pub merged: Vec<MergedVariant>,
    /// Clones promoted with their own content only.
    pub orphans: usize,
    /// Requested clones with no stored variant.
    pub skipped: usize,
}

impl DecloneBatch {
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn variants(&self) -> Vec<ItemVariant> {
        self.merged.iter().map(|m| m.variant.clone()).collect()
    }

    /// Merged relationship sets keyed by clone identifier.
    pub fn relationship_map(&self) -> RelationshipMap {
        self.merged
            .iter()
            .map(|m| (m.variant.identifier.clone(), m.relationships.clone()))
            .collect()
    }

    pub fn relationship_count(&self) -> usize {
        self.merged.iter().map(|m| m.relationships.len()).sum()
    }
}

/// The clone resolution engine.
///
/// Synchronous and I/O free: it works only on sets the fetcher has already
/// built, and keeps no state between clones or batches.
pub struct DecloneEngine {
    strategy: Box<dyn MergeStrategy>,
}

impl DecloneEngine {
    pub fn new(strategy: Box<dyn MergeStrategy>) -> Self {
        Self { strategy }
    }

    /// Produce one merged record per resolved clone.
    ///
    /// A clone merges with its source when the source was fetched. Otherwise
    /// (no decodable reference, a missing source, or a reference back to the
    /// clone itself) it takes the orphan path and is logged at warn level.
    pub fn declone(&self, resolved: &[ResolvedClone<'_>], sources: &CloneSet) -> DecloneBatch {
        let mut batch = DecloneBatch::default();

        for ResolvedClone {
            clone,
            relationships,
            source,
        } in resolved
        {
            let clone_id = &clone.identifier;
            let source_variant = match source {
                None => {
                    warn!(clone = %clone_id, "clone has no usable source reference, promoting own content");
                    None
                }
                Some(source_id) if source_id == clone_id => {
                    warn!(clone = %clone_id, "clone references itself, promoting own content");
                    None
                }
                Some(source_id) => {
                    let found = sources.variant(source_id);
                    if found.is_none() {
                        warn!(
                            clone = %clone_id,
                            source = %source_id,
                            "clone source not found, promoting own content"
                        );
                    }
                    found
                }
            };

            match source_variant {
                Some(source) => {
                    debug!(clone = %clone_id, source = %source.identifier, "merging clone with source");
                    batch.merged.push(self.strategy.merge(
                        clone,
                        relationships,
                        source,
                        sources.relationships_of(&source.identifier),
                    ));
                }
                None => {
                    batch.orphans += 1;
                    batch.merged.push(self.strategy.orphan(clone, relationships));
                }
            }
        }

        batch
    }
}

impl Default for DecloneEngine {
    fn default() -> Self {
        Self::new(Box::new(DefaultMergeStrategy::default()))
    }
}

impl std::fmt::Debug for DecloneEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecloneEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{MergeOrigin, SequentialEdgeIds};
    use declone_types::{
        CloneReference, RelationshipType, VarianceKind, VariantIdentifier, SOURCE_ITEM_FIELD_ID,
    };
    use uuid::Uuid;

    fn id(n: u128) -> VariantIdentifier {
        VariantIdentifier::new(Uuid::from_u128(n), "en", 1)
    }

    fn field(n: u128) -> Uuid {
        Uuid::from_u128(0xf000 + n)
    }

    fn clone_of(n: u128, source: &VariantIdentifier) -> ItemVariant {
        ItemVariant::new(id(n), Uuid::nil()).with_field(
            SOURCE_ITEM_FIELD_ID,
            CloneReference::new("master", source.clone()).encode().unwrap(),
            VarianceKind::Versioned,
        )
    }

    fn rel(id: u128, from: u128, to: u128) -> ItemRelationship {
        ItemRelationship::new(
            Uuid::from_u128(id),
            Uuid::from_u128(from),
            Uuid::from_u128(to),
            RelationshipType::ItemReference,
        )
    }

    #[test]
    fn merges_resolved_clones() {
        let source = ItemVariant::new(id(1), Uuid::nil()).with_field(field(1), "s", VarianceKind::Shared);
        let mut source_rels = RelationshipMap::new();
        source_rels.insert(id(1), vec![rel(500, 1, 9)]);
        let sources = CloneSet::new(vec![source], source_rels);
        let clones = CloneSet::new(vec![clone_of(10, &id(1)), clone_of(11, &id(1))], RelationshipMap::new());

        let engine = DecloneEngine::new(Box::new(DefaultMergeStrategy::new(Box::new(
            SequentialEdgeIds::starting_at(1),
        ))));
        let batch = engine.declone(&clones.resolve(), &sources);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.orphans, 0);
        for merged in &batch.merged {
            assert_eq!(merged.origin, MergeOrigin::Merged { source: id(1) });
            assert_eq!(merged.variant.fields.len(), 1);
            assert_eq!(merged.relationships.len(), 1);
        }
        assert_ne!(batch.merged[0].relationships[0].id, batch.merged[1].relationships[0].id);
    }

    #[test]
    fn unresolved_source_falls_back_to_orphan() {
        let mut clone_rels = RelationshipMap::new();
        clone_rels.insert(id(10), vec![rel(1, 10, 9)]);
        let clones = CloneSet::new(vec![clone_of(10, &id(1))], clone_rels);

        let batch = DecloneEngine::default().declone(&clones.resolve(), &CloneSet::empty());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.orphans, 1);
        let merged = &batch.merged[0];
        assert!(merged.is_orphan());
        assert!(merged.variant.fields.is_empty());
        assert_eq!(merged.relationships, vec![rel(1, 10, 9)]);
    }

    #[test]
    fn clone_without_reference_is_orphan() {
        let plain = ItemVariant::new(id(10), Uuid::nil()).with_field(field(1), "v", VarianceKind::Shared);
        let clones = CloneSet::new(vec![plain.clone()], RelationshipMap::new());
        let batch = DecloneEngine::default().declone(&clones.resolve(), &CloneSet::empty());
        assert_eq!(batch.orphans, 1);
        assert_eq!(batch.merged[0].variant, plain);
        assert!(batch.merged[0].relationships.is_empty());
    }

    #[test]
    fn self_reference_takes_orphan_path() {
        let clone = clone_of(10, &id(10)).with_field(field(1), "own", VarianceKind::Shared);
        let mut clone_rels = RelationshipMap::new();
        clone_rels.insert(id(10), vec![rel(1, 10, 9)]);
        let clones = CloneSet::new(vec![clone.clone()], clone_rels);
        let sources = CloneSet::new(vec![clone], RelationshipMap::new());

        let batch = DecloneEngine::default().declone(&clones.resolve(), &sources);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.orphans, 1);
        assert_eq!(batch.skipped, 0);
        let merged = &batch.merged[0];
        assert!(merged.is_orphan());
        assert!(!merged.variant.has_field(SOURCE_ITEM_FIELD_ID));
        assert_eq!(merged.variant.fields.len(), 1);
        assert_eq!(merged.relationships, vec![rel(1, 10, 9)]);
    }

    #[test]
    fn undecodable_reference_takes_orphan_path() {
        let clone = ItemVariant::new(id(10), Uuid::nil())
            .with_field(SOURCE_ITEM_FIELD_ID, "bogus", VarianceKind::Versioned)
            .with_field(field(1), "own", VarianceKind::Shared);
        let clones = CloneSet::new(vec![clone], RelationshipMap::new());
        let source = ItemVariant::new(id(1), Uuid::nil()).with_field(field(2), "s", VarianceKind::Shared);
        let sources = CloneSet::new(vec![source], RelationshipMap::new());

        let batch = DecloneEngine::default().declone(&clones.resolve(), &sources);
        assert_eq!(batch.orphans, 1);
        let merged = &batch.merged[0];
        assert!(merged.is_orphan());
        let ids: Vec<Uuid> = merged.variant.fields.iter().map(|f| f.field_id).collect();
        assert_eq!(ids, vec![field(1)]);
    }

    #[test]
    fn empty_input_is_empty_batch() {
        let batch = DecloneEngine::default().declone(&[], &CloneSet::empty());
        assert!(batch.is_empty());
        assert!(batch.relationship_map().is_empty());
    }

    #[test]
    fn relationship_map_keys_by_clone() {
        let mut clone_rels = RelationshipMap::new();
        clone_rels.insert(id(10), vec![rel(1, 10, 9), rel(2, 10, 8)]);
        let clones = CloneSet::new(vec![clone_of(10, &id(1))], clone_rels);
        let batch = DecloneEngine::default().declone(&clones.resolve(), &CloneSet::empty());
        let map = batch.relationship_map();
        assert_eq!(map[&id(10)].len(), 2);
        assert_eq!(batch.relationship_count(), 2);
        assert_eq!(batch.variants().len(), 1);
    }

    struct OrphansOnly;

    impl MergeStrategy for OrphansOnly {
        fn merge(
            &self,
            clone: &ItemVariant,
            clone_relationships: &[ItemRelationship],
            _source: &ItemVariant,
            _source_relationships: &[ItemRelationship],
        ) -> MergedVariant {
            orphan_variant(clone, clone_relationships)
        }

        fn orphan(&self, clone: &ItemVariant, clone_relationships: &[ItemRelationship]) -> MergedVariant {
            orphan_variant(clone, clone_relationships)
        }
    }

    #[test]
    fn strategy_is_substitutable() {
        let source = ItemVariant::new(id(1), Uuid::nil()).with_field(field(1), "s", VarianceKind::Shared);
        let sources = CloneSet::new(vec![source], RelationshipMap::new());
        let clones = CloneSet::new(vec![clone_of(10, &id(1))], RelationshipMap::new());
        let batch = DecloneEngine::new(Box::new(OrphansOnly)).declone(&clones.resolve(), &sources);
        assert!(batch.merged[0].variant.fields.is_empty());
    }
}
