//! Pure merge of a clone with its source.
//!
//! Nothing here performs I/O or holds state between clones. The only
//! non-determinism is the id given to each inherited relationship, which
//! comes from an injected [`EdgeIdGenerator`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use declone_types::{
    is_clone_provenance_field, FieldData, ItemRelationship, ItemVariant, RelationshipKey,
    VariantIdentifier,
};
use uuid::Uuid;

/// Source of fresh relationship ids for inherited edges.
///
/// Inherited edges are written to the same edge store as the source's own
/// edges, so they must never reuse the source edge's id.
pub trait EdgeIdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

/// Random (v4) relationship ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomEdgeIds;

impl EdgeIdGenerator for RandomEdgeIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Sequential ids starting from a base value. Deterministic, for tests and replays.
#[derive(Debug)]
pub struct SequentialEdgeIds {
    next: AtomicU64,
}

impl SequentialEdgeIds {
    pub fn starting_at(base: u64) -> Self {
        Self {
            next: AtomicU64::new(base),
        }
    }
}

impl EdgeIdGenerator for SequentialEdgeIds {
    fn next_id(&self) -> Uuid {
        Uuid::from_u128(u128::from(self.next.fetch_add(1, Ordering::SeqCst)))
    }
}

/// How a merged record was produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOrigin {
    /// Merged with the given source variant.
    Merged { source: VariantIdentifier },
    /// No usable source; the clone's own content only.
    Orphaned,
}

/// The self-contained result for one clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedVariant {
    pub variant: ItemVariant,
    pub relationships: Vec<ItemRelationship>,
    pub origin: MergeOrigin,
}

impl MergedVariant {
    pub fn is_orphan(&self) -> bool {
        self.origin == MergeOrigin::Orphaned
    }
}

/// The clone's fields without the two clone-provenance fields, in order.
pub fn strip_provenance_fields(clone: &ItemVariant) -> Vec<FieldData> {
    clone
        .fields
        .iter()
        .filter(|f| !is_clone_provenance_field(f.field_id))
        .cloned()
        .collect()
}

/// Clone fields first, then every source field the clone does not define,
/// re-owned by the clone.
pub fn merge_fields(clone: &ItemVariant, source: &ItemVariant) -> Vec<FieldData> {
    let mut fields = strip_provenance_fields(clone);
    let defined: HashSet<Uuid> = clone.fields.iter().map(|f| f.field_id).collect();
    fields.extend(
        source
            .fields
            .iter()
            .filter(|f| !defined.contains(&f.field_id) && !is_clone_provenance_field(f.field_id))
            .map(|f| f.reattached_to(&clone.identifier)),
    );
    fields
}

/// Whether one of the clone's own edges survives into the merged set.
///
/// Provenance edges never survive. A TemplatedBy edge survives only when the
/// clone kept at least one field and the edge was produced by one of them.
/// Every other edge survives.
pub fn keeps_clone_relationship(relationship: &ItemRelationship, clone_fields: &[FieldData]) -> bool {
    let kind = &relationship.relationship_type;
    if kind.is_clone_provenance() {
        return false;
    }
    if !kind.is_structural() {
        return true;
    }
    match relationship.source_field_id {
        Some(field_id) if !clone_fields.is_empty() => {
            clone_fields.iter().any(|f| f.field_id == field_id)
        }
        _ => false,
    }
}

/// Copy of a source edge for the clone, under a fresh id.
///
/// Only edges that start at the source item are re-pointed at the clone;
/// the source-side variance is re-scoped with them. Everything else is kept.
pub fn rewrite_source_relationship(
    relationship: &ItemRelationship,
    clone: &VariantIdentifier,
    source: &VariantIdentifier,
    ids: &dyn EdgeIdGenerator,
) -> ItemRelationship {
    let mut rewritten = relationship.clone();
    rewritten.id = ids.next_id();
    if relationship.source_id == source.item_id {
        rewritten.source_id = clone.item_id;
        rewritten.source_variance = relationship.source_variance.rescoped_to(clone);
    }
    rewritten
}

/// Surviving clone edges plus inherited source edges the clone does not
/// already declare.
pub fn merge_relationships(
    clone: &VariantIdentifier,
    clone_fields: &[FieldData],
    clone_relationships: &[ItemRelationship],
    source: &VariantIdentifier,
    source_relationships: &[ItemRelationship],
    ids: &dyn EdgeIdGenerator,
) -> Vec<ItemRelationship> {
    let mut merged: Vec<ItemRelationship> = clone_relationships
        .iter()
        .filter(|r| keeps_clone_relationship(r, clone_fields))
        .cloned()
        .collect();

    let declared: HashSet<RelationshipKey> = merged.iter().map(ItemRelationship::dedup_key).collect();
    let has_structural = merged.iter().any(|r| r.relationship_type.is_structural());

    let inherited: Vec<ItemRelationship> = source_relationships
        .iter()
        .filter(|r| !r.relationship_type.is_clone_provenance())
        .map(|r| rewrite_source_relationship(r, clone, source, ids))
        .filter(|r| !declared.contains(&r.dedup_key()))
        .filter(|r| !(has_structural && r.relationship_type.is_structural()))
        .collect();

    merged.extend(inherited);
    merged
}

/// Merge a clone with its resolved source.
///
/// The clone keeps its identity, revision, and properties; only its field
/// sequence and relationship set change.
pub fn merge_variants(
    clone: &ItemVariant,
    clone_relationships: &[ItemRelationship],
    source: &ItemVariant,
    source_relationships: &[ItemRelationship],
    ids: &dyn EdgeIdGenerator,
) -> MergedVariant {
    let fields = merge_fields(clone, source);
    let relationships = merge_relationships(
        &clone.identifier,
        &strip_provenance_fields(clone),
        clone_relationships,
        &source.identifier,
        source_relationships,
        ids,
    );
    MergedVariant {
        variant: clone.with_fields(fields),
        relationships,
        origin: MergeOrigin::Merged {
            source: source.identifier.clone(),
        },
    }
}

/// Degraded record for a clone whose source could not be resolved: its own
/// fields minus the provenance fields, and its own relationships untouched.
pub fn orphan_variant(clone: &ItemVariant, clone_relationships: &[ItemRelationship]) -> MergedVariant {
    MergedVariant {
        variant: clone.with_fields(strip_provenance_fields(clone)),
        relationships: clone_relationships.to_vec(),
        origin: MergeOrigin::Orphaned,
    }
}
