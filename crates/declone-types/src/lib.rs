//! Foundation types for clone promotion.
//!
//! Every other declone crate depends on `declone-types`. The types here are
//! read-only snapshots: a merge always produces new values rather than
//! mutating fetched ones.
//!
//! # Key Types
//!
//! - [`VariantIdentifier`] — value-equal (item, language, version) key
//! - [`ItemVariant`] / [`FieldData`] — one variant and its field values
//! - [`ItemRelationship`] / [`RelationshipType`] — directed, typed edges
//! - [`CloneReference`] — decoded pointer from a clone to its source

pub mod error;
pub mod identity;
pub mod reference;
pub mod relationship;
pub mod variant;

pub use error::TypeError;
pub use identity::{distinct_identifiers, index_by_identifier, Identified, VariantIdentifier};
pub use reference::{
    clone_source, decode_clone_reference, is_clone_provenance_field, CloneReference,
    CLONE_PROVENANCE_FIELD_IDS, SOURCE_FIELD_ID, SOURCE_ITEM_FIELD_ID,
};
pub use relationship::{ItemRelationship, RelationshipKey, RelationshipType, RelationshipVariance};
pub use variant::{FieldData, FieldVariance, ItemVariant, VarianceKind};
