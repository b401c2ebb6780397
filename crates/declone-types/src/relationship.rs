use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::VariantIdentifier;

/// Kind of a directed edge between two items.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationshipType {
    /// Item to its schema template. At most one per item.
    TemplatedBy,
    /// Template to a base template.
    InheritsFrom,
    /// A field value referencing another item.
    ItemReference,
    /// A field value referencing a media item.
    MediaReference,
    /// Clone to the item it was cloned from.
    CloneOf,
    /// Clone to the specific source version it was cloned from.
    CloneVersionOf,
    /// Any other application-defined edge.
    Custom(String),
}

impl RelationshipType {
    /// Edges that describe the cloning itself rather than content.
    pub fn is_clone_provenance(&self) -> bool {
        matches!(self, Self::CloneOf | Self::CloneVersionOf)
    }

    /// Structural edges that must stay singular per item.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::TemplatedBy)
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemplatedBy => f.write_str("TemplatedBy"),
            Self::InheritsFrom => f.write_str("InheritsFrom"),
            Self::ItemReference => f.write_str("ItemReference"),
            Self::MediaReference => f.write_str("MediaReference"),
            Self::CloneOf => f.write_str("CloneOf"),
            Self::CloneVersionOf => f.write_str("CloneVersionOf"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Language/version scope of one end of a relationship.
///
/// `None` components mean the edge applies to every language or version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipVariance {
    pub language: Option<String>,
    pub version: Option<u32>,
}

impl RelationshipVariance {
    pub fn invariant() -> Self {
        Self::default()
    }

    /// Scoped to exactly one variant.
    pub fn of(variant: &VariantIdentifier) -> Self {
        Self {
            language: Some(variant.language.clone()),
            version: Some(variant.version),
        }
    }

    /// Keep the same degree of specificity, but scoped to `variant`.
    pub fn rescoped_to(&self, variant: &VariantIdentifier) -> Self {
        Self {
            language: self.language.as_ref().map(|_| variant.language.clone()),
            version: self.version.map(|_| variant.version),
        }
    }
}

/// Key under which a clone-declared edge suppresses an inherited one.
pub type RelationshipKey = (Uuid, Option<Uuid>, RelationshipType);

/// A directed, typed edge from one item to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRelationship {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub source_variance: RelationshipVariance,
    #[serde(default)]
    pub target_variance: RelationshipVariance,
    #[serde(default)]
    pub target_path: String,
    /// The field whose value produced this edge, if any.
    #[serde(default)]
    pub source_field_id: Option<Uuid>,
}

impl ItemRelationship {
    pub fn new(
        id: Uuid,
        source_id: Uuid,
        target_id: Uuid,
        relationship_type: RelationshipType,
    ) -> Self {
        Self {
            id,
            source_id,
            target_id,
            relationship_type,
            source_variance: RelationshipVariance::invariant(),
            target_variance: RelationshipVariance::invariant(),
            target_path: String::new(),
            source_field_id: None,
        }
    }

    pub fn from_field(mut self, field_id: Uuid) -> Self {
        self.source_field_id = Some(field_id);
        self
    }

    pub fn with_target_path(mut self, path: impl Into<String>) -> Self {
        self.target_path = path.into();
        self
    }

    pub fn with_source_variance(mut self, variance: RelationshipVariance) -> Self {
        self.source_variance = variance;
        self
    }

    pub fn dedup_key(&self) -> RelationshipKey {
        (
            self.source_id,
            self.source_field_id,
            self.relationship_type.clone(),
        )
    }
}
