use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{Identified, VariantIdentifier};

/// How a field's value varies across the variants of one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarianceKind {
    /// One value for every language and version.
    Shared,
    /// One value per language, shared across versions.
    Unversioned,
    /// One value per language and version.
    Versioned,
}

/// Which slice of an item a field value belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldVariance {
    pub kind: VarianceKind,
    pub language: Option<String>,
    pub version: Option<u32>,
}

impl FieldVariance {
    /// Compute the descriptor of a `kind` field attached to `variant`.
    pub fn for_variant(kind: VarianceKind, variant: &VariantIdentifier) -> Self {
        match kind {
            VarianceKind::Shared => Self {
                kind,
                language: None,
                version: None,
            },
            VarianceKind::Unversioned => Self {
                kind,
                language: Some(variant.language.clone()),
                version: None,
            },
            VarianceKind::Versioned => Self {
                kind,
                language: Some(variant.language.clone()),
                version: Some(variant.version),
            },
        }
    }
}

/// A single field value attached to a variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldData {
    pub field_id: Uuid,
    /// The variant that owns this value.
    pub variant: VariantIdentifier,
    pub raw_value: String,
    pub variance: FieldVariance,
}

impl FieldData {
    pub fn new(
        field_id: Uuid,
        variant: VariantIdentifier,
        raw_value: impl Into<String>,
        kind: VarianceKind,
    ) -> Self {
        let variance = FieldVariance::for_variant(kind, &variant);
        Self {
            field_id,
            variant,
            raw_value: raw_value.into(),
            variance,
        }
    }

    /// Copy of this value owned by `variant`, variance recomputed against it.
    pub fn reattached_to(&self, variant: &VariantIdentifier) -> Self {
        Self {
            field_id: self.field_id,
            variant: variant.clone(),
            raw_value: self.raw_value.clone(),
            variance: FieldVariance::for_variant(self.variance.kind, variant),
        }
    }
}

/// Snapshot of one language/version of an item.
///
/// Variants are never mutated in place; [`ItemVariant::with_fields`] builds a
/// new one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemVariant {
    #[serde(flatten)]
    pub identifier: VariantIdentifier,
    pub revision: Uuid,
    /// Item-level metadata (name, template, parent, ...). Not interpreted here.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: Vec<FieldData>,
}

impl ItemVariant {
    pub fn new(identifier: VariantIdentifier, revision: Uuid) -> Self {
        Self {
            identifier,
            revision,
            properties: BTreeMap::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Append a field owned by this variant.
    pub fn with_field(mut self, field_id: Uuid, raw_value: impl Into<String>, kind: VarianceKind) -> Self {
        let field = FieldData::new(field_id, self.identifier.clone(), raw_value, kind);
        self.fields.push(field);
        self
    }

    /// Same identity, revision, and properties with a replaced field sequence.
    pub fn with_fields(&self, fields: Vec<FieldData>) -> Self {
        Self {
            identifier: self.identifier.clone(),
            revision: self.revision,
            properties: self.properties.clone(),
            fields,
        }
    }

    pub fn field(&self, field_id: Uuid) -> Option<&FieldData> {
        self.fields.iter().find(|f| f.field_id == field_id)
    }

    pub fn has_field(&self, field_id: Uuid) -> bool {
        self.field(field_id).is_some()
    }
}

impl Identified for ItemVariant {
    fn identifier(&self) -> &VariantIdentifier {
        &self.identifier
    }
}
