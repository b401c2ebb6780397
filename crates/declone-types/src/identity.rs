use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one language/version instance of a content item.
///
/// Equality and hashing are over all three components, so two identifiers
/// built independently from the same item id, language, and version are
/// interchangeable as map keys and in deduplication. Nothing in this crate
/// compares identifiers by reference.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantIdentifier {
    pub item_id: Uuid,
    pub language: String,
    pub version: u32,
}

impl VariantIdentifier {
    pub fn new(item_id: Uuid, language: impl Into<String>, version: u32) -> Self {
        Self {
            item_id,
            language: language.into(),
            version,
        }
    }

    /// Same item and language, different version.
    pub fn with_version(&self, version: u32) -> Self {
        Self {
            item_id: self.item_id,
            language: self.language.clone(),
            version,
        }
    }
}

impl fmt::Debug for VariantIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariantIdentifier({self})")
    }
}

impl fmt::Display for VariantIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.item_id, self.language, self.version)
    }
}

/// Anything that carries a [`VariantIdentifier`].
///
/// Maps built from fetched records are keyed by the identifier value this
/// returns, so a variant and a bare identifier with equal components hit the
/// same entry.
pub trait Identified {
    fn identifier(&self) -> &VariantIdentifier;
}

impl Identified for VariantIdentifier {
    fn identifier(&self) -> &VariantIdentifier {
        self
    }
}

impl<T: Identified + ?Sized> Identified for &T {
    fn identifier(&self) -> &VariantIdentifier {
        (**self).identifier()
    }
}

/// Identifiers of `records`, deduplicated by value, keeping the first
/// occurrence of each.
pub fn distinct_identifiers<I>(records: I) -> Vec<VariantIdentifier>
where
    I: IntoIterator,
    I::Item: Identified,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .map(|record| record.identifier().clone())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Position of the first record carrying each identifier.
pub fn index_by_identifier<T: Identified>(records: &[T]) -> HashMap<VariantIdentifier, usize> {
    let mut index = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        index.entry(record.identifier().clone()).or_insert(i);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn equal_components_are_equal() {
        let a = VariantIdentifier::new(item(1), "en", 1);
        let b = VariantIdentifier::new(item(1), String::from("en"), 1);
        assert_eq!(a, b);
    }

    #[test]
    fn any_component_differs() {
        let base = VariantIdentifier::new(item(1), "en", 1);
        assert_ne!(base, VariantIdentifier::new(item(2), "en", 1));
        assert_ne!(base, VariantIdentifier::new(item(1), "da", 1));
        assert_ne!(base, base.with_version(2));
    }

    #[test]
    fn usable_as_map_key_across_instances() {
        let mut map = HashMap::new();
        map.insert(VariantIdentifier::new(item(7), "en", 3), "seven");
        let lookup = VariantIdentifier::new(item(7), "en", 3);
        assert_eq!(map.get(&lookup), Some(&"seven"));
    }

    #[test]
    fn distinct_keeps_first_seen_order() {
        let a = VariantIdentifier::new(item(1), "en", 1);
        let b = VariantIdentifier::new(item(2), "en", 1);
        let ids = distinct_identifiers(vec![a.clone(), b.clone(), a.clone(), b.clone()]);
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn distinct_of_empty_is_empty() {
        assert!(distinct_identifiers(Vec::<VariantIdentifier>::new()).is_empty());
    }

    #[test]
    fn distinct_accepts_borrowed_records() {
        let a = VariantIdentifier::new(item(1), "en", 1);
        let records = vec![a.clone(), a.clone()];
        assert_eq!(distinct_identifiers(records.iter()), vec![a]);
    }

    #[test]
    fn index_points_at_first_occurrence() {
        let a = VariantIdentifier::new(item(1), "en", 1);
        let b = VariantIdentifier::new(item(2), "en", 1);
        let index = index_by_identifier(&[a.clone(), b.clone(), a.clone()]);
        assert_eq!(index.len(), 2);
        assert_eq!(index[&a], 0);
        assert_eq!(index[&b], 1);
        assert_eq!(index.get(&VariantIdentifier::new(item(1), "en", 1)), Some(&0));
    }

    #[test]
    fn display_format() {
        let id = VariantIdentifier::new(Uuid::nil(), "en", 4);
        assert_eq!(
            id.to_string(),
            "00000000-0000-0000-0000-000000000000:en#4"
        );
    }

    #[test]
    fn serde_roundtrip() {
        let id = VariantIdentifier::new(item(42), "de-DE", 9);
        let json = serde_json::to_string(&id).unwrap();
        let parsed: VariantIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
