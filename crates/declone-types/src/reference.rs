//! Clone provenance references.
//!
//! A clone records where it came from in two reserved fields. Both hold an
//! encoded locator of the form
//!
//! ```text
//! item://{store}/{item-id}?lang={language}&ver={version}
//! ```
//!
//! Query values are percent-encoded. The store segment is carried for
//! display only: at promotion time the source always lives in the same
//! store as the clone.

use url::Url;
use uuid::Uuid;

use crate::error::TypeError;
use crate::identity::VariantIdentifier;
use crate::variant::ItemVariant;

const SCHEME: &str = "item";

/// Field holding the reference to the source item version. Preferred.
pub const SOURCE_ITEM_FIELD_ID: Uuid = Uuid::from_u128(0x19b597d3_2edd_4ae2_aefe_4a94c7f10e31);

/// Older field holding the reference to the source item.
pub const SOURCE_FIELD_ID: Uuid = Uuid::from_u128(0x1b86697d_60ca_4d80_83fb_7555a2e6ce1c);

/// Both reserved fields, in lookup order.
pub const CLONE_PROVENANCE_FIELD_IDS: [Uuid; 2] = [SOURCE_ITEM_FIELD_ID, SOURCE_FIELD_ID];

pub fn is_clone_provenance_field(field_id: Uuid) -> bool {
    CLONE_PROVENANCE_FIELD_IDS.contains(&field_id)
}

/// A decoded reference from a clone to its source variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloneReference {
    pub store: String,
    pub source: VariantIdentifier,
}

impl CloneReference {
    pub fn new(store: impl Into<String>, source: VariantIdentifier) -> Self {
        Self {
            store: store.into(),
            source,
        }
    }

    /// Parse an encoded reference. Language and version fall back to the
    /// values in `fallback` when the query omits them. Query values are
    /// percent-decoded.
    pub fn parse(encoded: &str, fallback: &VariantIdentifier) -> Result<Self, TypeError> {
        let trimmed = encoded.trim();
        let invalid = || TypeError::InvalidReference(trimmed.to_string());

        let url = Url::parse(trimmed).map_err(|_| invalid())?;
        if url.scheme() != SCHEME {
            return Err(invalid());
        }
        let store = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(invalid)?;
        let mut segments = url.path_segments().ok_or_else(invalid)?;
        let item = match (segments.next(), segments.next()) {
            (Some(item), None) if !item.is_empty() => item,
            _ => return Err(invalid()),
        };
        let item_id =
            Uuid::parse_str(item).map_err(|_| TypeError::InvalidItemId(item.to_string()))?;

        let mut language = None;
        let mut version = None;
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "lang" => language = Some(value.into_owned()),
                "ver" => {
                    let parsed = value
                        .parse::<u32>()
                        .map_err(|_| TypeError::InvalidVersion(value.to_string()))?;
                    version = Some(parsed);
                }
                _ => {}
            }
        }

        Ok(Self {
            store: store.to_string(),
            source: VariantIdentifier::new(
                item_id,
                language.unwrap_or_else(|| fallback.language.clone()),
                version.unwrap_or(fallback.version),
            ),
        })
    }

    /// The reference as an `item://` URL with an escaped query.
    ///
    /// Fails when the store name is not usable as a URL host.
    pub fn to_url(&self) -> Result<Url, TypeError> {
        if self.store.is_empty() {
            return Err(TypeError::InvalidStore(self.store.clone()));
        }
        let mut url = Url::parse(&format!("{SCHEME}://{}/{}", self.store, self.source.item_id))
            .map_err(|e| TypeError::InvalidStore(format!("{}: {e}", self.store)))?;
        if url.host_str() != Some(self.store.as_str()) {
            return Err(TypeError::InvalidStore(self.store.clone()));
        }
        url.query_pairs_mut()
            .append_pair("lang", &self.source.language)
            .append_pair("ver", &self.source.version.to_string());
        Ok(url)
    }

    pub fn encode(&self) -> Result<String, TypeError> {
        self.to_url().map(String::from)
    }
}

/// Decode the clone reference carried by `clone`, if any.
///
/// The source-item field is tried first, then the older source field. Empty
/// or malformed values are treated as absent.
pub fn decode_clone_reference(clone: &ItemVariant) -> Option<CloneReference> {
    CLONE_PROVENANCE_FIELD_IDS.iter().find_map(|field_id| {
        let field = clone.field(*field_id)?;
        if field.raw_value.trim().is_empty() {
            return None;
        }
        CloneReference::parse(&field.raw_value, &clone.identifier).ok()
    })
}

/// The source variant `clone` was cloned from, ignoring store scoping.
pub fn clone_source(clone: &ItemVariant) -> Option<VariantIdentifier> {
    decode_clone_reference(clone).map(|reference| reference.source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::VarianceKind;

    fn clone_id() -> VariantIdentifier {
        VariantIdentifier::new(Uuid::from_u128(0xa), "en", 1)
    }

    #[test]
    fn parse_full_reference() {
        let source = Uuid::from_u128(0xb);
        let encoded = format!("item://master/{source}?lang=da&ver=3");
        let reference = CloneReference::parse(&encoded, &clone_id()).unwrap();
        assert_eq!(reference.store, "master");
        assert_eq!(reference.source, VariantIdentifier::new(source, "da", 3));
    }

    #[test]
    fn parse_without_query_uses_fallback() {
        let source = Uuid::from_u128(0xb);
        let encoded = format!("item://master/{}", source.simple());
        let reference = CloneReference::parse(&encoded, &clone_id()).unwrap();
        assert_eq!(reference.source, VariantIdentifier::new(source, "en", 1));
    }

    #[test]
    fn parse_percent_decodes_query_values() {
        let source = Uuid::from_u128(0xb);
        let encoded = format!("item://master/{source}?lang=de%2DDE&ver=2");
        let reference = CloneReference::parse(&encoded, &clone_id()).unwrap();
        assert_eq!(reference.source, VariantIdentifier::new(source, "de-DE", 2));
    }

    #[test]
    fn parse_ignores_unknown_query_keys() {
        let source = Uuid::from_u128(0xb);
        let encoded = format!("item://web/{source}?x=1&lang=en&ver=2&y");
        let reference = CloneReference::parse(&encoded, &clone_id()).unwrap();
        assert_eq!(reference.source.version, 2);
    }

    #[test]
    fn parse_rejects_malformed() {
        let fallback = clone_id();
        assert!(matches!(
            CloneReference::parse("not a reference", &fallback),
            Err(TypeError::InvalidReference(_))
        ));
        assert!(matches!(
            CloneReference::parse("item://master/not-a-guid", &fallback),
            Err(TypeError::InvalidItemId(_))
        ));
        let source = Uuid::from_u128(0xb);
        assert!(matches!(
            CloneReference::parse(&format!("item://master/{source}?ver=x"), &fallback),
            Err(TypeError::InvalidVersion(_))
        ));
        assert!(CloneReference::parse(&format!("item:///{source}"), &fallback).is_err());
    }

    #[test]
    fn encode_then_parse() {
        let reference = CloneReference::new("master", VariantIdentifier::new(Uuid::from_u128(5), "en", 2));
        let encoded = reference.encode().unwrap();
        assert_eq!(
            encoded,
            "item://master/00000000-0000-0000-0000-000000000005?lang=en&ver=2"
        );
        assert_eq!(CloneReference::parse(&encoded, &clone_id()).unwrap(), reference);
    }

    #[test]
    fn reserved_characters_in_language_survive_encoding() {
        let source = VariantIdentifier::new(Uuid::from_u128(0xb), "en&ver=9", 1);
        let reference = CloneReference::new("master", source);
        let parsed = CloneReference::parse(&reference.encode().unwrap(), &clone_id()).unwrap();
        assert_eq!(parsed, reference);

        let spaced = CloneReference::new("master", VariantIdentifier::new(Uuid::from_u128(0xb), "en gb", 3));
        let parsed = CloneReference::parse(&spaced.encode().unwrap(), &clone_id()).unwrap();
        assert_eq!(parsed.source.language, "en gb");
    }

    #[test]
    fn encode_rejects_store_that_is_not_a_host() {
        let source = VariantIdentifier::new(Uuid::from_u128(0xb), "en", 1);
        assert!(matches!(
            CloneReference::new("mas/ter", source.clone()).encode(),
            Err(TypeError::InvalidStore(_))
        ));
        assert!(CloneReference::new("", source).encode().is_err());
    }

    #[test]
    fn parse_rejects_other_schemes_and_extra_segments() {
        let source = Uuid::from_u128(0xb);
        let fallback = clone_id();
        assert!(CloneReference::parse(&format!("http://master/{source}"), &fallback).is_err());
        assert!(CloneReference::parse(&format!("item://master/a/{source}"), &fallback).is_err());
    }

    #[test]
    fn decode_prefers_source_item_field() {
        let preferred = CloneReference::new("master", VariantIdentifier::new(Uuid::from_u128(1), "en", 1));
        let legacy = CloneReference::new("master", VariantIdentifier::new(Uuid::from_u128(2), "en", 1));
        let clone = ItemVariant::new(clone_id(), Uuid::nil())
            .with_field(SOURCE_FIELD_ID, legacy.encode().unwrap(), VarianceKind::Versioned)
            .with_field(SOURCE_ITEM_FIELD_ID, preferred.encode().unwrap(), VarianceKind::Versioned);
        assert_eq!(clone_source(&clone), Some(preferred.source));
    }

    #[test]
    fn decode_falls_back_to_legacy_field() {
        let legacy = CloneReference::new("master", VariantIdentifier::new(Uuid::from_u128(2), "en", 1));
        let clone = ItemVariant::new(clone_id(), Uuid::nil())
            .with_field(SOURCE_ITEM_FIELD_ID, "garbage", VarianceKind::Versioned)
            .with_field(SOURCE_FIELD_ID, legacy.encode().unwrap(), VarianceKind::Shared);
        assert_eq!(clone_source(&clone), Some(legacy.source));
    }

    #[test]
    fn decode_without_fields_is_none() {
        let clone = ItemVariant::new(clone_id(), Uuid::nil());
        assert_eq!(decode_clone_reference(&clone), None);

        let blank = ItemVariant::new(clone_id(), Uuid::nil())
            .with_field(SOURCE_ITEM_FIELD_ID, "   ", VarianceKind::Versioned);
        assert_eq!(clone_source(&blank), None);
    }

    #[test]
    fn provenance_field_ids() {
        assert!(is_clone_provenance_field(SOURCE_ITEM_FIELD_ID));
        assert!(is_clone_provenance_field(SOURCE_FIELD_ID));
        assert!(!is_clone_provenance_field(Uuid::nil()));
    }
}
