use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use declone_store::{InMemoryItemStore, InMemoryManifest, InMemoryRelationshipStore, ManifestStepAction};
use declone_types::{ItemRelationship, ItemVariant, VariantIdentifier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outbound edges of one variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipSet {
    pub variant: VariantIdentifier,
    pub relationships: Vec<ItemRelationship>,
}

/// Store contents and pending clone promotions, as loaded from JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub store: Option<String>,
    pub variants: Vec<ItemVariant>,
    #[serde(default)]
    pub relationships: Vec<RelationshipSet>,
    /// Clone locators pending promotion, in order.
    #[serde(default)]
    pub manifest: Vec<VariantIdentifier>,
}

/// In-memory backends populated from a fixture.
pub struct Backends {
    pub items: Arc<InMemoryItemStore>,
    pub relationships: Arc<InMemoryRelationshipStore>,
    pub manifest: Arc<InMemoryManifest>,
}

impl Fixture {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing fixture {}", path.display()))
    }

    /// Populate fresh backends. Relationships land in `store`; manifest
    /// entries are queued as clone promotions under `manifest_id`.
    pub fn into_backends(self, store: &str, manifest_id: Uuid) -> anyhow::Result<Backends> {
        let items = Arc::new(InMemoryItemStore::with_variants(self.variants));
        let relationships = Arc::new(InMemoryRelationshipStore::new());
        for set in self.relationships {
            relationships.insert(store, set.variant, set.relationships)?;
        }
        let manifest = Arc::new(InMemoryManifest::new());
        manifest.push(manifest_id, ManifestStepAction::PromoteCloneVariant, self.manifest)?;
        Ok(Backends {
            items,
            relationships,
            manifest,
        })
    }
}
