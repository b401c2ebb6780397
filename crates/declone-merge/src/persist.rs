use std::sync::Arc;

use declone_store::{ItemWriteRepository, RelationshipRepository};
use tracing::debug;

use crate::engine::DecloneBatch;
use crate::error::{MergeError, MergeResult};

/// Counts written by one [`PersistenceAdapter::persist`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub variants: usize,
    pub relationships: usize,
}

/// Writes merged batches back to the target store.
#[derive(Clone)]
pub struct PersistenceAdapter {
    items: Arc<dyn ItemWriteRepository>,
    relationships: Arc<dyn RelationshipRepository>,
    store: String,
}

impl PersistenceAdapter {
    pub fn new(
        items: Arc<dyn ItemWriteRepository>,
        relationships: Arc<dyn RelationshipRepository>,
        store: impl Into<String>,
    ) -> Self {
        Self {
            items,
            relationships,
            store: store.into(),
        }
    }

    /// Save the batch's variants and relationship sets concurrently.
    ///
    /// Both writes must succeed for the batch to count as durable. An empty
    /// batch is a no-op and touches neither repository.
    pub async fn persist(&self, batch: &DecloneBatch) -> MergeResult<PersistStats> {
        if batch.is_empty() {
            return Ok(PersistStats::default());
        }
        let variants = batch.variants();
        let relationships = batch.relationship_map();

        tokio::try_join!(
            self.items.save_variants(&variants),
            self.relationships.save_relationships(&self.store, &relationships),
        )
        .map_err(MergeError::Persist)?;

        let stats = PersistStats {
            variants: variants.len(),
            relationships: batch.relationship_count(),
        };
        debug!(store = %self.store, variants = stats.variants, relationships = stats.relationships, "persisted batch");
        Ok(stats)
    }
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("store", &self.store)
            .finish()
    }
}
