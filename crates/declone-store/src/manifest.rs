//! Promotion manifests.
//!
//! A manifest is an ordered record of pending promotion work. Each entry is
//! tagged with the step that must process it; the promoter for a step pulls
//! its entries in batches through [`ManifestRepository`].

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;
use declone_types::VariantIdentifier;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::ManifestRepository;

/// The promotion step a manifest entry is pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManifestStepAction {
    PromoteVariant,
    PromoteCloneVariant,
    DeleteVariant,
}

impl fmt::Display for ManifestStepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PromoteVariant => f.write_str("promote-variant"),
            Self::PromoteCloneVariant => f.write_str("promote-clone-variant"),
            Self::DeleteVariant => f.write_str("delete-variant"),
        }
    }
}

type Queues = HashMap<(Uuid, ManifestStepAction), VecDeque<VariantIdentifier>>;

/// In-memory manifest: one FIFO queue per (manifest, step).
///
/// Taking a batch removes it from the queue, so every entry is handed out
/// exactly once.
#[derive(Debug, Default)]
pub struct InMemoryManifest {
    queues: RwLock<Queues>,
}

impl InMemoryManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append entries pending `step` to `manifest`.
    pub fn push(
        &self,
        manifest: Uuid,
        step: ManifestStepAction,
        entries: impl IntoIterator<Item = VariantIdentifier>,
    ) -> StoreResult<()> {
        let mut queues = self
            .queues
            .write()
            .map_err(|e| StoreError::LockPoisoned(format!("manifest: {e}")))?;
        queues.entry((manifest, step)).or_default().extend(entries);
        Ok(())
    }

    /// Entries still pending `step` in `manifest`.
    pub fn pending(&self, manifest: Uuid, step: ManifestStepAction) -> usize {
        self.queues
            .read()
            .map(|q| q.get(&(manifest, step)).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }
}

#[async_trait]
impl ManifestRepository for InMemoryManifest {
    async fn get_next_batch(
        &self,
        manifest: Uuid,
        step: ManifestStepAction,
        batch_size: usize,
    ) -> StoreResult<Option<Vec<VariantIdentifier>>> {
        let mut queues = self
            .queues
            .write()
            .map_err(|e| StoreError::LockPoisoned(format!("manifest: {e}")))?;
        let Some(queue) = queues.get_mut(&(manifest, step)) else {
            return Ok(None);
        };
        if queue.is_empty() {
            return Ok(None);
        }
        let take = batch_size.max(1).min(queue.len());
        Ok(Some(queue.drain(..take).collect()))
    }
}
