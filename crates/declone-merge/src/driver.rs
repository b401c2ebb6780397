use std::sync::Arc;
use std::time::{Duration, Instant};

use declone_store::{ManifestRepository, ManifestStepAction};
use declone_types::VariantIdentifier;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cancel::CancelSignal;
use crate::config::PromoterConfig;
use crate::engine::{DecloneBatch, DecloneEngine};
use crate::error::{MergeError, MergeResult};
use crate::fetch::VariantFetcher;
use crate::persist::PersistenceAdapter;

/// How a run ended, when it ended without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromotionOutcome {
    /// The manifest had no more work for the step.
    Completed,
    /// Cancellation was observed at a batch boundary.
    Cancelled,
}

/// Summary of one promotion run.
#[derive(Clone, Debug)]
pub struct PromotionReport {
    pub manifest: Uuid,
    pub step: ManifestStepAction,
    pub batches: usize,
    pub clones_requested: usize,
    pub variants_written: usize,
    pub relationships_written: usize,
    pub orphans: usize,
    pub skipped: usize,
    pub outcome: PromotionOutcome,
    pub elapsed: Duration,
}

impl PromotionReport {
    fn start(manifest: Uuid, step: ManifestStepAction) -> Self {
        Self {
            manifest,
            step,
            batches: 0,
            clones_requested: 0,
            variants_written: 0,
            relationships_written: 0,
            orphans: 0,
            skipped: 0,
            outcome: PromotionOutcome::Completed,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == PromotionOutcome::Cancelled
    }
}

/// Walks a manifest in fixed-size batches: fetch, merge, persist, repeat.
///
/// Batches run strictly one after another. Within a batch the clone-phase
/// reads, the source-phase reads, and the two writes each run as a
/// concurrent pair, and each pair completes before the next begins. Any
/// fetch or persist failure ends the run; batches already persisted stay
/// persisted.
pub struct PromotionDriver {
    config: PromoterConfig,
    manifest: Arc<dyn ManifestRepository>,
    fetcher: VariantFetcher,
    engine: DecloneEngine,
    persistence: PersistenceAdapter,
}

impl PromotionDriver {
    pub fn new(
        config: PromoterConfig,
        manifest: Arc<dyn ManifestRepository>,
        fetcher: VariantFetcher,
        engine: DecloneEngine,
        persistence: PersistenceAdapter,
    ) -> MergeResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            manifest,
            fetcher,
            engine,
            persistence,
        })
    }

    pub fn config(&self) -> &PromoterConfig {
        &self.config
    }

    /// Fetch clones, then their sources, and merge them.
    ///
    /// Locators with no stored clone are counted as skipped.
    pub async fn merge_batch(&self, locators: &[VariantIdentifier]) -> MergeResult<DecloneBatch> {
        let clones = self.fetcher.fetch_clone_set(locators).await?;
        let resolved = clones.resolve();
        let sources = self.fetcher.fetch_sources(&resolved).await?;
        let mut batch = self.engine.declone(&resolved, &sources);
        batch.skipped += locators.len().saturating_sub(clones.len());
        Ok(batch)
    }

    /// Process every batch pending `step` in `manifest` until the manifest is
    /// exhausted or `cancel` is raised.
    pub async fn run(
        &self,
        manifest: Uuid,
        step: ManifestStepAction,
        cancel: &CancelSignal,
    ) -> MergeResult<PromotionReport> {
        let started = Instant::now();
        let mut report = PromotionReport::start(manifest, step);
        info!(%manifest, %step, batch_size = self.config.batch_size, "promotion started");

        loop {
            if cancel.is_cancelled() {
                report.outcome = PromotionOutcome::Cancelled;
                info!(%manifest, batches = report.batches, "promotion cancelled");
                break;
            }

            let next = self
                .manifest
                .get_next_batch(manifest, step, self.config.batch_size)
                .await
                .map_err(MergeError::Manifest)?;
            let Some(locators) = next else {
                break;
            };

            report.batches += 1;
            report.clones_requested += locators.len();

            let batch = self.merge_batch(&locators).await?;
            report.orphans += batch.orphans;
            report.skipped += batch.skipped;

            if batch.is_empty() {
                debug!(batch = report.batches, "nothing to persist");
                continue;
            }

            let stats = self.persistence.persist(&batch).await?;
            report.variants_written += stats.variants;
            report.relationships_written += stats.relationships;
            debug!(
                batch = report.batches,
                variants = stats.variants,
                relationships = stats.relationships,
                orphans = batch.orphans,
                "batch committed"
            );
        }

        report.elapsed = started.elapsed();
        if report.outcome == PromotionOutcome::Completed {
            info!(
                %manifest,
                batches = report.batches,
                variants = report.variants_written,
                relationships = report.relationships_written,
                orphans = report.orphans,
                "promotion completed"
            );
        }
        Ok(report)
    }
}

impl std::fmt::Debug for PromotionDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromotionDriver")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}
