use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::hand::{assign_hand, classify};
use crate::identity::IdentityRegistry;
use crate::stats::StatAccumulator;
use crate::types::HandRecord;

/// A hand left out of a batch, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedHand {
    pub hand_id: String,
    pub kind: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub received: usize,
    pub ingested: usize,
    /// Ids of the hands that made it into the published counters, in batch order.
    pub ingested_ids: Vec<String>,
    pub skipped: Vec<SkippedHand>,
}

/// A folded batch waiting to be published.
pub struct PendingBatch {
    /// Counters the batch was folded onto.
    base: Arc<StatAccumulator>,
    working: StatAccumulator,
    report: BatchReport,
}

impl PendingBatch {
    pub fn report(&self) -> &BatchReport {
        &self.report
    }
}

/// Owns the published statistics and the identity registry.
///
/// Readers clone the published `Arc` and never see a partial batch: a batch is folded
/// into a private copy of the counters and swapped in once it completes. Writers are
/// serialized by `writer`.
pub struct StatsEngine {
    registry: Arc<IdentityRegistry>,
    published: RwLock<Arc<StatAccumulator>>,
    writer: Mutex<()>,
    /// Abort the batch on a malformed hand instead of skipping it.
    strict: bool,
}

impl StatsEngine {
    pub fn new(registry: Arc<IdentityRegistry>, strict: bool) -> Arc<Self> {
        Arc::new(Self {
            registry,
            published: RwLock::new(Arc::new(StatAccumulator::new())),
            writer: Mutex::new(()),
            strict,
        })
    }

    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    /// The currently published counters.
    pub fn snapshot(&self) -> Result<Arc<StatAccumulator>> {
        self.published
            .read()
            .map(|acc| Arc::clone(&*acc))
            .map_err(|_| poisoned("published stats"))
    }

    /// Fold a batch into a copy of the published counters, then publish it.
    pub fn ingest_batch(&self, hands: &[HandRecord]) -> Result<BatchReport> {
        let pending = self.prepare_batch(hands)?;
        self.publish_batch(pending)
    }

    /// Fold a batch into a private copy of the published counters without publishing
    /// it. Dropping the result discards the batch.
    pub fn prepare_batch(&self, hands: &[HandRecord]) -> Result<PendingBatch> {
        let _writer = self.lock_writer()?;
        let base = self.snapshot()?;
        let mut working = (*base).clone();
        let report = self.fold(&mut working, hands)?;
        Ok(PendingBatch {
            base,
            working,
            report,
        })
    }

    /// Swap in a prepared batch. Fails if anything was published since it was prepared.
    pub fn publish_batch(&self, pending: PendingBatch) -> Result<BatchReport> {
        let _writer = self.lock_writer()?;
        let mut published = self
            .published
            .write()
            .map_err(|_| poisoned("published stats"))?;
        if !Arc::ptr_eq(&*published, &pending.base) {
            return Err(AppError::SnapshotPublish(
                "counters changed while the batch was pending".to_string(),
            ));
        }
        *published = Arc::new(pending.working);
        Ok(pending.report)
    }

    /// Replace the published counters with a from-scratch replay of `hands`.
    pub fn rebuild(&self, hands: &[HandRecord]) -> Result<BatchReport> {
        let _writer = self.lock_writer()?;
        let mut working = StatAccumulator::new();
        let report = self.fold(&mut working, hands)?;
        self.publish(working)?;
        Ok(report)
    }

    /// Drop every counter and identity.
    pub fn reset(&self) -> Result<()> {
        let _writer = self.lock_writer()?;
        self.publish(StatAccumulator::new())?;
        self.registry.clear();
        info!("stats and identities reset");
        Ok(())
    }

    fn fold(&self, working: &mut StatAccumulator, hands: &[HandRecord]) -> Result<BatchReport> {
        let mut report = BatchReport {
            received: hands.len(),
            ..Default::default()
        };

        for hand in hands {
            match self.ingest_hand(working, hand) {
                Ok(()) => {
                    report.ingested += 1;
                    report.ingested_ids.push(hand.id.clone());
                }
                Err(e) if e.is_hand_scoped() => {
                    if self.strict && matches!(e, AppError::MalformedActionSequence { .. }) {
                        warn!(hand_id = %hand.id, "strict ingest: aborting batch: {e}");
                        return Err(e);
                    }
                    warn!(hand_id = %hand.id, kind = e.kind(), "skipping hand: {e}");
                    report.skipped.push(SkippedHand {
                        hand_id: hand.id.clone(),
                        kind: e.kind(),
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            received = report.received,
            ingested = report.ingested,
            skipped = report.skipped.len(),
            "batch folded"
        );
        Ok(report)
    }

    fn ingest_hand(&self, working: &mut StatAccumulator, hand: &HandRecord) -> Result<()> {
        let positions = assign_hand(hand)?;
        let actions = classify(hand)?;
        working.ingest(hand, &actions, &positions, &self.registry)
    }

    fn publish(&self, working: StatAccumulator) -> Result<()> {
        let mut published = self
            .published
            .write()
            .map_err(|_| poisoned("published stats"))?;
        *published = Arc::new(working);
        Ok(())
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| poisoned("writer"))
    }
}

fn poisoned(lock: &str) -> AppError {
    AppError::SnapshotPublish(format!("{lock} lock poisoned"))
}
