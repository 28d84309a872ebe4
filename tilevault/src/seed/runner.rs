//! Sequential seed queue drain.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{SaveOutcome, TileCacheEngine};
use crate::events::{SeedSummary, TileEvent};

use super::SeedItem;

/// Outcome of one seed job.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedReport {
    pub summary: SeedSummary,
    /// Items fetched from the network.
    pub fetched: usize,
    /// Fetched items that were written to the store.
    pub saved: usize,
    /// Items skipped because an entry already existed.
    pub skipped: usize,
    /// Items whose fetch failed, in queue order.
    pub missed: Vec<SeedItem>,
    /// The job stopped early on cancellation.
    pub cancelled: bool,
}

impl SeedReport {
    fn new(summary: SeedSummary) -> Self {
        Self {
            summary,
            fetched: 0,
            saved: 0,
            skipped: 0,
            missed: Vec::new(),
            cancelled: false,
        }
    }

    /// URLs of the missed tiles.
    pub fn missed_urls(&self) -> Vec<&str> {
        self.missed.iter().map(|item| item.url.as_str()).collect()
    }

    /// Items handled before the job ended.
    pub fn processed(&self) -> usize {
        self.fetched + self.skipped + self.missed.len()
    }
}

/// Drain `items` through `engine`, one at a time.
///
/// Emits `seedstart`, one `seedprogress` per item (before the item, with the
/// remaining count including it), and `seedend`, even when cancelled.
/// Cancellation is honoured between items and while a fetch is pending.
pub async fn run_seed(
    engine: &TileCacheEngine,
    summary: SeedSummary,
    items: Vec<SeedItem>,
    cancel: &CancellationToken,
) -> SeedReport {
    let events = engine.events();
    let total = items.len();
    let mut report = SeedReport::new(summary.clone());

    info!(
        bbox = %summary.bbox,
        min_zoom = summary.min_zoom,
        max_zoom = summary.max_zoom,
        tiles = total,
        "Seeding started"
    );
    events.emit(TileEvent::SeedStart(summary.clone()));

    for (index, item) in items.into_iter().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        events.emit(TileEvent::SeedProgress {
            summary: summary.clone(),
            remaining_length: total - index,
        });

        if engine.contains(&item.key).await {
            debug!(key = %item.key, "Seed skip, already cached");
            report.skipped += 1;
            continue;
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = engine.fetch(&item.url) => Some(result),
        };
        let Some(fetched) = fetched else {
            report.cancelled = true;
            break;
        };

        match fetched {
            Ok(bytes) => {
                report.fetched += 1;
                if let SaveOutcome::Saved(_) = engine.save_tile(&item.key, &bytes, None).await {
                    report.saved += 1;
                }
            }
            Err(e) => {
                warn!(url = %item.url, error = %e, "Seed fetch failed");
                report.missed.push(item);
            }
        }
    }

    events.emit(TileEvent::SeedEnd(summary));
    info!(
        fetched = report.fetched,
        saved = report.saved,
        skipped = report.skipped,
        missed = report.missed.len(),
        cancelled = report.cancelled,
        "Seeding finished"
    );

    report
}
